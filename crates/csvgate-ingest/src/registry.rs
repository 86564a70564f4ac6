//! Domain registry
//!
//! Each domain is served by a [`DomainProcessor`] resolved by name. The
//! registry is assembled once at startup, from the built-in domains or a
//! TOML file of descriptors, and shared read-only afterwards.

use csvgate_common::types::{Filter, SchemaDescriptor};
use csvgate_common::{CsvGateError, Result as CommonResult};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use crate::download;
use crate::error::Result;

/// Per-domain capabilities the upload and download paths rely on
pub trait DomainProcessor: Send + Sync {
    /// Expected CSV shape for uploads of this domain
    fn descriptor(&self) -> &SchemaDescriptor;

    /// Export the domain's data matching `filters` as CSV bytes
    fn generate_csv(&self, filters: &[Filter]) -> Result<Vec<u8>>;
}

/// Processor backed only by a descriptor.
///
/// Holds no accepted rows, so exports carry the header and nothing else.
#[derive(Debug, Clone)]
pub struct DescriptorProcessor {
    descriptor: SchemaDescriptor,
}

impl DescriptorProcessor {
    pub fn new(descriptor: SchemaDescriptor) -> Self {
        Self { descriptor }
    }
}

impl DomainProcessor for DescriptorProcessor {
    fn descriptor(&self) -> &SchemaDescriptor {
        &self.descriptor
    }

    fn generate_csv(&self, filters: &[Filter]) -> Result<Vec<u8>> {
        download::validate_filters(&self.descriptor, filters)?;
        download::write_header(&self.descriptor)
    }
}

/// One `[[domain]]` table of a descriptor file
#[derive(Debug, Clone, Deserialize)]
pub struct DomainDefinition {
    pub name: String,
    #[serde(flatten)]
    pub descriptor: SchemaDescriptor,
}

#[derive(Debug, Deserialize)]
struct DomainsFile {
    #[serde(default)]
    domain: Vec<DomainDefinition>,
}

/// Domain name to processor
#[derive(Clone, Default)]
pub struct DomainRegistry {
    processors: HashMap<String, Arc<dyn DomainProcessor>>,
}

impl DomainRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor, builder style. A later registration under the same
    /// name replaces the earlier one.
    pub fn with_processor(mut self, name: impl Into<String>, processor: Arc<dyn DomainProcessor>) -> Self {
        self.register(name, processor);
        self
    }

    pub fn with_descriptor(self, name: impl Into<String>, descriptor: SchemaDescriptor) -> Self {
        self.with_processor(name, Arc::new(DescriptorProcessor::new(descriptor)))
    }

    pub fn register(&mut self, name: impl Into<String>, processor: Arc<dyn DomainProcessor>) {
        let name = name.into();
        debug!(domain = %name, columns = processor.descriptor().column_count(), "Registered domain");
        self.processors.insert(name, processor);
    }

    /// Build a registry from parsed definitions, rejecting repeated names
    pub fn from_definitions(definitions: impl IntoIterator<Item = DomainDefinition>) -> CommonResult<Self> {
        let mut registry = Self::new();
        for definition in definitions {
            if registry.processors.contains_key(&definition.name) {
                return Err(CsvGateError::Config(format!(
                    "domain '{}' is defined more than once",
                    definition.name
                )));
            }
            registry.register(definition.name, Arc::new(DescriptorProcessor::new(definition.descriptor)));
        }
        Ok(registry)
    }

    /// Parse a descriptor file body
    pub fn from_toml_str(source: &str) -> CommonResult<Self> {
        let file: DomainsFile =
            toml::from_str(source).map_err(|e| CsvGateError::Parse(e.to_string()))?;

        if file.domain.is_empty() {
            return Err(CsvGateError::Config("descriptor file defines no domains".to_string()));
        }

        Self::from_definitions(file.domain)
    }

    pub fn from_file(path: impl AsRef<Path>) -> CommonResult<Self> {
        let source = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&source)
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DomainProcessor>> {
        self.processors.get(name).cloned()
    }

    pub fn descriptor(&self, name: &str) -> Option<&SchemaDescriptor> {
        self.processors.get(name).map(|p| p.descriptor())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    /// Registered domain names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.processors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.processors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl std::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomainRegistry")
            .field("domains", &self.names())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use csvgate_common::types::{ColumnSpec, ColumnType, OPERATOR_COLUMN};

    const DOMAINS: &str = r#"
[[domain]]
name = "orders"
delimiter = ";"
enforce_uniqueness = true

[[domain.columns]]
label = "supplier"
type = "string"
mandatory = true
key = true

[[domain.columns]]
label = "quantity"
type = "float"

[[domain]]
name = "lead_times"
has_header = false
cud_control = true

[[domain.columns]]
label = "supplier"
type = "string"
key = true
"#;

    #[test]
    fn test_from_toml() {
        let registry = DomainRegistry::from_toml_str(DOMAINS).unwrap();
        assert_eq!(registry.names(), vec!["lead_times", "orders"]);

        let orders = registry.descriptor("orders").unwrap();
        assert_eq!(orders.delimiter(), ';');
        assert!(orders.has_header());
        assert!(orders.enforce_uniqueness());
        assert_eq!(orders.column("quantity").unwrap().column_type, ColumnType::Float);
        assert_eq!(orders.key_columns().count(), 1);

        let lead_times = registry.descriptor("lead_times").unwrap();
        assert!(!lead_times.has_header());
        assert_eq!(lead_times.delimiter(), ',');
        assert!(lead_times.column(OPERATOR_COLUMN).is_some());
        assert_eq!(lead_times.column_count(), 3);
    }

    #[test]
    fn test_duplicate_domain_rejected() {
        let source = r#"
[[domain]]
name = "orders"
[[domain.columns]]
label = "a"
type = "string"

[[domain]]
name = "orders"
[[domain.columns]]
label = "b"
type = "string"
"#;
        let err = DomainRegistry::from_toml_str(source).unwrap_err();
        assert!(matches!(err, CsvGateError::Config(_)));
    }

    #[test]
    fn test_invalid_descriptor_rejected() {
        let source = r#"
[[domain]]
name = "orders"
[[domain.columns]]
label = "a"
type = "currency"
"#;
        let err = DomainRegistry::from_toml_str(source).unwrap_err();
        assert!(matches!(err, CsvGateError::Parse(_)));

        assert!(DomainRegistry::from_toml_str("").is_err());
    }

    #[test]
    fn test_builder_and_lookup() {
        let descriptor = SchemaDescriptor::builder()
            .column(ColumnSpec::new("a", ColumnType::Int))
            .build()
            .unwrap();
        let registry = DomainRegistry::new().with_descriptor("numbers", descriptor.clone());

        assert!(registry.contains("numbers"));
        assert!(registry.get("letters").is_none());
        assert_eq!(registry.get("numbers").unwrap().descriptor(), &descriptor);
        assert_eq!(registry.len(), 1);
    }
}
