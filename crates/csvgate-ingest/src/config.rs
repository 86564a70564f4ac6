//! Configuration management

use csvgate_common::{CsvGateError, Result as CommonResult};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::domains::builtin_registry;
use crate::registry::DomainRegistry;

// ============================================================================
// Ingest Configuration Constants
// ============================================================================

/// Environment variable naming a TOML file of domain descriptors.
pub const DOMAINS_FILE_ENV: &str = "CSVGATE_DOMAINS_FILE";

/// Environment variable bounding simultaneous uploads.
pub const MAX_CONCURRENT_UPLOADS_ENV: &str = "CSVGATE_MAX_CONCURRENT_UPLOADS";

/// Default number of uploads validated at the same time.
pub const DEFAULT_MAX_CONCURRENT_UPLOADS: usize = 4;

/// Ingest configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestConfig {
    /// Descriptor file; the built-in domains are used when unset
    pub domains_file: Option<PathBuf>,
    pub max_concurrent_uploads: usize,
}

impl IngestConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = IngestConfig {
            domains_file: std::env::var(DOMAINS_FILE_ENV)
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            max_concurrent_uploads: std::env::var(MAX_CONCURRENT_UPLOADS_ENV)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_MAX_CONCURRENT_UPLOADS),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_concurrent_uploads == 0 {
            anyhow::bail!("max_concurrent_uploads must be greater than 0");
        }

        if let Some(path) = &self.domains_file {
            if !path.is_file() {
                anyhow::bail!("Domains file {} does not exist", path.display());
            }
        }

        Ok(())
    }

    /// Build the domain registry this configuration points at
    pub fn load_registry(&self) -> CommonResult<DomainRegistry> {
        let registry = match &self.domains_file {
            Some(path) => load_domains_file(path)?,
            None => builtin_registry()?,
        };

        info!(domains = ?registry.names(), "Domain registry ready");
        Ok(registry)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            domains_file: None,
            max_concurrent_uploads: DEFAULT_MAX_CONCURRENT_UPLOADS,
        }
    }
}

fn load_domains_file(path: &Path) -> CommonResult<DomainRegistry> {
    DomainRegistry::from_file(path).map_err(|e| match e {
        CsvGateError::Parse(message) => {
            CsvGateError::Parse(format!("{}: {}", path.display(), message))
        },
        other => other,
    })
}
