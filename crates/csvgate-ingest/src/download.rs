//! Filtered CSV export
//!
//! The read path that hands a domain's data back as CSV. Filters are
//! checked against the domain descriptor before the processor runs.

use chrono::{DateTime, Utc};
use csvgate_common::types::{Filter, SchemaDescriptor};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;

use crate::error::{IngestError, Result};
use crate::registry::DomainRegistry;

/// Comparison a [`Filter`] applies to its column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
}

impl FilterOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::Lt => "<",
            FilterOperator::Le => "<=",
            FilterOperator::Gt => ">",
            FilterOperator::Ge => ">=",
            FilterOperator::Contains => "contains",
        }
    }
}

impl FromStr for FilterOperator {
    type Err = IngestError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "=" | "eq" => Ok(FilterOperator::Eq),
            "!=" | "ne" => Ok(FilterOperator::Ne),
            "<" | "lt" => Ok(FilterOperator::Lt),
            "<=" | "le" => Ok(FilterOperator::Le),
            ">" | "gt" => Ok(FilterOperator::Gt),
            ">=" | "ge" => Ok(FilterOperator::Ge),
            "contains" => Ok(FilterOperator::Contains),
            other => Err(IngestError::InvalidFilter(format!("unknown operator '{other}'"))),
        }
    }
}

/// Parse a `key:operator:value` filter expression. The value may itself
/// contain `:`.
pub fn parse_filter(expression: &str) -> Result<Filter> {
    let mut parts = expression.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(key), Some(operator), Some(value)) if !key.is_empty() => {
            operator.parse::<FilterOperator>()?;
            Ok(Filter::new(key, operator, value))
        },
        _ => Err(IngestError::InvalidFilter(format!(
            "expected key:operator:value, got '{expression}'"
        ))),
    }
}

/// Check that every filter names a declared column and a known operator
pub fn validate_filters(descriptor: &SchemaDescriptor, filters: &[Filter]) -> Result<()> {
    for filter in filters {
        if descriptor.column(&filter.key).is_none() {
            return Err(IngestError::InvalidFilter(format!(
                "column '{}' is not part of the domain",
                filter.key
            )));
        }
        filter.operator.parse::<FilterOperator>()?;
    }
    Ok(())
}

/// A CSV holding only the descriptor's header row, in its delimiter
pub fn write_header(descriptor: &SchemaDescriptor) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(descriptor.delimiter_byte())
        .from_writer(Vec::new());

    writer
        .write_record(descriptor.labels())
        .map_err(IngestError::Export)?;

    writer
        .into_inner()
        .map_err(|e| IngestError::Export(csv::Error::from(e.into_error())))
}

/// `<domain>_<YYYYMMDD_HHMMSS>.csv`
pub fn export_file_name(domain: &str, at: DateTime<Utc>) -> String {
    format!("{}_{}.csv", domain, at.format("%Y%m%d_%H%M%S"))
}

/// Resolves a domain and asks its processor for filtered CSV
#[derive(Debug, Clone)]
pub struct DownloadService {
    registry: Arc<DomainRegistry>,
}

impl DownloadService {
    pub fn new(registry: Arc<DomainRegistry>) -> Self {
        Self { registry }
    }

    pub fn download(&self, domain: &str, filters: &[Filter]) -> Result<Vec<u8>> {
        let processor = self
            .registry
            .get(domain)
            .ok_or_else(|| IngestError::UnknownDomain(domain.to_string()))?;

        let csv = processor.generate_csv(filters)?;
        info!(domain, filters = filters.len(), bytes = csv.len(), "Generated export");

        Ok(csv)
    }
}
