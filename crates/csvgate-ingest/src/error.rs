//! Error types for upload ingestion
//!
//! Every failure aborts the upload it belongs to and carries enough context
//! (row number, column label, expected vs. actual) to locate the offending
//! input. Row numbers are 1-based data rows; the header is not counted.

use csvgate_common::types::ColumnType;
use thiserror::Error;

use crate::record::Operator;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Why a header row was rejected
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderMismatch {
    #[error("number of columns in the header ({found}) does not match the expected structure ({expected})")]
    ColumnCount { found: usize, expected: usize },

    #[error("column '{0}' does not exist in the header")]
    MissingColumn(String),

    #[error("column '{0}' appears more than once in the header")]
    DuplicateLabel(String),

    #[error("control column '{0}' does not exist in the header")]
    MissingControlColumn(String),
}

/// Ingestion error taxonomy
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("There is no processor registered for the domain '{0}'")]
    UnknownDomain(String),

    #[error("Failed to read the upload stream: {0}")]
    Stream(#[from] std::io::Error),

    #[error("Failed to decode CSV after record {row}: {source}")]
    Decode {
        row: usize,
        #[source]
        source: csv::Error,
    },

    #[error("Empty file")]
    EmptyFile,

    #[error("Invalid header: {0}")]
    SchemaMismatch(#[from] HeaderMismatch),

    #[error("Record {row} has an incorrect number of columns: expected {expected}, but found {found}")]
    StructuralMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Invalid operator '{value}' for record {row}")]
    InvalidOperator { row: usize, value: String },

    #[error("Record {row}: {}", .operator.hash_control_rule())]
    CudConsistency { row: usize, operator: Operator },

    #[error("Column '{column}' of record {row} cannot be empty")]
    MissingMandatoryField { row: usize, column: String },

    #[error("Column '{column}' of record {row} has the value '{value}', expected type {expected}")]
    TypeMismatch {
        row: usize,
        column: String,
        value: String,
        expected: ColumnType,
    },

    #[error("Record {row} is duplicated with record {original_row}")]
    DuplicateKey { row: usize, original_row: usize },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Failed to write CSV export: {0}")]
    Export(#[source] csv::Error),
}

/// Fieldless mirror of [`IngestError`], for matching and metrics labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownDomain,
    Stream,
    EmptyFile,
    SchemaMismatch,
    StructuralMismatch,
    InvalidOperator,
    CudConsistency,
    MissingMandatoryField,
    TypeMismatch,
    DuplicateKey,
    InvalidFilter,
    Export,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::UnknownDomain => "unknown_domain",
            ErrorKind::Stream => "stream_error",
            ErrorKind::EmptyFile => "empty_file",
            ErrorKind::SchemaMismatch => "schema_mismatch",
            ErrorKind::StructuralMismatch => "structural_mismatch",
            ErrorKind::InvalidOperator => "invalid_operator",
            ErrorKind::CudConsistency => "cud_consistency",
            ErrorKind::MissingMandatoryField => "missing_mandatory_field",
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::DuplicateKey => "duplicate_key",
            ErrorKind::InvalidFilter => "invalid_filter",
            ErrorKind::Export => "export_error",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl IngestError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::UnknownDomain(_) => ErrorKind::UnknownDomain,
            IngestError::Stream(_) | IngestError::Decode { .. } => ErrorKind::Stream,
            IngestError::EmptyFile => ErrorKind::EmptyFile,
            IngestError::SchemaMismatch(_) => ErrorKind::SchemaMismatch,
            IngestError::StructuralMismatch { .. } => ErrorKind::StructuralMismatch,
            IngestError::InvalidOperator { .. } => ErrorKind::InvalidOperator,
            IngestError::CudConsistency { .. } => ErrorKind::CudConsistency,
            IngestError::MissingMandatoryField { .. } => ErrorKind::MissingMandatoryField,
            IngestError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            IngestError::DuplicateKey { .. } => ErrorKind::DuplicateKey,
            IngestError::InvalidFilter(_) => ErrorKind::InvalidFilter,
            IngestError::Export(_) => ErrorKind::Export,
        }
    }

    /// True when the caller asked for something that does not exist, as
    /// opposed to submitting bad data.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, IngestError::UnknownDomain(_) | IngestError::InvalidFilter(_))
    }

    /// The data row the error points at, if any
    pub fn row(&self) -> Option<usize> {
        match self {
            IngestError::Decode { row, .. }
            | IngestError::StructuralMismatch { row, .. }
            | IngestError::InvalidOperator { row, .. }
            | IngestError::CudConsistency { row, .. }
            | IngestError::MissingMandatoryField { row, .. }
            | IngestError::TypeMismatch { row, .. }
            | IngestError::DuplicateKey { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// A failed upload: the error plus the identifier whose state was set to `Error`.
///
/// `upload_id` is `None` when the upload was refused before an identifier
/// was issued (unknown domain).
#[derive(Error, Debug)]
#[error("{source}")]
pub struct UploadError {
    pub upload_id: Option<String>,
    #[source]
    pub source: IngestError,
}

impl UploadError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_context() {
        let err = IngestError::TypeMismatch {
            row: 1,
            column: "quantity".to_string(),
            value: "abc".to_string(),
            expected: ColumnType::Float,
        };
        assert_eq!(
            err.to_string(),
            "Column 'quantity' of record 1 has the value 'abc', expected type Float"
        );

        let err = IngestError::DuplicateKey {
            row: 2,
            original_row: 1,
        };
        assert_eq!(err.to_string(), "Record 2 is duplicated with record 1");
        assert_eq!(err.row(), Some(2));
    }

    #[test]
    fn test_cud_message_depends_on_operator() {
        let add = IngestError::CudConsistency {
            row: 4,
            operator: Operator::Add,
        };
        assert!(add.to_string().contains("must be empty"));

        let delete = IngestError::CudConsistency {
            row: 4,
            operator: Operator::Delete,
        };
        assert!(delete.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_kind_and_caller_errors() {
        let unknown = IngestError::UnknownDomain("invoices".to_string());
        assert_eq!(unknown.kind(), ErrorKind::UnknownDomain);
        assert!(unknown.is_caller_error());

        let header = IngestError::from(HeaderMismatch::MissingColumn("item".to_string()));
        assert_eq!(header.kind(), ErrorKind::SchemaMismatch);
        assert!(!header.is_caller_error());
        assert_eq!(header.row(), None);

        let io = IngestError::from(std::io::Error::other("disk gone"));
        assert_eq!(io.kind().as_str(), "stream_error");
    }
}
