//! Error types for CSVGate

use thiserror::Error;

/// Result type alias for CSVGate operations
pub type Result<T> = std::result::Result<T, CsvGateError>;

/// Main error type shared across the workspace
#[derive(Error, Debug)]
pub enum CsvGateError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Descriptor must declare at least one column")]
    NoColumns,

    #[error("Column '{0}' is declared more than once")]
    DuplicateColumn(String),

    #[error("Invalid delimiter {0:?}: expected a single ASCII character other than quote or line break")]
    InvalidDelimiter(char),

    #[error("Reserved column '{0}' cannot be a key column")]
    ReservedKeyColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),
}
