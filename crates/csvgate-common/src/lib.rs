//! CSVGate Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared types, digests, logging, and error handling for the CSVGate workspace.
//!
//! # Overview
//!
//! - **Types**: column types, schema descriptors, upload states, download filters
//! - **Checksums**: SHA-256 digests used for duplicate-key fingerprints
//! - **Logging**: one place to configure `tracing` for every binary
//! - **Error Handling**: [`CsvGateError`] and the [`Result`] alias
//!
//! # Example
//!
//! ```
//! use csvgate_common::types::{ColumnSpec, ColumnType, SchemaDescriptor};
//!
//! let descriptor = SchemaDescriptor::builder()
//!     .delimiter(';')
//!     .column(ColumnSpec::new("supplier", ColumnType::String).mandatory().key())
//!     .column(ColumnSpec::new("quantity", ColumnType::Float))
//!     .enforce_uniqueness(true)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(descriptor.column_count(), 2);
//! ```

pub mod checksum;
pub mod error;
pub mod logging;
pub mod types;

// Re-export commonly used types
pub use error::{CsvGateError, Result};
