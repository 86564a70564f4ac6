//! CSVGate Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Schema-driven validation of domain CSV uploads.
//!
//! # Pipeline
//!
//! Every upload is streamed once: the UTF-8 BOM is stripped, the header is
//! matched against the domain's [`SchemaDescriptor`] by label, and each
//! record is checked for width, CUD markers, mandatory fields and types
//! before its key columns are hashed for duplicate detection. The first
//! violation rejects the whole file.
//!
//! # Example
//!
//! ```
//! use csvgate_ingest::domains::builtin_registry;
//! use csvgate_ingest::{UploadService, UploadStateStore};
//! use csvgate_common::types::UploadState;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(builtin_registry().unwrap());
//! let service = UploadService::new(registry, Arc::new(UploadStateStore::new()));
//!
//! let csv = "supplier;delivery_date;item;location;quantity\nAcme;31/01/2024;Widget;10;5\n";
//! let receipt = service.upload("purchase_order", csv.as_bytes()).unwrap();
//!
//! assert_eq!(receipt.rows, 1);
//! assert_eq!(service.get_state(&receipt.upload_id), UploadState::Staged);
//! ```
//!
//! [`SchemaDescriptor`]: csvgate_common::types::SchemaDescriptor

pub mod bom;
pub mod config;
pub mod domains;
pub mod download;
pub mod error;
pub mod hasher;
pub mod header;
pub mod id;
pub mod pipeline;
pub mod record;
pub mod registry;
pub mod state;
pub mod type_check;

pub use download::DownloadService;
pub use error::{ErrorKind, IngestError, UploadError};
pub use pipeline::{UploadReceipt, UploadService};
pub use registry::{DomainProcessor, DomainRegistry};
pub use state::UploadStateStore;
