//! Upload pipeline
//!
//! Streams one file through BOM stripping, CSV decoding, header validation
//! and per-record validation, hashing and duplicate rejection. An upload is
//! all or nothing: the first violation aborts it and leaves its state at
//! `Error`; a clean pass leaves it at `Staged`.

use csv::StringRecord;
use csvgate_common::types::{SchemaDescriptor, UploadState};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, trace, warn};

use crate::bom::{strip_bom, BomStripped};
use crate::error::{IngestError, Result, UploadError};
use crate::hasher::key_hash;
use crate::header::{validate_header, HeaderMap};
use crate::id::UploadIdGenerator;
use crate::record::validate_record;
use crate::registry::DomainRegistry;
use crate::state::UploadStateStore;

/// Outcome of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub upload_id: String,
    pub domain: String,
    /// Data rows accepted, header excluded
    pub rows: usize,
}

/// One validated data row. Lives for a single pass over the file.
#[derive(Debug, Clone)]
pub struct UploadRecord {
    /// 1-based data row number
    pub row: usize,
    pub fields: StringRecord,
    pub key_hash: String,
}

/// Validated records of one CSV stream, in file order.
///
/// The header (if the descriptor declares one) is read and checked when
/// the stream is opened. Iteration stops after the first error.
pub struct RecordStream<'d, R: Read> {
    descriptor: &'d SchemaDescriptor,
    header: HeaderMap,
    records: csv::StringRecordsIntoIter<BomStripped<R>>,
    /// First decoded row of a headerless file, already pulled to detect emptiness
    pending: Option<StringRecord>,
    row: usize,
    finished: bool,
}

impl<'d, R: Read> RecordStream<'d, R> {
    pub fn open(descriptor: &'d SchemaDescriptor, input: R) -> Result<Self> {
        let input = strip_bom(input)?;

        // Field counts are checked per record, so the decoder must not
        // reject ragged rows itself.
        let mut records = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(descriptor.delimiter_byte())
            .from_reader(input)
            .into_records();

        let first = records
            .next()
            .ok_or(IngestError::EmptyFile)?
            .map_err(|source| IngestError::Decode { row: 0, source })?;

        let (header, pending) = if descriptor.has_header() {
            (validate_header(first.iter(), descriptor)?, None)
        } else {
            (HeaderMap::positional(descriptor), Some(first))
        };

        Ok(Self {
            descriptor,
            header,
            records,
            pending,
            row: 0,
            finished: false,
        })
    }

    /// Data rows yielded so far
    pub fn rows(&self) -> usize {
        self.row
    }

    fn next_raw(&mut self) -> Option<Result<StringRecord>> {
        if let Some(record) = self.pending.take() {
            return Some(Ok(record));
        }

        let row = self.row;
        self.records
            .next()
            .map(|decoded| decoded.map_err(|source| IngestError::Decode { row, source }))
    }

    fn check(&self, fields: StringRecord, row: usize) -> Result<UploadRecord> {
        validate_record(&fields, &self.header, row, self.descriptor)?;
        let key_hash = key_hash(&fields, &self.header, self.descriptor, row)?;

        Ok(UploadRecord {
            row,
            fields,
            key_hash,
        })
    }
}

impl<R: Read> Iterator for RecordStream<'_, R> {
    type Item = Result<UploadRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let result = match self.next_raw()? {
            Ok(fields) => {
                self.row += 1;
                self.check(fields, self.row)
            },
            Err(e) => Err(e),
        };

        if result.is_err() {
            self.finished = true;
        }
        Some(result)
    }
}

/// Rows validated between two progress reports of an upload
pub const PROGRESS_INTERVAL: usize = 1000;

/// Run a whole stream for `descriptor`, rejecting repeated keys when the
/// descriptor asks for uniqueness. Returns the number of data rows.
pub fn validate_stream<R: Read>(descriptor: &SchemaDescriptor, input: R) -> Result<usize> {
    validate_stream_reporting(descriptor, input, PROGRESS_INTERVAL, |_| {})
}

/// [`validate_stream`], calling `on_progress` with the number of rows
/// accepted so far after every `every` rows and once more at the end.
pub fn validate_stream_reporting<R, F>(
    descriptor: &SchemaDescriptor,
    input: R,
    every: usize,
    mut on_progress: F,
) -> Result<usize>
where
    R: Read,
    F: FnMut(usize),
{
    let every = every.max(1);
    let mut stream = RecordStream::open(descriptor, input)?;
    // key hash -> first row it appeared on
    let mut seen: HashMap<String, usize> = HashMap::new();

    for record in stream.by_ref() {
        let record = record?;

        if descriptor.enforce_uniqueness() {
            if let Some(&original_row) = seen.get(&record.key_hash) {
                return Err(IngestError::DuplicateKey {
                    row: record.row,
                    original_row,
                });
            }
            seen.insert(record.key_hash.clone(), record.row);
        }

        trace!(row = record.row, key_hash = %record.key_hash, "Record accepted");

        if record.row % every == 0 {
            on_progress(record.row);
        }
    }

    on_progress(stream.rows());
    Ok(stream.rows())
}

/// Records `Error` for an upload unless it was finished explicitly, so an
/// early return, a panic or a dropped task never leaves it at `Ready`.
struct StateGuard<'a> {
    states: &'a UploadStateStore,
    upload_id: &'a str,
    finished: bool,
}

impl<'a> StateGuard<'a> {
    fn start(states: &'a UploadStateStore, upload_id: &'a str) -> Self {
        states.set_state(upload_id, UploadState::Ready);
        Self {
            states,
            upload_id,
            finished: false,
        }
    }

    fn finish(mut self, state: UploadState) {
        self.states.set_state(self.upload_id, state);
        self.finished = true;
    }
}

impl Drop for StateGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.states.set_state(self.upload_id, UploadState::Error);
        }
    }
}

/// Entry point for uploads and status queries
#[derive(Debug)]
pub struct UploadService {
    registry: Arc<DomainRegistry>,
    states: Arc<UploadStateStore>,
    ids: UploadIdGenerator,
}

impl UploadService {
    pub fn new(registry: Arc<DomainRegistry>, states: Arc<UploadStateStore>) -> Self {
        Self {
            registry,
            states,
            ids: UploadIdGenerator::new(),
        }
    }

    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    pub fn states(&self) -> &Arc<UploadStateStore> {
        &self.states
    }

    /// Validate `input` as a file of `domain`.
    ///
    /// On failure the returned error names the upload whose state was set
    /// to `Error`; an unknown domain is refused before any identifier is
    /// issued.
    pub fn upload<R: Read>(&self, domain: &str, input: R) -> std::result::Result<UploadReceipt, UploadError> {
        let descriptor = self.registry.descriptor(domain).ok_or_else(|| UploadError {
            upload_id: None,
            source: IngestError::UnknownDomain(domain.to_string()),
        })?;

        let upload_id = self.ids.next_id(domain);
        let guard = StateGuard::start(&self.states, &upload_id);
        info!(upload_id = %upload_id, domain, "Upload started");

        let progress = |rows| self.states.set_progress(&upload_id, rows);

        match validate_stream_reporting(descriptor, input, PROGRESS_INTERVAL, progress) {
            Ok(rows) => {
                guard.finish(UploadState::Staged);
                info!(upload_id = %upload_id, domain, rows, "Upload staged");

                Ok(UploadReceipt {
                    upload_id,
                    domain: domain.to_string(),
                    rows,
                })
            },
            Err(source) => {
                guard.finish(UploadState::Error);
                warn!(
                    upload_id = %upload_id,
                    domain,
                    kind = %source.kind(),
                    row = ?source.row(),
                    error = %source,
                    "Upload rejected"
                );

                Err(UploadError {
                    upload_id: Some(upload_id),
                    source,
                })
            },
        }
    }

    /// Run [`upload`](Self::upload) on a blocking task. The outcome is
    /// observed by awaiting the handle.
    pub fn spawn_upload<R>(
        self: &Arc<Self>,
        domain: impl Into<String>,
        input: R,
    ) -> JoinHandle<std::result::Result<UploadReceipt, UploadError>>
    where
        R: Read + Send + 'static,
    {
        let service = Arc::clone(self);
        let domain = domain.into();
        tokio::task::spawn_blocking(move || service.upload(&domain, input))
    }

    pub fn get_state(&self, upload_id: &str) -> UploadState {
        self.states.get_state(upload_id)
    }

    /// Data rows validated so far, `None` for unknown identifiers
    pub fn get_progress(&self, upload_id: &str) -> Option<usize> {
        self.states.get_progress(upload_id)
    }

    pub fn get_descriptor(&self, domain: &str) -> Result<SchemaDescriptor> {
        self.registry
            .descriptor(domain)
            .cloned()
            .ok_or_else(|| IngestError::UnknownDomain(domain.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use csvgate_common::types::{ColumnSpec, ColumnType};

    fn descriptor(has_header: bool) -> SchemaDescriptor {
        SchemaDescriptor::builder()
            .has_header(has_header)
            .delimiter(';')
            .column(ColumnSpec::new("supplier", ColumnType::String).key())
            .column(ColumnSpec::new("item", ColumnType::String).key())
            .column(ColumnSpec::new("quantity", ColumnType::Float))
            .enforce_uniqueness(true)
            .build()
            .unwrap()
    }

    #[test]
    fn test_stream_yields_rows_in_order() {
        let descriptor = descriptor(true);
        let input = "supplier;item;quantity\nAcme;Widget;1\nAcme;Gadget;2\n";

        let rows: Vec<usize> = RecordStream::open(&descriptor, input.as_bytes())
            .unwrap()
            .map(|r| r.unwrap().row)
            .collect();
        assert_eq!(rows, vec![1, 2]);
    }

    #[test]
    fn test_stream_stops_after_error() {
        let descriptor = descriptor(true);
        let input = "supplier;item;quantity\nAcme;Widget;x\nAcme;Gadget;2\n";

        let results: Vec<_> = RecordStream::open(&descriptor, input.as_bytes())
            .unwrap()
            .collect();
        assert_eq!(results.len(), 1);
        assert!(results[0].is_err());
    }

    #[test]
    fn test_headerless_first_row_is_data() {
        let descriptor = descriptor(false);
        let rows = validate_stream(&descriptor, "Acme;Widget;1\nAcme;Gadget;2\n".as_bytes()).unwrap();
        assert_eq!(rows, 2);

        let err = validate_stream(&descriptor, "Acme;Widget;1\nAcme;Widget;2\n".as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            IngestError::DuplicateKey {
                row: 2,
                original_row: 1
            }
        ));
    }

    #[test]
    fn test_empty_input() {
        let err = validate_stream(&descriptor(true), "".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyFile);

        let err = validate_stream(&descriptor(true), "\u{feff}".as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyFile);
    }

    #[test]
    fn test_progress_reported_every_interval_and_at_end() {
        let descriptor = descriptor(true);
        let input = "supplier;item;quantity\nA;1;1\nA;2;1\nA;3;1\nA;4;1\nA;5;1\n";

        let mut reports = Vec::new();
        let rows =
            validate_stream_reporting(&descriptor, input.as_bytes(), 2, |n| reports.push(n)).unwrap();

        assert_eq!(rows, 5);
        assert_eq!(reports, vec![2, 4, 5]);
    }

    #[test]
    fn test_progress_stops_at_failing_row() {
        let descriptor = descriptor(true);
        let input = "supplier;item;quantity\nA;1;1\nA;2;1\nA;3;x\nA;4;1\n";

        let mut reports = Vec::new();
        let err = validate_stream_reporting(&descriptor, input.as_bytes(), 1, |n| reports.push(n))
            .unwrap_err();

        assert_eq!(err.row(), Some(3));
        assert_eq!(reports, vec![1, 2]);
    }

    #[test]
    fn test_repeated_header_label_rejected() {
        let descriptor = descriptor(true);
        let input = "supplier;supplier;item;quantity\nAcme;Widget;7\nGlobex;Widget;7\n";

        let err = validate_stream(&descriptor, input.as_bytes()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SchemaMismatch);

        let input = "supplier;supplier;item\nAcme;Widget;7\n";
        let err = validate_stream(&descriptor, input.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn test_header_only_file_has_no_rows() {
        let rows = validate_stream(&descriptor(true), "supplier;item;quantity\n".as_bytes()).unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn test_duplicates_allowed_without_uniqueness() {
        let descriptor = SchemaDescriptor::builder()
            .column(ColumnSpec::new("supplier", ColumnType::String).key())
            .build()
            .unwrap();

        let rows = validate_stream(&descriptor, "supplier\nAcme\nAcme\n".as_bytes()).unwrap();
        assert_eq!(rows, 2);
    }

    #[test]
    fn test_guard_records_error_on_drop() {
        let states = UploadStateStore::new();
        {
            let _guard = StateGuard::start(&states, "PO-1");
            assert_eq!(states.get_state("PO-1"), UploadState::Ready);
        }
        assert_eq!(states.get_state("PO-1"), UploadState::Error);

        StateGuard::start(&states, "PO-2").finish(UploadState::Staged);
        assert_eq!(states.get_state("PO-2"), UploadState::Staged);
    }
}
