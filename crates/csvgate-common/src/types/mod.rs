//! Common types used across CSVGate
//!
//! The schema model here is what every domain hands to the ingest core:
//! a [`SchemaDescriptor`] made of ordered [`ColumnSpec`]s. Descriptors are
//! validated once, on construction, and never change afterwards.

use crate::error::{CsvGateError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Label of the CUD operator column (`A`, `U`, `D`).
pub const OPERATOR_COLUMN: &str = "operator";

/// Label of the change-tracking hash column that accompanies the operator.
pub const HASH_CONTROL_COLUMN: &str = "hash_control";

// ============================================================================
// Column Types
// ============================================================================

/// Semantic type of a CSV column.
///
/// The set is closed: adding a variant means extending the type checker in
/// the ingest crate as well, and the exhaustive matches there enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    String,
    Int,
    Float,
    /// `DD/MM/YYYY`
    Date,
    /// `DD/MM/YYYY HH:MM:SS`
    DateTime,
}

impl ColumnType {
    /// Every variant, in declaration order.
    pub const ALL: [ColumnType; 5] = [
        ColumnType::String,
        ColumnType::Int,
        ColumnType::Float,
        ColumnType::Date,
        ColumnType::DateTime,
    ];

    /// Short lowercase name, as used in descriptor files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::String => "string",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "String"),
            ColumnType::Int => write!(f, "Int"),
            ColumnType::Float => write!(f, "Float"),
            ColumnType::Date => write!(f, "Date with 'DD/MM/YYYY' format"),
            ColumnType::DateTime => write!(f, "DateTime with 'DD/MM/YYYY HH24:MI:SS' format"),
        }
    }
}

impl std::str::FromStr for ColumnType {
    type Err = CsvGateError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "string" | "text" => Ok(ColumnType::String),
            "int" | "integer" => Ok(ColumnType::Int),
            "float" | "decimal" => Ok(ColumnType::Float),
            "date" => Ok(ColumnType::Date),
            "datetime" | "date_time" => Ok(ColumnType::DateTime),
            _ => Err(CsvGateError::Parse(format!("Unknown column type: {}", s))),
        }
    }
}

// ============================================================================
// Column Specification
// ============================================================================

/// One expected column of a domain's CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Header text, matched exactly
    pub label: String,

    /// Declared semantic type
    #[serde(rename = "type")]
    pub column_type: ColumnType,

    /// Empty values are rejected when set
    #[serde(default)]
    pub mandatory: bool,

    /// Whether the column is supplied by the uploader (as opposed to derived)
    #[serde(default = "default_true")]
    pub input: bool,

    /// Part of the deduplication fingerprint
    #[serde(default)]
    pub key: bool,
}

fn default_true() -> bool {
    true
}

impl ColumnSpec {
    /// Optional, non-key input column.
    pub fn new(label: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            label: label.into(),
            column_type,
            mandatory: false,
            input: true,
            key: false,
        }
    }

    pub fn mandatory(mut self) -> Self {
        self.mandatory = true;
        self
    }

    pub fn key(mut self) -> Self {
        self.key = true;
        self
    }

    /// Marks the column as derived rather than uploader-supplied.
    pub fn derived(mut self) -> Self {
        self.input = false;
        self
    }

    /// True for the two CUD control columns.
    pub fn is_reserved(&self) -> bool {
        is_reserved_label(&self.label)
    }
}

/// True for `operator` and `hash_control`.
pub fn is_reserved_label(label: &str) -> bool {
    label == OPERATOR_COLUMN || label == HASH_CONTROL_COLUMN
}

// ============================================================================
// Schema Descriptor
// ============================================================================

/// Raw descriptor fields as they appear in descriptor files, before validation.
#[derive(Debug, Clone, Deserialize)]
pub struct DescriptorFields {
    #[serde(default = "default_true")]
    pub has_header: bool,

    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    #[serde(default)]
    pub columns: Vec<ColumnSpec>,

    #[serde(default)]
    pub enforce_uniqueness: bool,

    #[serde(default)]
    pub cud_control: bool,
}

fn default_delimiter() -> char {
    ','
}

impl Default for DescriptorFields {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: default_delimiter(),
            columns: Vec::new(),
            enforce_uniqueness: false,
            cud_control: false,
        }
    }
}

/// Immutable description of one domain's CSV shape and validation rules.
///
/// Column order is the positional order used when the file has no header.
/// When CUD control is enabled the descriptor always contains the
/// `operator` and `hash_control` columns, so [`column_count`] is the exact
/// width expected of every header and record.
///
/// [`column_count`]: SchemaDescriptor::column_count
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "DescriptorFields")]
pub struct SchemaDescriptor {
    has_header: bool,
    delimiter: char,
    columns: Vec<ColumnSpec>,
    enforce_uniqueness: bool,
    cud_control: bool,
}

impl SchemaDescriptor {
    /// Create a builder for fluent construction
    pub fn builder() -> SchemaDescriptorBuilder {
        SchemaDescriptorBuilder::default()
    }

    pub fn has_header(&self) -> bool {
        self.has_header
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Delimiter as the single byte the CSV reader expects.
    ///
    /// Construction guarantees the delimiter is ASCII.
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter as u8
    }

    pub fn columns(&self) -> &[ColumnSpec] {
        &self.columns
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, label: &str) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.label == label)
    }

    /// Key columns in descriptor order.
    pub fn key_columns(&self) -> impl Iterator<Item = &ColumnSpec> {
        self.columns.iter().filter(|c| c.key)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.label.as_str())
    }

    pub fn enforce_uniqueness(&self) -> bool {
        self.enforce_uniqueness
    }

    pub fn cud_control(&self) -> bool {
        self.cud_control
    }

    /// Pretty JSON rendering, for callers that display the expected shape.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl TryFrom<DescriptorFields> for SchemaDescriptor {
    type Error = CsvGateError;

    fn try_from(fields: DescriptorFields) -> Result<Self> {
        if fields.columns.is_empty() {
            return Err(CsvGateError::NoColumns);
        }

        let delimiter = fields.delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\r' | '\n') {
            return Err(CsvGateError::InvalidDelimiter(delimiter));
        }

        let mut seen = HashSet::with_capacity(fields.columns.len());
        for column in &fields.columns {
            if !seen.insert(column.label.as_str()) {
                return Err(CsvGateError::DuplicateColumn(column.label.clone()));
            }
        }

        let mut columns = fields.columns;

        if fields.cud_control {
            if let Some(column) = columns.iter().find(|c| c.is_reserved() && c.key) {
                return Err(CsvGateError::ReservedKeyColumn(column.label.clone()));
            }

            if !columns.iter().any(|c| c.label == OPERATOR_COLUMN) {
                columns.push(ColumnSpec::new(OPERATOR_COLUMN, ColumnType::String).mandatory());
            }
            if !columns.iter().any(|c| c.label == HASH_CONTROL_COLUMN) {
                columns.push(ColumnSpec::new(HASH_CONTROL_COLUMN, ColumnType::String));
            }
        }

        Ok(Self {
            has_header: fields.has_header,
            delimiter,
            columns,
            enforce_uniqueness: fields.enforce_uniqueness,
            cud_control: fields.cud_control,
        })
    }
}

/// Builder for SchemaDescriptor
#[derive(Default)]
pub struct SchemaDescriptorBuilder {
    fields: DescriptorFields,
}

impl SchemaDescriptorBuilder {
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.fields.has_header = has_header;
        self
    }

    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.fields.delimiter = delimiter;
        self
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.fields.columns.push(column);
        self
    }

    pub fn columns(mut self, columns: impl IntoIterator<Item = ColumnSpec>) -> Self {
        self.fields.columns.extend(columns);
        self
    }

    pub fn enforce_uniqueness(mut self, enforce: bool) -> Self {
        self.fields.enforce_uniqueness = enforce;
        self
    }

    pub fn cud_control(mut self, enabled: bool) -> Self {
        self.fields.cud_control = enabled;
        self
    }

    pub fn build(self) -> Result<SchemaDescriptor> {
        SchemaDescriptor::try_from(self.fields)
    }
}

// ============================================================================
// Upload Lifecycle
// ============================================================================

/// Lifecycle state of one upload.
///
/// States only move forward (`Ready` < `Validated` < `Staged` < `Processed`);
/// `Error` can be entered from any non-terminal state and is terminal.
/// `Unknown` is the sentinel returned for identifiers that were never seen
/// and is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    Ready,
    Validated,
    Staged,
    Processed,
    Error,
    Unknown,
}

impl UploadState {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Ready => "ready",
            UploadState::Validated => "validated",
            UploadState::Staged => "staged",
            UploadState::Processed => "processed",
            UploadState::Error => "error",
            UploadState::Unknown => "unknown",
        }
    }

    /// Position in the forward progression, `None` for `Error` and `Unknown`.
    fn rank(&self) -> Option<u8> {
        match self {
            UploadState::Ready => Some(0),
            UploadState::Validated => Some(1),
            UploadState::Staged => Some(2),
            UploadState::Processed => Some(3),
            UploadState::Error | UploadState::Unknown => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Processed | UploadState::Error)
    }

    /// Whether moving from `self` to `next` respects the lifecycle.
    pub fn can_advance_to(&self, next: UploadState) -> bool {
        match (self, next) {
            (_, UploadState::Unknown) => false,
            (UploadState::Unknown, next) => next == UploadState::Ready,
            (current, _) if current.is_terminal() => false,
            (_, UploadState::Error) => true,
            (current, next) => match (current.rank(), next.rank()) {
                (Some(from), Some(to)) => to > from,
                _ => false,
            },
        }
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UploadState::Ready => "Ready",
            UploadState::Validated => "Validated",
            UploadState::Staged => "Staged",
            UploadState::Processed => "Processed",
            UploadState::Error => "Error",
            UploadState::Unknown => "Unknown",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Download Filters
// ============================================================================

/// A filter applied when exporting a domain's data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub key: String,
    pub value: String,
    pub operator: String,
}

impl Filter {
    pub fn new(
        key: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            operator: operator.into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn lead_time_columns() -> Vec<ColumnSpec> {
        vec![
            ColumnSpec::new("supplier", ColumnType::String).mandatory().key(),
            ColumnSpec::new("location", ColumnType::String).mandatory().key(),
            ColumnSpec::new("review_day", ColumnType::Int).mandatory().key(),
        ]
    }

    #[test]
    fn test_builder_defaults() {
        let descriptor = SchemaDescriptor::builder()
            .columns(lead_time_columns())
            .build()
            .unwrap();

        assert!(descriptor.has_header());
        assert_eq!(descriptor.delimiter(), ',');
        assert_eq!(descriptor.delimiter_byte(), b',');
        assert!(!descriptor.enforce_uniqueness());
        assert!(!descriptor.cud_control());
        assert_eq!(descriptor.key_columns().count(), 3);
    }

    #[test]
    fn test_rejects_empty_and_duplicate_columns() {
        assert!(matches!(SchemaDescriptor::builder().build(), Err(CsvGateError::NoColumns)));

        let err = SchemaDescriptor::builder()
            .column(ColumnSpec::new("item", ColumnType::String))
            .column(ColumnSpec::new("item", ColumnType::Int))
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvGateError::DuplicateColumn(label) if label == "item"));
    }

    #[test]
    fn test_rejects_unusable_delimiters() {
        for delimiter in ['"', '\n', '\r', '§'] {
            let result = SchemaDescriptor::builder()
                .delimiter(delimiter)
                .column(ColumnSpec::new("item", ColumnType::String))
                .build();
            assert!(
                matches!(result, Err(CsvGateError::InvalidDelimiter(d)) if d == delimiter),
                "delimiter {:?} should be rejected",
                delimiter
            );
        }
    }

    #[test]
    fn test_cud_control_appends_reserved_columns() {
        let descriptor = SchemaDescriptor::builder()
            .columns(lead_time_columns())
            .cud_control(true)
            .build()
            .unwrap();

        let labels: Vec<&str> = descriptor.labels().collect();
        assert_eq!(
            labels,
            vec!["supplier", "location", "review_day", OPERATOR_COLUMN, HASH_CONTROL_COLUMN]
        );
        assert!(descriptor.column(OPERATOR_COLUMN).unwrap().mandatory);
        assert!(!descriptor.column(HASH_CONTROL_COLUMN).unwrap().mandatory);
    }

    #[test]
    fn test_cud_control_keeps_declared_reserved_columns_in_place() {
        let descriptor = SchemaDescriptor::builder()
            .column(ColumnSpec::new(OPERATOR_COLUMN, ColumnType::String).mandatory())
            .columns(lead_time_columns())
            .column(ColumnSpec::new(HASH_CONTROL_COLUMN, ColumnType::String))
            .cud_control(true)
            .build()
            .unwrap();

        assert_eq!(descriptor.column_count(), 5);
        assert_eq!(descriptor.columns()[0].label, OPERATOR_COLUMN);
        assert_eq!(descriptor.columns()[4].label, HASH_CONTROL_COLUMN);
    }

    #[test]
    fn test_reserved_column_cannot_be_key() {
        let err = SchemaDescriptor::builder()
            .column(ColumnSpec::new(OPERATOR_COLUMN, ColumnType::String).key())
            .cud_control(true)
            .build()
            .unwrap_err();
        assert!(matches!(err, CsvGateError::ReservedKeyColumn(_)));
    }

    #[test]
    fn test_descriptor_deserializes_through_validation() {
        let json = r#"{
            "delimiter": ";",
            "enforce_uniqueness": true,
            "columns": [
                {"label": "supplier", "type": "string", "mandatory": true, "key": true},
                {"label": "quantity", "type": "float"}
            ]
        }"#;
        let descriptor: SchemaDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(descriptor.delimiter(), ';');
        assert!(descriptor.column("quantity").unwrap().input);

        let duplicate = r#"{"columns": [
            {"label": "a", "type": "int"},
            {"label": "a", "type": "int"}
        ]}"#;
        assert!(serde_json::from_str::<SchemaDescriptor>(duplicate).is_err());
    }

    #[test]
    fn test_column_type_names() {
        for column_type in ColumnType::ALL {
            assert_eq!(column_type.as_str().parse::<ColumnType>().unwrap(), column_type);
        }
        assert_eq!(ColumnType::Date.to_string(), "Date with 'DD/MM/YYYY' format");
        assert!("blob".parse::<ColumnType>().is_err());
    }

    #[test]
    fn test_upload_state_progression() {
        use UploadState::*;

        assert!(Unknown.can_advance_to(Ready));
        assert!(Ready.can_advance_to(Staged));
        assert!(Ready.can_advance_to(Error));
        assert!(Staged.can_advance_to(Processed));
        assert!(Staged.can_advance_to(Error));

        assert!(!Staged.can_advance_to(Ready));
        assert!(!Staged.can_advance_to(Staged));
        assert!(!Error.can_advance_to(Staged));
        assert!(!Processed.can_advance_to(Error));
        assert!(!Ready.can_advance_to(Unknown));
    }

    #[test]
    fn test_upload_state_display() {
        assert_eq!(UploadState::Staged.to_string(), "Staged");
        assert_eq!(UploadState::Unknown.as_str(), "unknown");
        assert_eq!(serde_json::to_string(&UploadState::Error).unwrap(), "\"error\"");
    }
}
