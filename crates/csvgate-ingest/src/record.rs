//! Record validation
//!
//! Checks run in a fixed order and stop at the first violation: field count,
//! then the CUD markers (when enabled), then every column's emptiness and
//! type.

use csv::StringRecord;
use csvgate_common::types::{SchemaDescriptor, HASH_CONTROL_COLUMN, OPERATOR_COLUMN};

use crate::error::{IngestError, Result};
use crate::header::HeaderMap;
use crate::type_check::conforms;

/// Create/update/delete marker carried by the `operator` column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Update,
    Delete,
}

impl Operator {
    /// Parse an operator code. `A`, `U` and `D` are canonical; the spelled-out
    /// names are accepted too. Matching is case-sensitive.
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "A" | "Add" => Some(Operator::Add),
            "U" | "Update" => Some(Operator::Update),
            "D" | "Delete" => Some(Operator::Delete),
            _ => None,
        }
    }

    /// Whether a record with this operator needs a non-empty `hash_control`
    pub fn requires_hash_control(&self) -> bool {
        !matches!(self, Operator::Add)
    }

    /// Human-readable form of the `hash_control` rule for this operator
    pub fn hash_control_rule(&self) -> &'static str {
        match self {
            Operator::Add => "the hash_control column must be empty when the operator is Add",
            Operator::Update => {
                "the hash_control column must not be empty when the operator is Update"
            },
            Operator::Delete => {
                "the hash_control column must not be empty when the operator is Delete"
            },
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Add => "Add",
            Operator::Update => "Update",
            Operator::Delete => "Delete",
        };
        f.write_str(name)
    }
}

/// Field of `record` named `label`.
///
/// A label the header does not map, or an index past the end of the
/// record, means the record does not have the header's shape.
pub(crate) fn field<'r>(
    record: &'r StringRecord,
    header: &HeaderMap,
    label: &str,
    row: usize,
) -> Result<&'r str> {
    header
        .index_of(label)
        .and_then(|index| record.get(index))
        .ok_or_else(|| shape_mismatch(record, header, row))
}

fn shape_mismatch(record: &StringRecord, header: &HeaderMap, row: usize) -> IngestError {
    IngestError::StructuralMismatch {
        row,
        expected: header.len(),
        found: record.len(),
    }
}

/// Validate one decoded record. `row` is the 1-based data row number used
/// in error messages.
pub fn validate_record(
    record: &StringRecord,
    header: &HeaderMap,
    row: usize,
    descriptor: &SchemaDescriptor,
) -> Result<()> {
    if record.len() != descriptor.column_count() {
        return Err(IngestError::StructuralMismatch {
            row,
            expected: descriptor.column_count(),
            found: record.len(),
        });
    }

    if descriptor.cud_control() {
        validate_cud(record, header, row)?;
    }

    for (position, column) in descriptor.columns().iter().enumerate() {
        let value = header
            .column_index(position)
            .and_then(|index| record.get(index))
            .ok_or_else(|| shape_mismatch(record, header, row))?;

        if value.is_empty() {
            if column.mandatory {
                return Err(IngestError::MissingMandatoryField {
                    row,
                    column: column.label.clone(),
                });
            }
            continue;
        }

        if !conforms(column.column_type, value) {
            return Err(IngestError::TypeMismatch {
                row,
                column: column.label.clone(),
                value: value.to_string(),
                expected: column.column_type,
            });
        }
    }

    Ok(())
}

fn validate_cud(record: &StringRecord, header: &HeaderMap, row: usize) -> Result<Operator> {
    let code = field(record, header, OPERATOR_COLUMN, row)?;
    let operator = Operator::from_code(code).ok_or_else(|| IngestError::InvalidOperator {
        row,
        value: code.to_string(),
    })?;

    let has_hash = !field(record, header, HASH_CONTROL_COLUMN, row)?.is_empty();
    if has_hash != operator.requires_hash_control() {
        return Err(IngestError::CudConsistency { row, operator });
    }

    Ok(operator)
}
