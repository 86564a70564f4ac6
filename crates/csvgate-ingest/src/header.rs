//! Header validation
//!
//! Headers are matched by label, not position, so a file whose columns are
//! reordered is still accepted. The resulting [`HeaderMap`] is built once
//! per upload and gives every record lookup O(1) access to its fields.

use csvgate_common::types::SchemaDescriptor;
use std::collections::HashMap;
use tracing::debug;

use crate::error::HeaderMismatch;

/// Where each descriptor column lives in the decoded records of one upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderMap {
    by_label: HashMap<String, usize>,
    /// Field index of each descriptor column, in descriptor order
    by_column: Vec<usize>,
}

impl HeaderMap {
    /// Positional mapping for files without a header: column `i` of the
    /// descriptor is field `i` of every record.
    pub fn positional(descriptor: &SchemaDescriptor) -> Self {
        let by_label = descriptor
            .labels()
            .enumerate()
            .map(|(i, label)| (label.to_string(), i))
            .collect();

        Self {
            by_label,
            by_column: (0..descriptor.column_count()).collect(),
        }
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.by_label.get(label).copied()
    }

    /// Field index of the descriptor column at `position`
    pub fn column_index(&self, position: usize) -> Option<usize> {
        self.by_column.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.by_label.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_label.is_empty()
    }
}

/// Check a decoded header row against `descriptor`.
///
/// The header must be exactly as wide as the descriptor and name every
/// declared column once, so each label maps to a single field.
pub fn validate_header<'a, I>(
    header: I,
    descriptor: &SchemaDescriptor,
) -> Result<HeaderMap, HeaderMismatch>
where
    I: IntoIterator<Item = &'a str>,
{
    let labels: Vec<&str> = header.into_iter().collect();

    if labels.len() != descriptor.column_count() {
        return Err(HeaderMismatch::ColumnCount {
            found: labels.len(),
            expected: descriptor.column_count(),
        });
    }

    let mut by_label = HashMap::with_capacity(labels.len());
    for (index, label) in labels.iter().enumerate() {
        if by_label.insert(label.to_string(), index).is_some() {
            return Err(HeaderMismatch::DuplicateLabel(label.to_string()));
        }
    }

    let mut by_column = Vec::with_capacity(descriptor.column_count());
    for column in descriptor.columns() {
        match by_label.get(&column.label) {
            Some(&index) => by_column.push(index),
            None if descriptor.cud_control() && column.is_reserved() => {
                return Err(HeaderMismatch::MissingControlColumn(column.label.clone()));
            },
            None => return Err(HeaderMismatch::MissingColumn(column.label.clone())),
        }
    }

    debug!(columns = by_column.len(), "Header matches descriptor");

    Ok(HeaderMap {
        by_label,
        by_column,
    })
}
