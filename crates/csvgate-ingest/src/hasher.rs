//! Duplicate-key fingerprints
//!
//! The fingerprint of a record is the SHA-256 of its key column values,
//! taken in descriptor order and joined by a single space. Non-key columns
//! never contribute, so two rows that differ only outside the key are the
//! same business entity.

use csv::StringRecord;
use csvgate_common::checksum::joined_sha256_hex;
use csvgate_common::types::SchemaDescriptor;

use crate::error::Result;
use crate::header::HeaderMap;
use crate::record::field;

/// Separator placed between key values before hashing
pub const KEY_SEPARATOR: &str = " ";

/// Hex-encoded SHA-256 fingerprint of the key columns of `record`, the
/// 1-based data row `row`
pub fn key_hash(
    record: &StringRecord,
    header: &HeaderMap,
    descriptor: &SchemaDescriptor,
    row: usize,
) -> Result<String> {
    let values = descriptor
        .key_columns()
        .map(|column| field(record, header, &column.label, row))
        .collect::<Result<Vec<&str>>>()?;

    Ok(joined_sha256_hex(values, KEY_SEPARATOR))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::header::validate_header;
    use csvgate_common::checksum::sha256_hex;
    use csvgate_common::types::{ColumnSpec, ColumnType};
    use proptest::prelude::*;

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor::builder()
            .column(ColumnSpec::new("supplier", ColumnType::String).key())
            .column(ColumnSpec::new("item", ColumnType::String).key())
            .column(ColumnSpec::new("quantity", ColumnType::Float))
            .build()
            .unwrap()
    }

    fn hash(fields: &[&str]) -> String {
        let descriptor = descriptor();
        let header = HeaderMap::positional(&descriptor);
        key_hash(&StringRecord::from(fields.to_vec()), &header, &descriptor, 1).unwrap()
    }

    #[test]
    fn test_hash_of_joined_key_values() {
        assert_eq!(hash(&["Acme", "Widget", "10.5"]), sha256_hex("Acme Widget"));
    }

    #[test]
    fn test_key_order_follows_descriptor_not_header() {
        let descriptor = descriptor();
        let header = validate_header(["item", "quantity", "supplier"], &descriptor).unwrap();
        let record = StringRecord::from(vec!["Widget", "1", "Acme"]);

        assert_eq!(
            key_hash(&record, &header, &descriptor, 1).unwrap(),
            sha256_hex("Acme Widget")
        );
    }

    #[test]
    fn test_different_keys_differ() {
        assert_ne!(hash(&["Acme", "Widget", "1"]), hash(&["Acme", "Gadget", "1"]));
    }

    proptest! {
        #[test]
        fn prop_non_key_columns_do_not_matter(
            supplier in "[A-Za-z0-9]{0,10}",
            item in "[A-Za-z0-9]{0,10}",
            first in "[0-9.]{0,6}",
            second in "[0-9.]{0,6}",
        ) {
            prop_assert_eq!(
                hash(&[supplier.as_str(), item.as_str(), first.as_str()]),
                hash(&[supplier.as_str(), item.as_str(), second.as_str()])
            );
        }

        #[test]
        fn prop_key_change_changes_hash(
            supplier in "[A-Za-z]{1,10}",
            item in "[A-Za-z]{1,10}",
            other in "[A-Za-z]{1,10}",
        ) {
            prop_assume!(item != other);
            prop_assert_ne!(
                hash(&[supplier.as_str(), item.as_str(), "1"]),
                hash(&[supplier.as_str(), other.as_str(), "1"])
            );
        }
    }
}
