//! Upload identifiers

use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Issues `<DOMAIN>-<millis>-<seq>` identifiers.
///
/// The millisecond timestamp is zero-padded to 13 digits, so identifiers
/// sort by issue time; the sequence number makes them unique within a
/// process even when two are issued in the same millisecond.
#[derive(Debug, Default)]
pub struct UploadIdGenerator {
    sequence: AtomicU64,
}

impl UploadIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self, domain: &str) -> String {
        let sequence = self.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let millis = Utc::now().timestamp_millis().max(0);

        format!("{}-{:013}-{:06}", domain.to_uppercase(), millis, sequence)
    }
}
