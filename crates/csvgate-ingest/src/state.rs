//! Upload state store

use csvgate_common::types::UploadState;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::warn;

#[derive(Debug, Clone, Copy)]
struct UploadEntry {
    state: UploadState,
    /// Data rows validated so far
    rows_validated: usize,
}

/// Concurrency-safe map from upload identifier to lifecycle state and
/// validation progress.
///
/// One lock covers the whole map and is held only for a single lookup or
/// insert, never across I/O.
#[derive(Debug, Default)]
pub struct UploadStateStore {
    entries: Mutex<HashMap<String, UploadEntry>>,
}

impl UploadStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `state` for `upload_id`, overwriting any previous value.
    ///
    /// Callers keep transitions monotonic; an out-of-order write is logged
    /// but still applied.
    pub fn set_state(&self, upload_id: &str, state: UploadState) {
        let mut entries = self.lock();
        let Some(entry) = entries.get_mut(upload_id) else {
            entries.insert(
                upload_id.to_string(),
                UploadEntry {
                    state,
                    rows_validated: 0,
                },
            );
            return;
        };

        let previous = std::mem::replace(&mut entry.state, state);
        if !previous.can_advance_to(state) {
            warn!(
                upload_id,
                from = %previous,
                to = %state,
                "Upload state moved out of order"
            );
        }
    }

    /// Current state of `upload_id`, or [`UploadState::Unknown`] if it was never recorded
    pub fn get_state(&self, upload_id: &str) -> UploadState {
        self.lock()
            .get(upload_id)
            .map(|entry| entry.state)
            .unwrap_or(UploadState::Unknown)
    }

    /// Record that `rows` data rows of `upload_id` have been validated.
    /// Uploads without a state entry are ignored.
    pub fn set_progress(&self, upload_id: &str, rows: usize) {
        if let Some(entry) = self.lock().get_mut(upload_id) {
            entry.rows_validated = rows;
        }
    }

    /// Data rows validated so far, `None` if `upload_id` was never recorded
    pub fn get_progress(&self, upload_id: &str) -> Option<usize> {
        self.lock().get(upload_id).map(|entry| entry.rows_validated)
    }

    /// Copy of every recorded state
    pub fn snapshot(&self) -> HashMap<String, UploadState> {
        self.lock()
            .iter()
            .map(|(upload_id, entry)| (upload_id.clone(), entry.state))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // Entries are plain values, so a panic while holding the lock cannot
    // leave one half-written.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, UploadEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
