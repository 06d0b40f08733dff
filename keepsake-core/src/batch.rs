//! Pending-save accumulation and commit.
//!
//! Producers [`PendingSaveBatch::upsert`] records as entities change; the
//! single flusher merges them into a generation and hands the result to a
//! storage sink. Nothing is cleared until the sink confirms the write, so a
//! failed flush can simply be retried.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::record::{SaveGeneration, SaveRecord};

/// Per-flush switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushOptions {
    /// Refresh each pending record from its live entity before merging.
    pub save_actor_data: bool,
}

impl Default for FlushOptions {
    fn default() -> Self {
        Self {
            save_actor_data: true,
        }
    }
}

/// Records waiting for the next commit, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PendingSaveBatch {
    pending: HashMap<String, SaveRecord>,
}

impl PendingSaveBatch {
    /// An empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the pending record for `record.id`.
    ///
    /// Records with an empty id are dropped and `false` is returned.
    pub fn upsert(&mut self, record: SaveRecord) -> bool {
        if !record.has_id() {
            debug!("Dropping pending save with empty id");
            return false;
        }
        debug!(id = %record.id, "Queued pending save");
        self.pending.insert(record.id.clone(), record);
        true
    }

    /// Withdraw a pending record.
    pub fn remove(&mut self, id: &str) -> Option<SaveRecord> {
        self.pending.remove(id)
    }

    /// The pending record for `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SaveRecord> {
        self.pending.get(id)
    }

    /// Number of pending records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pending ids, ascending.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.pending.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Merge the batch into a copy of `target` and pass it to `sink`.
    ///
    /// On success the merged copy replaces `target`, the batch is cleared and
    /// the number of flushed records is returned. On failure neither `target`
    /// nor the batch changes and the sink's error is returned.
    ///
    /// An empty batch still reaches the sink.
    ///
    /// # Errors
    ///
    /// Whatever `sink` returns.
    pub fn flush<F>(&mut self, target: &mut SaveGeneration, options: FlushOptions, sink: F) -> Result<usize>
    where
        F: FnOnce(&SaveGeneration) -> Result<()>,
    {
        let mut merged = target.clone();
        for record in self.pending.values() {
            let record = if options.save_actor_data {
                refresh_from_live(record.clone())
            } else {
                record.clone()
            };
            merged.upsert(record);
        }
        merged.saved_at = Utc::now();

        match sink(&merged) {
            Ok(()) => {
                let flushed = self.pending.len();
                *target = merged;
                self.pending.clear();
                info!(
                    key = %target.key,
                    generation = target.generation_index,
                    flushed,
                    "Flushed pending saves"
                );
                Ok(flushed)
            }
            Err(e) => {
                warn!(
                    key = %target.key,
                    pending = self.pending.len(),
                    error = %e,
                    "Flush failed, pending saves kept"
                );
                Err(e)
            }
        }
    }
}

/// Let a still-alive entity rewrite its own record. The id is preserved.
fn refresh_from_live(record: SaveRecord) -> SaveRecord {
    let Some(entity) = record.live_ref.upgrade() else {
        return record;
    };
    let Some(actor) = entity.as_save_actor_data() else {
        return record;
    };
    let id = record.id.clone();
    let mut refreshed = actor.save_actor_data(record);
    if refreshed.id != id {
        debug!(id = %id, returned = %refreshed.id, "Entity changed its save id, keeping original");
        refreshed.id = id;
    }
    refreshed
}
