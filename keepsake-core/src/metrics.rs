//! Runtime counters for the save path.
//!
//! Lock-free `AtomicU64` counters incremented in the hot path and read on
//! export. [`CounterSnapshot::to_prometheus`] renders the Prometheus text
//! format for server dashboards.

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters for save activity since startup.
#[derive(Debug)]
pub struct SaveCounters {
    /// Existence probes issued by the generation locator.
    pub locator_probes: AtomicU64,
    /// Completed generation searches.
    pub locates: AtomicU64,
    /// Successful flushes.
    pub flushes_ok: AtomicU64,
    /// Failed flushes.
    pub flushes_failed: AtomicU64,
    /// Records written by successful flushes.
    pub records_flushed: AtomicU64,
    /// Pending saves accepted.
    pub upserts_accepted: AtomicU64,
    /// Pending saves dropped for an empty id.
    pub upserts_dropped: AtomicU64,
    /// Scene reconciliations run.
    pub reconciliations: AtomicU64,
}

impl SaveCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            locator_probes: AtomicU64::new(0),
            locates: AtomicU64::new(0),
            flushes_ok: AtomicU64::new(0),
            flushes_failed: AtomicU64::new(0),
            records_flushed: AtomicU64::new(0),
            upserts_accepted: AtomicU64::new(0),
            upserts_dropped: AtomicU64::new(0),
            reconciliations: AtomicU64::new(0),
        }
    }

    /// Add `n` to a counter.
    pub fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Snapshot all counters for export.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            locator_probes: self.locator_probes.load(Ordering::Relaxed),
            locates: self.locates.load(Ordering::Relaxed),
            flushes: [
                self.flushes_ok.load(Ordering::Relaxed),
                self.flushes_failed.load(Ordering::Relaxed),
            ],
            records_flushed: self.records_flushed.load(Ordering::Relaxed),
            upserts: [
                self.upserts_accepted.load(Ordering::Relaxed),
                self.upserts_dropped.load(Ordering::Relaxed),
            ],
            reconciliations: self.reconciliations.load(Ordering::Relaxed),
        }
    }
}

impl Default for SaveCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Locator probes.
    pub locator_probes: u64,
    /// Completed searches.
    pub locates: u64,
    /// Flushes by outcome [ok, failed].
    pub flushes: [u64; 2],
    /// Records flushed.
    pub records_flushed: u64,
    /// Upserts by outcome [accepted, dropped].
    pub upserts: [u64; 2],
    /// Reconciliations.
    pub reconciliations: u64,
}

impl CounterSnapshot {
    /// Format as Prometheus-compatible text.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        format!(
            "# HELP keepsake_locator_probes_total Generation existence probes\n\
             # TYPE keepsake_locator_probes_total counter\n\
             keepsake_locator_probes_total {}\n\
             # HELP keepsake_locates_total Generation searches completed\n\
             # TYPE keepsake_locates_total counter\n\
             keepsake_locates_total {}\n\
             # HELP keepsake_flushes_total Pending-save flushes by outcome\n\
             # TYPE keepsake_flushes_total counter\n\
             keepsake_flushes_total{{outcome=\"ok\"}} {}\n\
             keepsake_flushes_total{{outcome=\"failed\"}} {}\n\
             # HELP keepsake_records_flushed_total Records written by flushes\n\
             # TYPE keepsake_records_flushed_total counter\n\
             keepsake_records_flushed_total {}\n\
             # HELP keepsake_upserts_total Pending-save upserts by outcome\n\
             # TYPE keepsake_upserts_total counter\n\
             keepsake_upserts_total{{outcome=\"accepted\"}} {}\n\
             keepsake_upserts_total{{outcome=\"dropped\"}} {}\n\
             # HELP keepsake_reconciliations_total Scene reconciliations run\n\
             # TYPE keepsake_reconciliations_total counter\n\
             keepsake_reconciliations_total {}\n",
            self.locator_probes,
            self.locates,
            self.flushes[0],
            self.flushes[1],
            self.records_flushed,
            self.upserts[0],
            self.upserts[1],
            self.reconciliations,
        )
    }
}

/// Span names used with `tracing::span!`.
pub mod spans {
    /// Generation search.
    pub const LOCATE: &str = "keepsake::locate";
    /// Commit of pending saves.
    pub const COMMIT: &str = "keepsake::commit";
    /// Generation load.
    pub const LOAD: &str = "keepsake::load";
    /// Level snapshot.
    pub const LEVEL_SAVE: &str = "keepsake::level::save";
}
