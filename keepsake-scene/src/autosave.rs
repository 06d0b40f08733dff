//! Periodic background saving.
//!
//! [`AutoSaver::spawn`] runs a `tokio` interval that commits pending saves,
//! rotates the store's backups after each commit, and runs the registry's
//! auto-save pass. Stopping it is the caller's job:
//! abort the returned handle. A tick that is already running completes; the
//! session lock is never held across an await point.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use keepsake_core::registry::SaveCategory;

use crate::session::SaveSession;

/// What one auto-save tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoSaveReport {
    /// Generation written, if pending saves were committed.
    pub generation: Option<u32>,
    /// Whether a backup was rotated after the commit.
    pub backed_up: bool,
    /// Per-category auto-save results.
    pub categories: Vec<(SaveCategory, bool)>,
}

/// Drives a shared session on a fixed period.
#[derive(Debug, Clone)]
pub struct AutoSaver {
    session: Arc<Mutex<SaveSession>>,
    period: Duration,
}

impl AutoSaver {
    /// Use the session's configured `auto_save_interval_seconds`.
    #[must_use]
    pub fn new(session: Arc<Mutex<SaveSession>>) -> Self {
        let seconds = session.lock().config().keepsake.persistence.auto_save_interval_seconds;
        Self {
            session,
            period: Duration::from_secs(u64::from(seconds.max(1))),
        }
    }

    /// Override the period.
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period.max(Duration::from_millis(1));
        self
    }

    /// The tick period.
    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Run one auto-save pass now.
    ///
    /// Commits only when something is pending, so idle sessions do not pile
    /// up identical generations. Commit failures are logged and leave the
    /// pending saves for the next tick. A failed backup is logged and does
    /// not undo the commit.
    pub fn tick(&self) -> AutoSaveReport {
        let mut session = self.session.lock();
        if !session.saving_enabled() || !session.has_write_authority() {
            debug!("Auto-save skipped");
            return AutoSaveReport::default();
        }

        let pending = session.batch().lock().len();
        let generation = if pending == 0 {
            None
        } else {
            match session.commit() {
                Ok(index) => Some(index),
                Err(e) => {
                    warn!(error = %e, pending, "Auto-save commit failed");
                    None
                }
            }
        };

        let backed_up = generation.is_some()
            && session.backup().unwrap_or_else(|e| {
                warn!(error = %e, "Backup after auto-save failed");
                false
            });

        AutoSaveReport {
            generation,
            backed_up,
            categories: session.registry_mut().auto_save(),
        }
    }

    /// Tick every period on the current `tokio` runtime.
    ///
    /// The first tick fires one period after spawning.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await;
            loop {
                interval.tick().await;
                let report = self.tick();
                debug!(generation = ?report.generation, categories = report.categories.len(), "Auto-save tick");
            }
        })
    }
}
