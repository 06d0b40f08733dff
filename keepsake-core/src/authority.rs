//! Write-authority checks.
//!
//! Only the authoritative side of a session (the server, or the single
//! local process) may construct save strategies or write generations.

use std::sync::atomic::{AtomicBool, Ordering};

/// Answers whether the caller may mutate saved state.
pub trait Authority: Send + Sync {
    /// `true` when writes are allowed.
    fn has_write_authority(&self) -> bool;
}

/// A switchable authority flag.
#[derive(Debug, Default)]
pub struct AuthorityFlag(AtomicBool);

impl AuthorityFlag {
    /// A flag starting in the given state.
    #[must_use]
    pub const fn new(granted: bool) -> Self {
        Self(AtomicBool::new(granted))
    }

    /// Grant or revoke authority.
    pub fn set(&self, granted: bool) {
        self.0.store(granted, Ordering::SeqCst);
    }
}

impl Authority for AuthorityFlag {
    fn has_write_authority(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
