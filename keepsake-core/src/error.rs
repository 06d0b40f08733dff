//! Error types for the Keepsake core library.

use thiserror::Error;

use crate::registry::SaveCategory;

/// Top-level error type for all Keepsake operations.
#[derive(Error, Debug)]
pub enum KeepsakeError {
    /// A key component was empty or otherwise unusable.
    #[error("Invalid key component `{component}`: {reason}")]
    InvalidKey {
        /// Which component of the key was rejected.
        component: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A save-category configuration could not be used.
    #[error("Invalid save category config: {0}")]
    InvalidConfig(String),

    /// No strategy is registered for the requested category.
    #[error("No save strategy registered for category {0}")]
    CategoryNotRegistered(SaveCategory),

    /// The caller does not hold write authority for this session.
    #[error("Write authority required for {operation}")]
    NoAuthority {
        /// The operation that was refused.
        operation: &'static str,
    },

    /// Saving is switched off in `[general]`.
    #[error("Saving is disabled, refusing {operation}")]
    SavingDisabled {
        /// The operation that was refused.
        operation: &'static str,
    },

    /// The storage backend refused a write without a lower-level error.
    #[error("Store rejected write for key {key}")]
    StoreWriteRejected {
        /// Key that was being written.
        key: String,
    },

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// SQLite persistence error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl KeepsakeError {
    /// Shorthand for an [`KeepsakeError::InvalidKey`] on an empty component.
    pub(crate) fn empty_key(component: &'static str) -> Self {
        Self::InvalidKey {
            component,
            reason: "must not be empty".to_string(),
        }
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, KeepsakeError>;
