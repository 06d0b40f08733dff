//! Storage backends for save generations.
//!
//! The core only needs three things from storage: an existence check that
//! matches the key format of [`crate::slot_key`], a whole-generation write,
//! and a read. [`SaveStore`] captures that contract; [`MemoryStore`] and
//! [`SqliteStore`] implement it.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::record::SaveGeneration;

/// A backing store keyed by full generation keys.
///
/// Implementations use interior mutability; callers still serialize writes
/// to a given key (single-writer model).
pub trait SaveStore: Send + Sync {
    /// Whether a generation is stored under `key`.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn exists(&self, key: &str) -> Result<bool>;

    /// Store `generation` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Backend-specific failures. A failed write leaves the previous value
    /// in place.
    fn write(&self, key: &str, generation: &SaveGeneration) -> Result<()>;

    /// Load the generation stored under `key`.
    ///
    /// # Errors
    ///
    /// Backend-specific failures, or a payload that does not decode.
    fn read(&self, key: &str) -> Result<Option<SaveGeneration>>;

    /// Remove `key`. Returns `true` if something was deleted.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn delete(&self, key: &str) -> Result<bool>;

    /// All stored keys starting with `prefix`, in ascending order.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn list_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Snapshot the whole store into its backup rotation. Returns `false`
    /// when the backend keeps no backups.
    ///
    /// # Errors
    ///
    /// Backend-specific failures.
    fn create_backup(&self) -> Result<bool> {
        Ok(false)
    }
}
