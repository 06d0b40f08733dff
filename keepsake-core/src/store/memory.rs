//! In-process store, used by tests and by games that persist elsewhere.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use crate::error::{KeepsakeError, Result};
use crate::record::SaveGeneration;

use super::SaveStore;

/// A [`SaveStore`] backed by an ordered map.
#[derive(Debug, Default)]
pub struct MemoryStore {
    generations: RwLock<BTreeMap<String, SaveGeneration>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent writes fail with [`KeepsakeError::StoreWriteRejected`]
    /// until switched back off.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of stored generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.generations.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.generations.read().is_empty()
    }
}

impl SaveStore for MemoryStore {
    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.generations.read().contains_key(key))
    }

    fn write(&self, key: &str, generation: &SaveGeneration) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KeepsakeError::StoreWriteRejected {
                key: key.to_string(),
            });
        }
        self.generations
            .write()
            .insert(key.to_string(), generation.clone());
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Option<SaveGeneration>> {
        Ok(self.generations.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.generations.write().remove(key).is_some())
    }

    fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        Ok(self
            .generations
            .read()
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
