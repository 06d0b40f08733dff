//! The save session: one owner, one slot, one writer.
//!
//! `SaveSession` holds the state a game would otherwise keep in globals:
//! who owns the slot, which game mode it belongs to, whether this process
//! may write. It ties the core pieces together:
//!
//! ```text
//! producers ──upsert──▶ BatchHandle ─┐
//!                                    ▼
//! SlotKey ─▶ GenerationLocator ─▶ commit ─▶ SaveStore (generation N+1)
//!                                    │
//!                                    └─▶ SaveObservers / SaveCounters
//! ```
//!
//! Located generation indices are cached per base key. The session assumes
//! it is the only writer of its keys; another writer makes the cache stale.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use tracing::{debug, info, info_span, warn};

use keepsake_core::authority::Authority;
use keepsake_core::batch::{FlushOptions, PendingSaveBatch};
use keepsake_core::entity::{EntityRef, Scene};
use keepsake_core::error::{KeepsakeError, Result};
use keepsake_core::events::{SaveEvent, SaveObservers};
use keepsake_core::locator::{settle, GenerationLocator};
use keepsake_core::metrics::{spans, SaveCounters};
use keepsake_core::reconcile::{partition, Partition};
use keepsake_core::record::{SaveGeneration, SaveRecord};
use keepsake_core::registry::{SaveLogicRegistry, StrategyCatalog};
use keepsake_core::slot_key::{append_generation, SlotKey};
use keepsake_core::store::SaveStore;

use crate::config::SceneConfig;

/// Shared handle producers use to queue pending saves.
pub type BatchHandle = Arc<Mutex<PendingSaveBatch>>;

/// Explicit save state for one owner and slot.
pub struct SaveSession {
    slot: SlotKey,
    authority: Arc<dyn Authority>,
    store: Arc<dyn SaveStore>,
    locator: GenerationLocator,
    batch: BatchHandle,
    flush_options: FlushOptions,
    located: LruCache<String, u32>,
    current: Option<SaveGeneration>,
    registry: SaveLogicRegistry,
    observers: SaveObservers,
    counters: Arc<SaveCounters>,
    config: SceneConfig,
}

impl std::fmt::Debug for SaveSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SaveSession")
            .field("slot", &self.slot.base())
            .field("current", &self.current.as_ref().map(|g| g.generation_index))
            .field("pending", &self.batch.lock().len())
            .finish_non_exhaustive()
    }
}

impl SaveSession {
    /// Create a session for the slot named in `config`.
    ///
    /// # Errors
    ///
    /// [`KeepsakeError::InvalidKey`] if the configured owner id or mode name
    /// is empty.
    pub fn new(config: SceneConfig, store: Arc<dyn SaveStore>, authority: Arc<dyn Authority>) -> Result<Self> {
        let settings = &config.session;
        let slot = SlotKey::new(&settings.mode, &settings.owner_id, settings.slot)?;
        let capacity = NonZeroUsize::new(config.keepsake.persistence.generation_cache_size)
            .unwrap_or(NonZeroUsize::MIN);

        info!(slot = %slot, "Save session created");

        Ok(Self {
            slot,
            registry: SaveLogicRegistry::new(Arc::clone(&authority)),
            authority,
            store,
            locator: GenerationLocator::new(&config.keepsake.locator),
            batch: Arc::new(Mutex::new(PendingSaveBatch::new())),
            flush_options: FlushOptions {
                save_actor_data: config.keepsake.batch.save_actor_data,
            },
            located: LruCache::new(capacity),
            current: None,
            observers: SaveObservers::new(),
            counters: Arc::new(SaveCounters::new()),
            config,
        })
    }

    /// The slot's base key.
    #[must_use]
    pub fn base_key(&self) -> &str {
        self.slot.base()
    }

    /// The slot key builder.
    #[must_use]
    pub fn slot(&self) -> &SlotKey {
        &self.slot
    }

    /// Whether this session may write.
    #[must_use]
    pub fn has_write_authority(&self) -> bool {
        self.authority.has_write_authority()
    }

    /// Whether `[general] enabled` allows saving.
    #[must_use]
    pub fn saving_enabled(&self) -> bool {
        self.config.keepsake.general.enabled
    }

    /// Refuse `operation` unless saving is enabled and this session holds
    /// write authority.
    pub(crate) fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if !self.saving_enabled() {
            return Err(KeepsakeError::SavingDisabled { operation });
        }
        if !self.has_write_authority() {
            return Err(KeepsakeError::NoAuthority { operation });
        }
        Ok(())
    }

    /// Flush options applied to every commit.
    #[must_use]
    pub fn flush_options(&self) -> FlushOptions {
        self.flush_options
    }

    /// The backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn SaveStore> {
        &self.store
    }

    /// The configuration the session was built from.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// Newest generation index stored under `base_key`, cached.
    ///
    /// An estimate from an exhausted locator is settled before it is cached,
    /// so commits never land on an existing generation.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn latest_generation_of(&mut self, base_key: &str) -> Result<Option<u32>> {
        if let Some(&index) = self.located.get(base_key) {
            return Ok(Some(index));
        }

        let _span = info_span!(spans::LOCATE, base_key).entered();
        let store = Arc::clone(&self.store);
        let counters = Arc::clone(&self.counters);
        let exists = |key: &str| {
            SaveCounters::add(&counters.locator_probes, 1);
            store.exists(key)
        };
        let located = self.locator.locate(base_key, exists)?;
        SaveCounters::add(&self.counters.locates, 1);
        let Some(located) = located else {
            return Ok(None);
        };

        let index = settle(base_key, located, exists)?;
        self.located.put(base_key.to_string(), index);
        Ok(Some(index))
    }

    /// Index the next generation of `base_key` goes to.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn next_generation_of(&mut self, base_key: &str) -> Result<u32> {
        Ok(self
            .latest_generation_of(base_key)?
            .map_or(0, |index| index.saturating_add(1)))
    }

    /// Newest generation index of the slot.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn current_generation(&mut self) -> Result<Option<u32>> {
        let base = self.slot.base().to_string();
        self.latest_generation_of(&base)
    }

    /// Record that `index` was written under `base_key`.
    pub(crate) fn remember_generation(&mut self, base_key: &str, index: u32) {
        self.located.put(base_key.to_string(), index);
    }

    /// Load the slot's newest generation, or start an empty generation 0.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn open(&mut self) -> Result<&SaveGeneration> {
        let generation = match self.current_generation()? {
            Some(index) => match self.load_generation(index)? {
                Some(generation) => generation,
                None => {
                    warn!(slot = %self.slot, index, "Located generation vanished, starting empty");
                    SaveGeneration::new(self.slot.generation(index), index)
                }
            },
            None => {
                debug!(slot = %self.slot, "No saved generation, starting at 0");
                SaveGeneration::new(self.slot.generation(0), 0)
            }
        };
        Ok(self.current.insert(generation))
    }

    /// The generation the session currently builds on, if opened.
    #[must_use]
    pub fn current(&self) -> Option<&SaveGeneration> {
        self.current.as_ref()
    }

    /// Read generation `index` of the slot.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn load_generation(&self, index: u32) -> Result<Option<SaveGeneration>> {
        let key = self.slot.generation(index);
        let _span = info_span!(spans::LOAD, key = %key).entered();
        let loaded = self.store.read(&key)?;
        if let Some(generation) = &loaded {
            self.observers.notify(&SaveEvent::Loaded {
                key,
                generation: generation.generation_index,
                records: generation.len(),
            });
        }
        Ok(loaded)
    }

    /// Handle for producers that queue saves from elsewhere.
    #[must_use]
    pub fn batch(&self) -> BatchHandle {
        Arc::clone(&self.batch)
    }

    /// Queue a record for the next commit.
    pub fn request_save(&self, record: SaveRecord) -> bool {
        let accepted = self.batch.lock().upsert(record);
        let counter = if accepted {
            &self.counters.upserts_accepted
        } else {
            &self.counters.upserts_dropped
        };
        SaveCounters::add(counter, 1);
        accepted
    }

    /// Flush pending saves into a new generation `current + 1`.
    ///
    /// The new generation carries every record of the current one plus the
    /// pending records. On failure the pending batch and the current
    /// generation are kept for the next attempt. Returns the index written.
    ///
    /// # Errors
    ///
    /// [`KeepsakeError::SavingDisabled`] when saving is switched off,
    /// [`KeepsakeError::NoAuthority`] without write authority; otherwise the
    /// store's error.
    pub fn commit(&mut self) -> Result<u32> {
        self.ensure_writable("commit")?;
        if self.current.is_none() {
            self.open()?;
        }

        let index = match self.current_generation()? {
            Some(latest) => latest.saturating_add(1),
            None => 0,
        };
        let key = self.slot.generation(index);
        let _span = info_span!(spans::COMMIT, key = %key).entered();

        let mut target = self
            .current
            .clone()
            .unwrap_or_else(|| SaveGeneration::new(key.clone(), index));
        target.key.clone_from(&key);
        target.generation_index = index;

        self.observers.notify(&SaveEvent::Saving { key: key.clone() });

        let store = Arc::clone(&self.store);
        let batch = Arc::clone(&self.batch);
        let outcome = batch
            .lock()
            .flush(&mut target, self.flush_options, |generation| store.write(&key, generation));

        match outcome {
            Ok(flushed) => {
                SaveCounters::add(&self.counters.flushes_ok, 1);
                SaveCounters::add(
                    &self.counters.records_flushed,
                    u64::try_from(flushed).unwrap_or(u64::MAX),
                );
                self.current = Some(target);
                let base = self.slot.base().to_string();
                self.remember_generation(&base, index);
                info!(key = %key, flushed, "Committed generation");
                self.observers.notify(&SaveEvent::Saved {
                    key,
                    generation: index,
                    flushed,
                });
                Ok(index)
            }
            Err(e) => {
                SaveCounters::add(&self.counters.flushes_failed, 1);
                self.observers.notify(&SaveEvent::FlushFailed {
                    key,
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Rotate the store's backups. `false` when the backend keeps none.
    ///
    /// # Errors
    ///
    /// [`KeepsakeError::SavingDisabled`], [`KeepsakeError::NoAuthority`], or
    /// the store's error.
    pub fn backup(&self) -> Result<bool> {
        self.ensure_writable("backup")?;
        self.store.create_backup()
    }

    /// Partition the current generation's records against `scene`.
    ///
    /// An unopened session reconciles against an empty record set.
    pub fn reconcile(&self, scene: &dyn Scene) -> Partition {
        SaveCounters::add(&self.counters.reconciliations, 1);
        let entities = scene.list_entities();
        match &self.current {
            Some(generation) => partition(&entities, &generation.records),
            None => partition(&entities, &std::collections::BTreeMap::new()),
        }
    }

    /// Build the owner's save strategies from the configured categories.
    pub fn initialize_strategies(&mut self, owner: &EntityRef, catalog: &StrategyCatalog) -> bool {
        let configs = self.config.keepsake.category_map();
        self.registry.initialize(&configs, owner, catalog)
    }

    /// Per-category strategies.
    pub fn registry_mut(&mut self) -> &mut SaveLogicRegistry {
        &mut self.registry
    }

    /// Per-category strategies.
    #[must_use]
    pub fn registry(&self) -> &SaveLogicRegistry {
        &self.registry
    }

    /// Subscribe to save events.
    pub fn observers_mut(&mut self) -> &mut SaveObservers {
        &mut self.observers
    }

    /// Shared counters.
    #[must_use]
    pub fn counters(&self) -> Arc<SaveCounters> {
        Arc::clone(&self.counters)
    }

    /// Key of generation `index` under an arbitrary base key.
    #[must_use]
    pub fn key_for(base_key: &str, index: u32) -> String {
        append_generation(base_key, index)
    }
}

impl Drop for SaveSession {
    fn drop(&mut self) {
        if self.registry.is_initialized() {
            let torn_down = self.registry.teardown();
            debug!(torn_down, "Save strategies torn down with session");
        }
    }
}
