//! Per-category save strategies.
//!
//! A [`SaveLogicRegistry`] belongs to one owning entity. It turns the
//! owner's [`SaveCategoryConfig`]s into live [`SaveStrategy`] objects,
//! dispatches save/load by [`SaveCategory`], and tears them all down when
//! the owner goes away.
//!
//! ```text
//!             initialize            save / load              teardown
//! (none) ─────────────────▶ Initialized ◀──────▶ Saved|Loaded ─────────▶ TornDown
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::authority::Authority;
use crate::entity::EntityRef;
use crate::error::{KeepsakeError, Result};

// ---------------------------------------------------------------------------
// Categories and configs
// ---------------------------------------------------------------------------

/// The domains a save strategy can be responsible for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SaveCategory {
    /// Attribute values.
    Attributes,
    /// Inventory contents.
    Inventory,
    /// Combat state.
    Combat,
    /// Per-player camera preferences.
    CameraSettings,
    /// Game settings.
    Settings,
    /// World state.
    World,
}

impl SaveCategory {
    /// Order in which [`SaveLogicRegistry::load_all`] restores categories.
    pub const LOAD_ORDER: [Self; 4] = [
        Self::Attributes,
        Self::Inventory,
        Self::Combat,
        Self::CameraSettings,
    ];
}

impl fmt::Display for SaveCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Attributes => "Attributes",
            Self::Inventory => "Inventory",
            Self::Combat => "Combat",
            Self::CameraSettings => "CameraSettings",
            Self::Settings => "Settings",
            Self::World => "World",
        };
        f.write_str(name)
    }
}

/// Immutable description of one category's strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveCategoryConfig {
    /// Stable identifier.
    pub id: Uuid,
    /// Human-readable name, used in logs.
    pub display_name: String,
    /// The category this config serves.
    pub category: SaveCategory,
    /// Save once more when the owner is torn down.
    #[serde(default = "default_true")]
    pub save_on_teardown: bool,
    /// Include in periodic auto-saves.
    #[serde(default = "default_true")]
    pub auto_save_eligible: bool,
    /// Name of the [`StrategyCatalog`] entry that builds the strategy.
    #[serde(default)]
    pub strategy: Option<String>,
}

fn default_true() -> bool {
    true
}

impl SaveCategoryConfig {
    /// A config with a fresh id and both flags enabled.
    #[must_use]
    pub fn new(category: SaveCategory, display_name: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.into(),
            category,
            save_on_teardown: true,
            auto_save_eligible: true,
            strategy: Some(strategy.into()),
        }
    }

    /// A config needs a non-nil id and a display name.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.id.is_nil() && !self.display_name.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

/// Pluggable save/load logic for one category of one owner.
pub trait SaveStrategy: Send {
    /// Attach to the owning entity. Called once, right after construction.
    fn bind(&mut self, owner: &EntityRef) {
        let _ = owner;
    }

    /// Persist this category. Returns whether it succeeded.
    fn save(&mut self) -> bool;

    /// Restore this category. Returns whether it succeeded.
    fn load(&mut self) -> bool;

    /// Release resources. Called once; the strategy is dropped afterwards.
    fn teardown(&mut self) {}
}

type StrategyFactory = Box<dyn Fn(&SaveCategoryConfig) -> Box<dyn SaveStrategy> + Send + Sync>;

/// Named strategy constructors, referenced by [`SaveCategoryConfig::strategy`].
#[derive(Default)]
pub struct StrategyCatalog {
    factories: BTreeMap<String, StrategyFactory>,
}

impl fmt::Debug for StrategyCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StrategyCatalog")
            .field("names", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl StrategyCatalog {
    /// An empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `factory` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&SaveCategoryConfig) -> Box<dyn SaveStrategy> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Box::new(factory));
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    fn build(&self, config: &SaveCategoryConfig) -> Option<Box<dyn SaveStrategy>> {
        let name = config.strategy.as_deref()?;
        self.factories.get(name).map(|factory| factory(config))
    }
}

/// Where a strategy is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyState {
    /// Constructed and bound.
    Initialized,
    /// Last operation was a save.
    Saved,
    /// Last operation was a load.
    Loaded,
    /// Torn down; terminal.
    TornDown,
}

/// Categories [`SaveLogicRegistry::load_all`] must not restore.
#[derive(Debug, Clone, Default)]
pub struct LoadGuards {
    prevented: BTreeSet<SaveCategory>,
}

impl LoadGuards {
    /// No category prevented.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Prevent loading `category`.
    #[must_use]
    pub fn prevent(mut self, category: SaveCategory) -> Self {
        self.prevented.insert(category);
        self
    }

    /// Whether `category` is prevented.
    #[must_use]
    pub fn is_prevented(&self, category: SaveCategory) -> bool {
        self.prevented.contains(&category)
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct Registered {
    config: SaveCategoryConfig,
    strategy: Box<dyn SaveStrategy>,
    state: StrategyState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lifecycle {
    Empty,
    Initialized,
    TornDown,
}

/// One owner's strategies, keyed by category.
pub struct SaveLogicRegistry {
    authority: Arc<dyn Authority>,
    strategies: BTreeMap<SaveCategory, Registered>,
    retired: BTreeSet<SaveCategory>,
    lifecycle: Lifecycle,
}

impl fmt::Debug for SaveLogicRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SaveLogicRegistry")
            .field("categories", &self.categories())
            .field("lifecycle", &self.lifecycle)
            .finish_non_exhaustive()
    }
}

impl SaveLogicRegistry {
    /// An empty registry gated by `authority`.
    #[must_use]
    pub fn new(authority: Arc<dyn Authority>) -> Self {
        Self {
            authority,
            strategies: BTreeMap::new(),
            retired: BTreeSet::new(),
            lifecycle: Lifecycle::Empty,
        }
    }

    /// Construct and bind one strategy per usable config.
    ///
    /// Returns `false` without side effects when the caller lacks write
    /// authority or the registry was already torn down. Calling again after
    /// a successful initialization is a no-op returning `true`. Invalid
    /// configs, configs without a strategy, and unknown strategy names are
    /// skipped with a warning.
    pub fn initialize(
        &mut self,
        configs: &BTreeMap<SaveCategory, SaveCategoryConfig>,
        owner: &EntityRef,
        catalog: &StrategyCatalog,
    ) -> bool {
        match self.lifecycle {
            Lifecycle::Initialized => return true,
            Lifecycle::TornDown => {
                warn!("Save registry already torn down, refusing to re-initialize");
                return false;
            }
            Lifecycle::Empty => {}
        }
        if !self.authority.has_write_authority() {
            debug!("No write authority, save strategies not constructed");
            return false;
        }

        for (&category, config) in configs {
            if !config.is_valid() || config.category != category {
                warn!(%category, name = %config.display_name, "Invalid save category config, skipping");
                continue;
            }
            let Some(mut strategy) = catalog.build(config) else {
                warn!(
                    %category,
                    strategy = ?config.strategy,
                    "Save category has no usable strategy, skipping"
                );
                continue;
            };
            strategy.bind(owner);
            self.strategies.insert(
                category,
                Registered {
                    config: config.clone(),
                    strategy,
                    state: StrategyState::Initialized,
                },
            );
        }

        self.lifecycle = Lifecycle::Initialized;
        info!(strategies = self.strategies.len(), "Save registry initialized");
        true
    }

    /// Save one category.
    ///
    /// # Errors
    ///
    /// [`KeepsakeError::NoAuthority`] without write authority;
    /// [`KeepsakeError::CategoryNotRegistered`] if no strategy serves
    /// `category`.
    pub fn save(&mut self, category: SaveCategory) -> Result<bool> {
        if !self.authority.has_write_authority() {
            return Err(KeepsakeError::NoAuthority { operation: "save" });
        }
        let entry = self
            .strategies
            .get_mut(&category)
            .ok_or(KeepsakeError::CategoryNotRegistered(category))?;
        let saved = entry.strategy.save();
        if saved {
            entry.state = StrategyState::Saved;
        }
        debug!(%category, saved, "Saved category");
        Ok(saved)
    }

    /// Load one category.
    ///
    /// # Errors
    ///
    /// [`KeepsakeError::CategoryNotRegistered`] if no strategy serves
    /// `category`.
    pub fn load(&mut self, category: SaveCategory) -> Result<bool> {
        let entry = self
            .strategies
            .get_mut(&category)
            .ok_or(KeepsakeError::CategoryNotRegistered(category))?;
        let loaded = entry.strategy.load();
        if loaded {
            entry.state = StrategyState::Loaded;
        }
        Ok(loaded)
    }

    /// Load every registered category in [`SaveCategory::LOAD_ORDER`],
    /// skipping prevented ones.
    pub fn load_all(&mut self, guards: &LoadGuards) -> Vec<(SaveCategory, bool)> {
        let mut results = Vec::new();
        for category in SaveCategory::LOAD_ORDER {
            if guards.is_prevented(category) {
                debug!(%category, "Loading prevented");
                continue;
            }
            if let Ok(loaded) = self.load(category) {
                results.push((category, loaded));
            }
        }
        results
    }

    /// Save every auto-save-eligible category. Empty without authority.
    pub fn auto_save(&mut self) -> Vec<(SaveCategory, bool)> {
        if !self.authority.has_write_authority() {
            debug!("No write authority, auto-save skipped");
            return Vec::new();
        }
        let eligible: Vec<SaveCategory> = self
            .strategies
            .iter()
            .filter(|(_, entry)| entry.config.auto_save_eligible)
            .map(|(&category, _)| category)
            .collect();
        eligible
            .into_iter()
            .filter_map(|category| self.save(category).ok().map(|saved| (category, saved)))
            .collect()
    }

    /// Save (best effort, with authority and unless the config opts out),
    /// then tear down and drop every strategy. Returns how many were torn
    /// down. The registry cannot be initialized again afterwards.
    pub fn teardown(&mut self) -> usize {
        let authoritative = self.authority.has_write_authority();
        let strategies = std::mem::take(&mut self.strategies);
        let count = strategies.len();

        for (category, mut entry) in strategies {
            if authoritative && entry.config.save_on_teardown && !entry.strategy.save() {
                warn!(%category, "Final save before teardown failed");
            }
            entry.strategy.teardown();
            self.retired.insert(category);
            debug!(%category, "Save strategy torn down");
        }

        self.lifecycle = Lifecycle::TornDown;
        count
    }

    /// Lifecycle state of a category's strategy. Categories torn down stay
    /// visible as [`StrategyState::TornDown`].
    #[must_use]
    pub fn state(&self, category: SaveCategory) -> Option<StrategyState> {
        match self.strategies.get(&category) {
            Some(entry) => Some(entry.state),
            None if self.retired.contains(&category) => Some(StrategyState::TornDown),
            None => None,
        }
    }

    /// Live categories in ascending order.
    #[must_use]
    pub fn categories(&self) -> Vec<SaveCategory> {
        self.strategies.keys().copied().collect()
    }

    /// Whether [`Self::initialize`] has succeeded and teardown has not run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.lifecycle == Lifecycle::Initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authority::AuthorityFlag;
    use crate::entity::SceneEntity;
    use parking_lot::Mutex;

    struct Owner;
    impl SceneEntity for Owner {}

    /// Records every call into a shared log.
    struct Probe {
        category: SaveCategory,
        log: Arc<Mutex<Vec<String>>>,
        succeed: bool,
    }

    impl SaveStrategy for Probe {
        fn bind(&mut self, _owner: &EntityRef) {
            self.log.lock().push(format!("bind {}", self.category));
        }
        fn save(&mut self) -> bool {
            self.log.lock().push(format!("save {}", self.category));
            self.succeed
        }
        fn load(&mut self) -> bool {
            self.log.lock().push(format!("load {}", self.category));
            self.succeed
        }
        fn teardown(&mut self) {
            self.log.lock().push(format!("teardown {}", self.category));
        }
    }

    fn catalog(log: &Arc<Mutex<Vec<String>>>) -> StrategyCatalog {
        let mut catalog = StrategyCatalog::new();
        let ok_log = Arc::clone(log);
        catalog.register("probe", move |config| {
            Box::new(Probe {
                category: config.category,
                log: Arc::clone(&ok_log),
                succeed: true,
            })
        });
        let failing_log = Arc::clone(log);
        catalog.register("failing", move |config| {
            Box::new(Probe {
                category: config.category,
                log: Arc::clone(&failing_log),
                succeed: false,
            })
        });
        catalog
    }

    fn configs(entries: &[(SaveCategory, &str)]) -> BTreeMap<SaveCategory, SaveCategoryConfig> {
        entries
            .iter()
            .map(|&(category, strategy)| (category, SaveCategoryConfig::new(category, category.to_string(), strategy)))
            .collect()
    }

    fn owner() -> EntityRef {
        Arc::new(Owner)
    }

    #[test]
    fn initialize_requires_authority() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let authority = Arc::new(AuthorityFlag::new(false));
        let mut registry = SaveLogicRegistry::new(authority.clone());

        let configs = configs(&[(SaveCategory::Attributes, "probe")]);
        assert!(!registry.initialize(&configs, &owner(), &catalog(&log)));
        assert!(registry.categories().is_empty());
        assert!(log.lock().is_empty());

        authority.set(true);
        assert!(registry.initialize(&configs, &owner(), &catalog(&log)));
        assert_eq!(registry.categories(), vec![SaveCategory::Attributes]);
        assert_eq!(registry.state(SaveCategory::Attributes), Some(StrategyState::Initialized));
    }

    #[test]
    fn initialize_skips_bad_configs_and_is_idempotent() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SaveLogicRegistry::new(Arc::new(AuthorityFlag::new(true)));

        let mut configs = configs(&[
            (SaveCategory::Attributes, "probe"),
            (SaveCategory::Inventory, "unknown"),
            (SaveCategory::Combat, "probe"),
        ]);
        configs.get_mut(&SaveCategory::Combat).expect("combat").display_name.clear();
        configs.insert(
            SaveCategory::World,
            SaveCategoryConfig {
                strategy: None,
                ..SaveCategoryConfig::new(SaveCategory::World, "World", "probe")
            },
        );

        assert!(registry.initialize(&configs, &owner(), &catalog(&log)));
        assert_eq!(registry.categories(), vec![SaveCategory::Attributes]);

        let calls_before = log.lock().len();
        assert!(registry.initialize(&configs, &owner(), &catalog(&log)));
        assert_eq!(log.lock().len(), calls_before, "second initialize constructs nothing");
    }

    #[test]
    fn save_unregistered_category_fails() {
        let mut registry = SaveLogicRegistry::new(Arc::new(AuthorityFlag::new(true)));
        assert!(matches!(
            registry.save(SaveCategory::Inventory),
            Err(KeepsakeError::CategoryNotRegistered(SaveCategory::Inventory))
        ));
    }

    #[test]
    fn save_delegates_and_tracks_state() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let authority = Arc::new(AuthorityFlag::new(true));
        let mut registry = SaveLogicRegistry::new(authority.clone());
        registry.initialize(
            &configs(&[(SaveCategory::Inventory, "probe"), (SaveCategory::Combat, "failing")]),
            &owner(),
            &catalog(&log),
        );

        assert!(registry.save(SaveCategory::Inventory).expect("save"));
        assert_eq!(registry.state(SaveCategory::Inventory), Some(StrategyState::Saved));
        assert!(!registry.save(SaveCategory::Combat).expect("save"));
        assert_eq!(registry.state(SaveCategory::Combat), Some(StrategyState::Initialized));

        authority.set(false);
        assert!(matches!(
            registry.save(SaveCategory::Inventory),
            Err(KeepsakeError::NoAuthority { .. })
        ));
    }

    #[test]
    fn load_all_follows_fixed_order_and_guards() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SaveLogicRegistry::new(Arc::new(AuthorityFlag::new(true)));
        registry.initialize(
            &configs(&[
                (SaveCategory::CameraSettings, "probe"),
                (SaveCategory::Combat, "probe"),
                (SaveCategory::Attributes, "probe"),
                (SaveCategory::World, "probe"),
            ]),
            &owner(),
            &catalog(&log),
        );
        log.lock().clear();

        let results = registry.load_all(&LoadGuards::none().prevent(SaveCategory::Combat));
        assert_eq!(
            results,
            vec![(SaveCategory::Attributes, true), (SaveCategory::CameraSettings, true)]
        );
        assert_eq!(*log.lock(), vec!["load Attributes", "load CameraSettings"]);
        assert_eq!(registry.state(SaveCategory::Attributes), Some(StrategyState::Loaded));
    }

    #[test]
    fn auto_save_only_touches_eligible() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SaveLogicRegistry::new(Arc::new(AuthorityFlag::new(true)));
        let mut configs = configs(&[(SaveCategory::Attributes, "probe"), (SaveCategory::Settings, "probe")]);
        configs
            .get_mut(&SaveCategory::Settings)
            .expect("settings")
            .auto_save_eligible = false;
        registry.initialize(&configs, &owner(), &catalog(&log));

        assert_eq!(registry.auto_save(), vec![(SaveCategory::Attributes, true)]);
    }

    #[test]
    fn teardown_saves_then_destroys() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = SaveLogicRegistry::new(Arc::new(AuthorityFlag::new(true)));
        let mut configs = configs(&[
            (SaveCategory::Attributes, "failing"),
            (SaveCategory::Inventory, "probe"),
            (SaveCategory::World, "probe"),
        ]);
        configs.get_mut(&SaveCategory::World).expect("world").save_on_teardown = false;
        registry.initialize(&configs, &owner(), &catalog(&log));
        log.lock().clear();

        assert_eq!(registry.teardown(), 3);
        assert_eq!(
            *log.lock(),
            vec![
                "save Attributes",
                "teardown Attributes",
                "save Inventory",
                "teardown Inventory",
                "teardown World",
            ]
        );
        assert!(registry.categories().is_empty());
        assert_eq!(registry.state(SaveCategory::World), Some(StrategyState::TornDown));
        assert_eq!(registry.state(SaveCategory::Combat), None);
        assert!(!registry.is_initialized());
        assert!(!registry.initialize(&configs, &owner(), &catalog(&log)));
    }

    #[test]
    fn teardown_without_authority_skips_saves() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let authority = Arc::new(AuthorityFlag::new(true));
        let mut registry = SaveLogicRegistry::new(authority.clone());
        registry.initialize(&configs(&[(SaveCategory::Inventory, "probe")]), &owner(), &catalog(&log));
        log.lock().clear();

        authority.set(false);
        assert_eq!(registry.teardown(), 1);
        assert_eq!(*log.lock(), vec!["teardown Inventory"]);
    }
}
