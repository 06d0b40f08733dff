//! Configuration for the Keepsake save core.
//!
//! Maps directly to `keepsake.toml`:
//!
//! ```toml
//! [general]
//! log_level = "debug"
//!
//! [locator]
//! initial_step = 100
//!
//! [persistence]
//! backend = "sqlite"
//! auto_save_interval_seconds = 120
//!
//! [[categories]]
//! id = "6a2f0a7c-3c55-4d5e-9a39-0f3cf7c1a001"
//! display_name = "Player attributes"
//! category = "Attributes"
//! strategy = "attributes"
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::registry::{SaveCategory, SaveCategoryConfig};

/// Top-level configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeepsakeConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Generation search tuning.
    #[serde(default)]
    pub locator: LocatorConfig,
    /// Pending-save batching.
    #[serde(default)]
    pub batch: BatchConfig,
    /// Storage backend settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Per-category save strategies.
    #[serde(default)]
    pub categories: Vec<SaveCategoryConfig>,
}

impl KeepsakeConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `KeepsakeError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::KeepsakeError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Category configs keyed by category. A later entry for the same
    /// category replaces an earlier one.
    #[must_use]
    pub fn category_map(&self) -> BTreeMap<SaveCategory, SaveCategoryConfig> {
        self.categories
            .iter()
            .map(|config| (config.category, config.clone()))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Whether saving is enabled at all. When off, sessions refuse every
    /// write and auto-save ticks do nothing; loading still works.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Generation search tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocatorConfig {
    /// First stride of the forward search.
    #[serde(default = "default_100")]
    pub initial_step: u32,
    /// Probe budget before returning a best estimate.
    #[serde(default = "default_64")]
    pub max_probes: u32,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            initial_step: 100,
            max_probes: 64,
        }
    }
}

/// Pending-save batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Ask live entities to refresh their records right before a flush.
    #[serde(default = "default_true")]
    pub save_actor_data: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            save_actor_data: true,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "sqlite" or "memory".
    #[serde(default = "default_sqlite")]
    pub backend: String,
    /// Database path for the sqlite backend.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Auto-save interval in seconds.
    #[serde(default = "default_300")]
    pub auto_save_interval_seconds: u32,
    /// Number of save backups to keep.
    #[serde(default = "default_3")]
    pub backup_count: u32,
    /// Detect save corruption via checksums.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// How many located generations a session remembers.
    #[serde(default = "default_32")]
    pub generation_cache_size: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            path: "saves.db".to_string(),
            wal_mode: true,
            auto_save_interval_seconds: 300,
            backup_count: 3,
            checksum_enabled: true,
            generation_cache_size: 32,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_sqlite() -> String { "sqlite".to_string() }
fn default_db_path() -> String { "saves.db".to_string() }
fn default_3() -> u32 { 3 }
fn default_32() -> usize { 32 }
fn default_64() -> u32 { 64 }
fn default_100() -> u32 { 100 }
fn default_300() -> u32 { 300 }
