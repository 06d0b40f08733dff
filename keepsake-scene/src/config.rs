//! Session-level configuration on top of `keepsake_core::config`.
//!
//! The same TOML file carries both: a `[session]` table naming the slot,
//! and the core tables (`[locator]`, `[persistence]`, `[[categories]]`, ...).
//!
//! ```toml
//! [session]
//! mode = "Survival"
//! owner_id = "steam-76561198000000000"
//! slot = 2
//!
//! [persistence]
//! backend = "memory"
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use keepsake_core::config::{KeepsakeConfig, PersistenceConfig};
use keepsake_core::error::{KeepsakeError, Result};
use keepsake_core::slot_key::GameModeKind;
use keepsake_core::store::{MemoryStore, SaveStore, SqliteStore};

/// Which slot a session reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Game mode, the first key component.
    #[serde(default = "default_mode")]
    pub mode: GameModeKind,
    /// Platform or player id owning the slot.
    #[serde(default = "default_owner")]
    pub owner_id: String,
    /// Slot number.
    #[serde(default)]
    pub slot: u32,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            owner_id: default_owner(),
            slot: 0,
        }
    }
}

fn default_mode() -> GameModeKind {
    GameModeKind::Adventure
}

fn default_owner() -> String {
    "LocalPlayer".to_string()
}

#[derive(Deserialize)]
struct SessionTable {
    #[serde(default)]
    session: SessionSettings,
}

/// Everything a [`crate::session::SaveSession`] needs.
#[derive(Debug, Clone, Default)]
pub struct SceneConfig {
    /// Slot selection.
    pub session: SessionSettings,
    /// Core settings.
    pub keepsake: KeepsakeConfig,
}

impl SceneConfig {
    /// Parse both the `[session]` table and the core tables.
    ///
    /// # Errors
    /// Returns `KeepsakeError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let table: SessionTable =
            toml::from_str(toml_str).map_err(|e| KeepsakeError::Config(e.to_string()))?;
        Ok(Self {
            session: table.session,
            keepsake: KeepsakeConfig::from_toml(toml_str)?,
        })
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Open the backend named by `config.backend`.
///
/// # Errors
/// `KeepsakeError::Config` for an unknown backend; storage errors otherwise.
pub fn open_store(config: &PersistenceConfig) -> Result<Arc<dyn SaveStore>> {
    match config.backend.as_str() {
        "sqlite" => Ok(Arc::new(SqliteStore::open(&config.path, config)?)),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        other => Err(KeepsakeError::Config(format!("unknown save backend `{other}`"))),
    }
}
