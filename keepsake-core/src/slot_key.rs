//! Hierarchical save-key construction.
//!
//! Keys are built from left to right and joined with [`SEPARATOR`]:
//!
//! ```text
//! Adventure_Player1_S1            base key
//! Adventure_Player1_S1_45         generation 45
//! Adventure_Player1_S1_Keep_45    level "Keep", generation 45
//! ```
//!
//! All functions are pure. Empty components are rejected with
//! [`KeepsakeError::InvalidKey`] instead of producing a key that could
//! collide with another owner's.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{KeepsakeError, Result};

/// Separator between key components.
pub const SEPARATOR: char = '_';

/// Game-mode classification that leads every key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameModeKind {
    /// Story campaign.
    Adventure,
    /// Open-ended survival.
    Survival,
    /// Match-based arena play.
    Arena,
    /// Creative sandbox.
    Sandbox,
    /// Project-defined mode name.
    Custom(String),
}

impl GameModeKind {
    /// The classification string used as the first key component.
    #[must_use]
    pub fn classification(&self) -> &str {
        match self {
            Self::Adventure => "Adventure",
            Self::Survival => "Survival",
            Self::Arena => "Arena",
            Self::Sandbox => "Sandbox",
            Self::Custom(name) => name,
        }
    }
}

impl fmt::Display for GameModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.classification())
    }
}

fn require(component: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(KeepsakeError::empty_key(component));
    }
    Ok(())
}

/// `"{classification}_{owner_id}_S{slot}"`.
///
/// # Errors
///
/// Returns [`KeepsakeError::InvalidKey`] if `classification` or `owner_id`
/// is empty.
pub fn build_base_key(classification: &str, owner_id: &str, slot: u32) -> Result<String> {
    require("classification", classification)?;
    require("owner_id", owner_id)?;
    Ok(format!("{classification}{SEPARATOR}{owner_id}{SEPARATOR}S{slot}"))
}

/// Append a generation suffix to any key.
#[must_use]
pub fn append_generation(base_key: &str, generation_index: u32) -> String {
    format!("{base_key}{SEPARATOR}{generation_index}")
}

/// Key of one level's snapshot within a generation.
///
/// # Errors
///
/// Returns [`KeepsakeError::InvalidKey`] if `base_key` or `level_name` is
/// empty.
pub fn build_level_key(base_key: &str, level_name: &str, generation_index: u32) -> Result<String> {
    require("base_key", base_key)?;
    require("level_name", level_name)?;
    Ok(append_generation(
        &format!("{base_key}{SEPARATOR}{level_name}"),
        generation_index,
    ))
}

/// Key of one entity's record within a generation.
///
/// # Errors
///
/// Returns [`KeepsakeError::InvalidKey`] if `base_key` or `entity_id` is
/// empty.
pub fn build_entity_key(base_key: &str, entity_id: &str, generation_index: u32) -> Result<String> {
    require("base_key", base_key)?;
    require("entity_id", entity_id)?;
    Ok(append_generation(
        &format!("{base_key}{SEPARATOR}{entity_id}"),
        generation_index,
    ))
}

/// A validated base key, with helpers for the keys layered on top of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SlotKey {
    base: String,
}

impl SlotKey {
    /// Build and validate the base key for `mode`, `owner_id` and `slot`.
    ///
    /// # Errors
    ///
    /// See [`build_base_key`].
    pub fn new(mode: &GameModeKind, owner_id: &str, slot: u32) -> Result<Self> {
        Ok(Self {
            base: build_base_key(mode.classification(), owner_id, slot)?,
        })
    }

    /// The base key.
    #[must_use]
    pub fn base(&self) -> &str {
        &self.base
    }

    /// The base key with a generation suffix.
    #[must_use]
    pub fn generation(&self, generation_index: u32) -> String {
        append_generation(&self.base, generation_index)
    }

    /// Key of a level snapshot.
    ///
    /// # Errors
    ///
    /// See [`build_level_key`].
    pub fn level(&self, level_name: &str, generation_index: u32) -> Result<String> {
        build_level_key(&self.base, level_name, generation_index)
    }

    /// Key prefix shared by every generation of a level.
    ///
    /// # Errors
    ///
    /// Returns [`KeepsakeError::InvalidKey`] if `level_name` is empty.
    pub fn level_base(&self, level_name: &str) -> Result<String> {
        require("level_name", level_name)?;
        Ok(format!("{}{SEPARATOR}{level_name}", self.base))
    }

    /// Key of a single entity record.
    ///
    /// # Errors
    ///
    /// See [`build_entity_key`].
    pub fn entity(&self, entity_id: &str, generation_index: u32) -> Result<String> {
        build_entity_key(&self.base, entity_id, generation_index)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base)
    }
}
