//! Core value types shared by every Keepsake component.
//!
//! All types are serializable; none of them carry live engine state.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// How a record's id was derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum IdClassification {
    /// Not classified; the record does not take part in reconciliation.
    #[default]
    None,
    /// Created at runtime; the id is a freshly generated GUID.
    SpawnedActor,
    /// A player-owned entity, keyed by the player's platform id.
    Player,
    /// Placed in the level by a designer; the id is its stable level name.
    LevelActor,
}

impl fmt::Display for IdClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::SpawnedActor => write!(f, "SpawnedActor"),
            Self::Player => write!(f, "Player"),
            Self::LevelActor => write!(f, "LevelActor"),
        }
    }
}

/// Generate a fresh id for a runtime-spawned entity.
///
/// The hyphenated GUID form is what [`is_spawned_id`] recognizes.
#[must_use]
pub fn new_spawned_id() -> String {
    Uuid::new_v4().to_string()
}

/// Whether `id` parses as a GUID, i.e. looks like a runtime-spawned id.
///
/// This is a heuristic: a designer-assigned level name that happens to be a
/// valid GUID is indistinguishable from a spawned id.
#[must_use]
pub fn is_spawned_id(id: &str) -> bool {
    Uuid::parse_str(id).is_ok()
}

/// Opaque handle naming the concrete entity type to reconstruct on spawn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClassRef(pub String);

impl ClassRef {
    /// Create a class reference from a type path.
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The type path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Spatial
// ---------------------------------------------------------------------------

/// A 3D position in the game world.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    /// X coordinate.
    pub x: f32,
    /// Y coordinate.
    pub y: f32,
    /// Z coordinate.
    pub z: f32,
}

impl Vector3 {
    /// Construct a vector.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1}, {:.1})", self.x, self.y, self.z)
    }
}

/// An orientation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rotator3 {
    /// Rotation about the lateral axis.
    pub pitch: f32,
    /// Rotation about the vertical axis.
    pub yaw: f32,
    /// Rotation about the forward axis.
    pub roll: f32,
}

impl Rotator3 {
    /// Construct a rotator.
    #[must_use]
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }
}

/// Spatial snapshot of an entity.
///
/// Records carry `Option<Transform>`; presence, not a zero sentinel, says
/// whether the snapshot applies. An entity at the origin is a real position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform {
    /// World position.
    pub position: Vector3,
    /// World orientation.
    pub orientation: Rotator3,
}

impl Transform {
    /// Construct a transform.
    #[must_use]
    pub const fn new(position: Vector3, orientation: Rotator3) -> Self {
        Self {
            position,
            orientation,
        }
    }
}

// ---------------------------------------------------------------------------
// Record configuration
// ---------------------------------------------------------------------------

/// Which sub-domains a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordConfig {
    /// Attribute values (health, stamina, ...).
    #[serde(default)]
    pub save_attributes: bool,
    /// Inventory contents.
    #[serde(default)]
    pub save_inventory: bool,
    /// Combat state (equipped armaments, cooldowns).
    #[serde(default)]
    pub save_combat: bool,
}

impl RecordConfig {
    /// Every sub-domain enabled.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            save_attributes: true,
            save_inventory: true,
            save_combat: true,
        }
    }
}
