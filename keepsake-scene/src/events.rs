//! Scene events that affect saved state.
//!
//! Produced by [`crate::hooks`] and consumed by [`crate::systems`].

use keepsake_core::entity::LiveRef;
use keepsake_core::types::{ClassRef, Transform};

/// A change in the live scene that should reach the save.
#[derive(Debug, Clone)]
pub enum SceneEvent {
    /// A runtime entity was created.
    ActorSpawned {
        /// Freshly generated GUID id.
        id: String,
        /// Type to reconstruct on load.
        class_ref: ClassRef,
        /// Where it appeared.
        transform: Transform,
        /// The live entity.
        live: LiveRef,
    },

    /// An entity moved.
    ActorMoved {
        /// Save id of the entity.
        id: String,
        /// New placement.
        transform: Transform,
    },

    /// A player entered the session.
    PlayerJoined {
        /// Platform id, used as the save id.
        platform_id: String,
        /// Spawn placement, if known.
        transform: Option<Transform>,
        /// The player's pawn.
        live: LiveRef,
    },

    /// An entity was removed from the scene.
    ActorDestroyed {
        /// Save id of the entity.
        id: String,
    },

    /// A level is about to unload and should be snapshotted.
    LevelUnloading {
        /// Level name.
        level_name: String,
    },
}

impl SceneEvent {
    /// The save id this event is about, if any.
    #[must_use]
    pub fn subject(&self) -> Option<&str> {
        match self {
            Self::ActorSpawned { id, .. } | Self::ActorMoved { id, .. } | Self::ActorDestroyed { id } => {
                Some(id.as_str())
            }
            Self::PlayerJoined { platform_id, .. } => Some(platform_id.as_str()),
            Self::LevelUnloading { .. } => None,
        }
    }
}
