//! Integration hooks for the host game's gameplay code.
//!
//! Each hook turns a gameplay callback into a [`SceneEvent`]. The game calls
//! them from wherever it handles spawning, movement, joins and level
//! streaming, then feeds the events to [`crate::systems::apply_event`].

use keepsake_core::entity::{EntityRef, LiveRef};
use keepsake_core::types::{new_spawned_id, ClassRef, Transform};

use crate::events::SceneEvent;

/// A runtime entity was spawned. Assigns it a fresh GUID save id; the game
/// must report that id from the entity's classification from now on.
#[must_use]
pub fn on_actor_spawned(entity: &EntityRef, class_ref: ClassRef, transform: Transform) -> SceneEvent {
    SceneEvent::ActorSpawned {
        id: new_spawned_id(),
        class_ref,
        transform,
        live: LiveRef::to(entity),
    }
}

/// An entity moved.
#[must_use]
pub fn on_actor_moved(id: impl Into<String>, transform: Transform) -> SceneEvent {
    SceneEvent::ActorMoved {
        id: id.into(),
        transform,
    }
}

/// A player joined.
#[must_use]
pub fn on_player_joined(
    platform_id: impl Into<String>,
    pawn: &EntityRef,
    transform: Option<Transform>,
) -> SceneEvent {
    SceneEvent::PlayerJoined {
        platform_id: platform_id.into(),
        transform,
        live: LiveRef::to(pawn),
    }
}

/// An entity was destroyed.
#[must_use]
pub fn on_actor_destroyed(id: impl Into<String>) -> SceneEvent {
    SceneEvent::ActorDestroyed { id: id.into() }
}

/// A level is about to unload.
#[must_use]
pub fn on_level_unloading(level_name: impl Into<String>) -> SceneEvent {
    SceneEvent::LevelUnloading {
        level_name: level_name.into(),
    }
}
