//! Capability interfaces exposed by scene entities.
//!
//! Scene entities are opaque to the core. They opt into reconciliation and
//! lazy payload computation by returning capability objects from
//! [`SceneEntity`], rather than by sharing a base type.

use std::fmt;
use std::sync::{Arc, Weak};

use crate::record::SaveRecord;
use crate::types::{is_spawned_id, IdClassification};

/// A live entity as seen by the save core.
pub trait SceneEntity: Send + Sync {
    /// The classification capability, if this entity takes part in
    /// reconciliation.
    fn as_classifiable(&self) -> Option<&dyn Classifiable> {
        None
    }

    /// The save-actor-data capability, if this entity computes its own
    /// payload right before a flush.
    fn as_save_actor_data(&self) -> Option<&dyn SaveActorData> {
        None
    }
}

/// Entities that carry a stable save id.
pub trait Classifiable {
    /// The entity's save id. Empty means "not participating".
    fn classification_id(&self) -> String;

    /// How the id was derived. Defaults to the GUID heuristic; players and
    /// other entities that know better override it.
    fn id_classification(&self) -> IdClassification {
        if is_spawned_id(&self.classification_id()) {
            IdClassification::SpawnedActor
        } else {
            IdClassification::LevelActor
        }
    }
}

/// Entities that refresh their record before it is committed.
pub trait SaveActorData {
    /// Return the record to commit, derived from the pending `record`.
    fn save_actor_data(&self, record: SaveRecord) -> SaveRecord;
}

/// Shared handle to a live entity.
pub type EntityRef = Arc<dyn SceneEntity>;

/// Query interface over a live scene.
pub trait Scene {
    /// All entities currently instantiated.
    fn list_entities(&self) -> Vec<EntityRef>;
}

impl Scene for Vec<EntityRef> {
    fn list_entities(&self) -> Vec<EntityRef> {
        self.clone()
    }
}

/// Classification id of `entity`, or `None` when it does not participate.
#[must_use]
pub fn classification_of(entity: &dyn SceneEntity) -> Option<String> {
    entity
        .as_classifiable()
        .map(|classifiable| classifiable.classification_id())
        .filter(|id| !id.is_empty())
}

/// Non-owning, possibly stale reference to a live entity.
///
/// Never serialized. Once the referent is dropped, [`LiveRef::upgrade`]
/// returns `None`.
#[derive(Clone, Default)]
pub struct LiveRef(Option<Weak<dyn SceneEntity>>);

impl LiveRef {
    /// A reference that points at nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self(None)
    }

    /// Downgrade a live handle.
    #[must_use]
    pub fn to(entity: &EntityRef) -> Self {
        Self(Some(Arc::downgrade(entity)))
    }

    /// The live entity, or `None` if unset or gone.
    #[must_use]
    pub fn upgrade(&self) -> Option<EntityRef> {
        self.0.as_ref().and_then(|weak| weak.upgrade())
    }

    /// Whether the referent is still alive.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.as_ref().is_some_and(|weak| weak.strong_count() > 0)
    }
}

impl PartialEq for LiveRef {
    fn eq(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (None, None) => true,
            (Some(a), Some(b)) => Weak::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for LiveRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            None => write!(f, "LiveRef(unset)"),
            Some(_) if self.is_alive() => write!(f, "LiveRef(alive)"),
            Some(_) => write!(f, "LiveRef(gone)"),
        }
    }
}

impl From<&EntityRef> for LiveRef {
    fn from(entity: &EntityRef) -> Self {
        Self::to(entity)
    }
}
