//! Matching saved records against a live scene.
//!
//! Every saved id lands in exactly one bucket: it is either backed by a live
//! classifiable entity, reconstructable from its record (GUID ids), or
//! orphaned. Live entities without a saved record are still scene-present.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::entity::{classification_of, EntityRef};
use crate::record::SaveRecord;
use crate::types::{is_spawned_id, IdClassification};

/// Result of [`partition`].
#[derive(Clone, Default)]
pub struct Partition {
    /// Live classifiable entities, in scene order, with their ids.
    pub scene_present: Vec<(String, EntityRef)>,
    /// Saved GUID ids with no live entity, ascending.
    pub spawn_only: Vec<String>,
    /// Saved non-GUID ids with no live entity, ascending.
    pub orphaned: Vec<String>,
}

impl Partition {
    /// Ids of the scene-present entities, in scene order.
    #[must_use]
    pub fn scene_ids(&self) -> Vec<&str> {
        self.scene_present.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Live entity for a scene-present id.
    #[must_use]
    pub fn entity(&self, id: &str) -> Option<&EntityRef> {
        self.scene_present
            .iter()
            .find(|(present, _)| present == id)
            .map(|(_, entity)| entity)
    }
}

impl fmt::Debug for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("scene_present", &self.scene_ids())
            .field("spawn_only", &self.spawn_only)
            .field("orphaned", &self.orphaned)
            .finish()
    }
}

/// Split `scene_entities` and `saved` into scene-present, spawn-only and
/// orphaned ids.
///
/// Entities without the classifiable capability, or with an empty id, are
/// ignored. If two entities report the same id the first one wins.
#[must_use]
pub fn partition(scene_entities: &[EntityRef], saved: &BTreeMap<String, SaveRecord>) -> Partition {
    let mut seen = HashSet::with_capacity(scene_entities.len());
    let mut result = Partition::default();

    for entity in scene_entities {
        let Some(id) = classification_of(entity.as_ref()) else {
            continue;
        };
        if seen.insert(id.clone()) {
            result.scene_present.push((id, Arc::clone(entity)));
        } else {
            debug!(id = %id, "Duplicate classification id in scene, keeping first");
        }
    }

    for (id, record) in saved {
        if seen.contains(id.as_str()) {
            continue;
        }
        if is_spawned_id(id) {
            if record.id_classification == IdClassification::LevelActor {
                warn!(id = %id, "Level actor id parses as a GUID, treating as spawn-only");
            }
            result.spawn_only.push(id.clone());
        } else {
            result.orphaned.push(id.clone());
        }
    }

    debug!(
        scene_present = result.scene_present.len(),
        spawn_only = result.spawn_only.len(),
        orphaned = result.orphaned.len(),
        "Partitioned saved records against scene"
    );
    result
}
