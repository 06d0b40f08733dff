//! Systems that route scene events into the pending-save batch.
//!
//! Standalone functions, called once per event from the game's update loop.
//! They only queue work; nothing touches storage until the session commits.

use tracing::debug;

use keepsake_core::record::SaveRecord;
use keepsake_core::types::{is_spawned_id, IdClassification, RecordConfig};

use crate::events::SceneEvent;
use crate::session::BatchHandle;

/// What [`apply_event`] did with an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// A record for `id` is now pending.
    Queued(String),
    /// The pending record for `id` was withdrawn, if there was one.
    Removed {
        /// Save id.
        id: String,
        /// Whether a pending record existed.
        was_pending: bool,
    },
    /// The record was rejected (empty id).
    Dropped,
    /// The caller should snapshot this level before it unloads.
    LevelUnloading(String),
}

/// Apply one scene event to the pending batch.
pub fn apply_event(event: &SceneEvent, batch: &BatchHandle) -> Applied {
    match event {
        SceneEvent::ActorSpawned {
            id,
            class_ref,
            transform,
            live,
        } => {
            let mut record = SaveRecord::new(id.clone(), IdClassification::SpawnedActor)
                .with_class(class_ref.clone())
                .with_transform(*transform)
                .with_config(RecordConfig::all());
            record.live_ref = live.clone();
            queue(batch, record)
        }

        SceneEvent::ActorMoved { id, transform } => {
            let mut pending = batch.lock();
            let record = pending.remove(id).unwrap_or_else(|| {
                let classification = if is_spawned_id(id) {
                    IdClassification::SpawnedActor
                } else {
                    IdClassification::LevelActor
                };
                SaveRecord::new(id.clone(), classification)
            });
            if pending.upsert(record.with_transform(*transform)) {
                Applied::Queued(id.clone())
            } else {
                Applied::Dropped
            }
        }

        SceneEvent::PlayerJoined {
            platform_id,
            transform,
            live,
        } => {
            let mut record = SaveRecord::new(platform_id.clone(), IdClassification::Player)
                .with_config(RecordConfig::all());
            record.transform = *transform;
            record.live_ref = live.clone();
            queue(batch, record)
        }

        SceneEvent::ActorDestroyed { id } => {
            let was_pending = batch.lock().remove(id).is_some();
            debug!(id = %id, was_pending, "Actor destroyed");
            Applied::Removed {
                id: id.clone(),
                was_pending,
            }
        }

        SceneEvent::LevelUnloading { level_name } => Applied::LevelUnloading(level_name.clone()),
    }
}

/// Apply events in order.
pub fn apply_events<'a, I>(events: I, batch: &BatchHandle) -> Vec<Applied>
where
    I: IntoIterator<Item = &'a SceneEvent>,
{
    events.into_iter().map(|event| apply_event(event, batch)).collect()
}

fn queue(batch: &BatchHandle, record: SaveRecord) -> Applied {
    let id = record.id.clone();
    if batch.lock().upsert(record) {
        Applied::Queued(id)
    } else {
        Applied::Dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks;
    use keepsake_core::batch::PendingSaveBatch;
    use keepsake_core::entity::{EntityRef, SceneEntity};
    use keepsake_core::types::{ClassRef, Rotator3, Transform, Vector3};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct Pawn;
    impl SceneEntity for Pawn {}

    fn batch() -> BatchHandle {
        Arc::new(Mutex::new(PendingSaveBatch::new()))
    }

    fn at(x: f32) -> Transform {
        Transform::new(Vector3::new(x, 0.0, 0.0), Rotator3::default())
    }

    #[test]
    fn spawned_actor_is_queued_spawnable() {
        let batch = batch();
        let pawn: EntityRef = Arc::new(Pawn);
        let event = hooks::on_actor_spawned(&pawn, ClassRef::new("Npc.Wolf"), at(0.0));

        let Applied::Queued(id) = apply_event(&event, &batch) else {
            panic!("spawn should queue");
        };
        let pending = batch.lock();
        let record = pending.get(&id).expect("pending");
        assert_eq!(record.id_classification, IdClassification::SpawnedActor);
        assert!(record.is_valid_for_spawning());
        assert!(record.live_ref.is_alive());
    }

    #[test]
    fn moves_update_pending_transform() {
        let batch = batch();
        apply_event(&hooks::on_actor_moved("Door_1", at(1.0)), &batch);
        apply_event(&hooks::on_actor_moved("Door_1", at(2.0)), &batch);

        let pending = batch.lock();
        assert_eq!(pending.len(), 1);
        let record = pending.get("Door_1").expect("pending");
        assert_eq!(record.transform, Some(at(2.0)));
        assert_eq!(record.id_classification, IdClassification::LevelActor);
    }

    #[test]
    fn destroy_withdraws_pending_record() {
        let batch = batch();
        let pawn: EntityRef = Arc::new(Pawn);
        let results = apply_events(
            &[
                hooks::on_player_joined("steam-1", &pawn, None),
                hooks::on_actor_destroyed("steam-1"),
                hooks::on_actor_destroyed("never-queued"),
                hooks::on_level_unloading("Keep"),
            ],
            &batch,
        );

        assert_eq!(
            results,
            vec![
                Applied::Queued("steam-1".to_string()),
                Applied::Removed {
                    id: "steam-1".to_string(),
                    was_pending: true
                },
                Applied::Removed {
                    id: "never-queued".to_string(),
                    was_pending: false
                },
                Applied::LevelUnloading("Keep".to_string()),
            ]
        );
        assert!(batch.lock().is_empty());
    }

    #[test]
    fn empty_player_id_is_dropped() {
        let batch = batch();
        let pawn: EntityRef = Arc::new(Pawn);
        assert_eq!(apply_event(&hooks::on_player_joined("", &pawn, None), &batch), Applied::Dropped);
    }
}
