//! Level snapshots and restore planning.
//!
//! A level is saved under its own base key, `<slot>_<level>`, with its own
//! generation sequence. Saving snapshots every classifiable entity in the
//! scene; restoring reconciles the saved records against the freshly loaded
//! scene and decides, per record, whether to apply it to a live entity,
//! spawn a new one, or give up on it.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, info_span};

use keepsake_core::batch::PendingSaveBatch;
use keepsake_core::entity::{EntityRef, Scene};
use keepsake_core::error::Result;
use keepsake_core::metrics::spans;
use keepsake_core::reconcile::partition;
use keepsake_core::record::{SaveGeneration, SaveRecord};
use keepsake_core::slot_key::append_generation;

use crate::session::SaveSession;

/// Snapshot `scene` into the next generation of `level_name`.
///
/// Each record is labelled with the entity's own id classification. With
/// the session's `save_actor_data` on, entities also refresh their payloads
/// through their save-actor-data capability. Returns the generation index
/// written.
///
/// # Errors
///
/// [`keepsake_core::KeepsakeError::SavingDisabled`] when saving is switched off,
/// [`keepsake_core::KeepsakeError::NoAuthority`] without write authority,
/// [`keepsake_core::KeepsakeError::InvalidKey`] for an empty level name, or the store's
/// error.
pub fn save_level(session: &mut SaveSession, level_name: &str, scene: &dyn Scene) -> Result<u32> {
    session.ensure_writable("save_level")?;
    let level_base = session.slot().level_base(level_name)?;
    let index = session.next_generation_of(&level_base)?;
    let key = append_generation(&level_base, index);
    let _span = info_span!(spans::LEVEL_SAVE, key = %key).entered();

    let mut batch = PendingSaveBatch::new();
    for entity in scene.list_entities() {
        let Some(classifiable) = entity.as_classifiable() else {
            continue;
        };
        let id = classifiable.classification_id();
        if id.is_empty() {
            continue;
        }
        let classification = classifiable.id_classification();
        batch.upsert(SaveRecord::new(id, classification).with_live(&entity));
    }

    let store = Arc::clone(session.store());
    let mut generation = SaveGeneration::new(key.clone(), index);
    let options = session.flush_options();
    let saved = batch.flush(&mut generation, options, |snapshot| store.write(&key, snapshot))?;

    session.remember_generation(&level_base, index);
    info!(level = level_name, key = %key, records = saved, "Level saved");
    Ok(index)
}

/// Newest saved generation of `level_name`, if any.
///
/// # Errors
///
/// [`keepsake_core::KeepsakeError::InvalidKey`] for an empty level name, or the store's
/// error.
pub fn load_level(session: &mut SaveSession, level_name: &str) -> Result<Option<SaveGeneration>> {
    let level_base = session.slot().level_base(level_name)?;
    match session.latest_generation_of(&level_base)? {
        Some(index) => session.store().read(&append_generation(&level_base, index)),
        None => Ok(None),
    }
}

/// What to do with each saved record of a level.
#[derive(Clone, Default)]
pub struct RestorePlan {
    /// Records with a live entity to apply them to, in scene order.
    pub apply: Vec<(SaveRecord, EntityRef)>,
    /// Spawn-only records that can be reconstructed.
    pub spawn: Vec<SaveRecord>,
    /// Spawn-only ids whose records lack a class or transform.
    pub skipped: Vec<String>,
    /// Saved ids that are neither live nor reconstructable.
    pub orphaned: Vec<String>,
}

impl fmt::Debug for RestorePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestorePlan")
            .field("apply", &self.apply.iter().map(|(r, _)| r.id.as_str()).collect::<Vec<_>>())
            .field("spawn", &self.spawn.iter().map(|r| r.id.as_str()).collect::<Vec<_>>())
            .field("skipped", &self.skipped)
            .field("orphaned", &self.orphaned)
            .finish()
    }
}

/// Reconcile `saved` against `scene`.
#[must_use]
pub fn plan_restore(saved: &SaveGeneration, scene: &dyn Scene) -> RestorePlan {
    let split = partition(&scene.list_entities(), &saved.records);
    let mut plan = RestorePlan {
        orphaned: split.orphaned,
        ..RestorePlan::default()
    };

    for (id, entity) in &split.scene_present {
        if let Some(record) = saved.get(id) {
            plan.apply.push((record.clone(), Arc::clone(entity)));
        }
    }

    for id in split.spawn_only {
        match saved.get(&id) {
            Some(record) if record.is_valid_for_spawning() => plan.spawn.push(record.clone()),
            _ => {
                debug!(id = %id, "Spawn-only record lacks class or transform, skipping");
                plan.skipped.push(id);
            }
        }
    }

    plan
}

/// Writes restored state back into the live scene.
pub trait SceneWriter {
    /// Apply `record` to an existing entity.
    fn apply(&mut self, entity: &EntityRef, record: &SaveRecord);

    /// Create an entity from `record`. `None` if the game could not.
    fn spawn(&mut self, record: &SaveRecord) -> Option<EntityRef>;
}

/// Result of [`execute_restore`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreReport {
    /// Records applied to live entities.
    pub applied: usize,
    /// Entities spawned.
    pub spawned: usize,
    /// Ids the writer failed to spawn.
    pub failed: Vec<String>,
}

/// Carry out `plan` through `writer`.
pub fn execute_restore(plan: &RestorePlan, writer: &mut dyn SceneWriter) -> RestoreReport {
    let mut report = RestoreReport::default();
    for (record, entity) in &plan.apply {
        writer.apply(entity, record);
        report.applied += 1;
    }
    for record in &plan.spawn {
        if writer.spawn(record).is_some() {
            report.spawned += 1;
        } else {
            report.failed.push(record.id.clone());
        }
    }
    info!(
        applied = report.applied,
        spawned = report.spawned,
        failed = report.failed.len(),
        "Level restored"
    );
    report
}
