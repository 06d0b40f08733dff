//! Property-Based Tests for Keepsake Core
//!
//! Uses `proptest` to check the save-index invariants under random inputs:
//! key determinism, generation lookup, partition completeness, and the
//! idempotence and atomicity of pending-save batches.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use proptest::prelude::*;

use keepsake_core::batch::{FlushOptions, PendingSaveBatch};
use keepsake_core::config::LocatorConfig;
use keepsake_core::entity::{Classifiable, EntityRef, SceneEntity};
use keepsake_core::error::KeepsakeError;
use keepsake_core::locator::GenerationLocator;
use keepsake_core::reconcile::partition;
use keepsake_core::record::{SaveGeneration, SaveRecord};
use keepsake_core::slot_key::{append_generation, build_base_key};
use keepsake_core::types::IdClassification;

struct Named(String);

impl SceneEntity for Named {
    fn as_classifiable(&self) -> Option<&dyn Classifiable> {
        Some(self)
    }
}

impl Classifiable for Named {
    fn classification_id(&self) -> String {
        self.0.clone()
    }
}

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_component() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9]{0,11}"
}

/// Level names or GUIDs, as found in real saves.
fn arb_save_id() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Z][a-z]{2,6}_[0-9]{1,3}",
        any::<u128>().prop_map(|bits| uuid::Uuid::from_u128(bits).to_string()),
    ]
}

fn arb_record() -> impl Strategy<Value = SaveRecord> {
    ("[a-d]{0,2}", any::<u8>()).prop_map(|(id, value)| {
        SaveRecord::new(id, IdClassification::LevelActor).with_payload(serde_json::json!(value))
    })
}

// ---------------------------------------------------------------------------
// Property: keys are deterministic and well-formed
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn base_key_is_deterministic(
        class in arb_component(),
        owner in arb_component(),
        slot in any::<u32>(),
        generation in any::<u32>(),
    ) {
        let first = build_base_key(&class, &owner, slot).expect("valid components");
        let second = build_base_key(&class, &owner, slot).expect("valid components");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &format!("{class}_{owner}_S{slot}"));
        prop_assert_eq!(append_generation(&first, generation), format!("{first}_{generation}"));
    }
}

// ---------------------------------------------------------------------------
// Property: contiguous generations are located exactly
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn locator_finds_last_contiguous_generation(last in 0u32..50_000, step in 1u32..500) {
        let locator = GenerationLocator::new(&LocatorConfig { initial_step: step, max_probes: 64 });
        let located = locator
            .locate("k", |key| {
                let index: u32 = key.rsplit('_').next().and_then(|s| s.parse().ok()).expect("index suffix");
                Ok(index <= last)
            })
            .expect("no probe errors")
            .expect("generation 0 exists");
        prop_assert_eq!(located.index, last);
        prop_assert!(located.converged);
        prop_assert!(located.probes <= 64);
    }

    #[test]
    fn locator_estimate_never_exceeds_truth(last in 0u32..1_000_000, budget in 1u32..8) {
        let locator = GenerationLocator::new(&LocatorConfig { initial_step: 100, max_probes: budget });
        let located = locator
            .locate("k", |key| {
                let index: u32 = key.rsplit('_').next().and_then(|s| s.parse().ok()).expect("index suffix");
                Ok(index <= last)
            })
            .expect("no probe errors")
            .expect("generation 0 exists");
        prop_assert!(located.index <= last);
        prop_assert!(located.probes <= budget);
    }
}

// ---------------------------------------------------------------------------
// Property: every saved id lands in exactly one bucket
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn partition_is_complete_and_disjoint(
        saved_ids in prop::collection::btree_set(arb_save_id(), 0..20),
        scene_only in prop::collection::vec(arb_save_id(), 0..5),
        keep_mask in prop::collection::vec(any::<bool>(), 20),
    ) {
        let saved: BTreeMap<String, SaveRecord> = saved_ids
            .iter()
            .map(|id| (id.clone(), SaveRecord::new(id.clone(), IdClassification::LevelActor)))
            .collect();
        let in_scene: Vec<String> = saved_ids
            .iter()
            .zip(&keep_mask)
            .filter(|(_, keep)| **keep)
            .map(|(id, _)| id.clone())
            .chain(scene_only)
            .collect();
        let scene: Vec<EntityRef> = in_scene
            .iter()
            .map(|id| Arc::new(Named(id.clone())) as EntityRef)
            .collect();

        let result = partition(&scene, &saved);

        let present: BTreeSet<&str> = result.scene_ids().into_iter().collect();
        let spawn: BTreeSet<&str> = result.spawn_only.iter().map(String::as_str).collect();
        let orphaned: BTreeSet<&str> = result.orphaned.iter().map(String::as_str).collect();

        for id in saved.keys() {
            let buckets = [present.contains(id.as_str()), spawn.contains(id.as_str()), orphaned.contains(id.as_str())];
            prop_assert_eq!(buckets.iter().filter(|hit| **hit).count(), 1, "id {} in {:?}", id, buckets);
        }
        let scene_set: BTreeSet<&str> = in_scene.iter().map(String::as_str).collect();
        prop_assert_eq!(present, scene_set);
        prop_assert!(spawn.iter().all(|id| uuid::Uuid::parse_str(id).is_ok()));
    }
}

// ---------------------------------------------------------------------------
// Property: batches are idempotent and flushes atomic
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn replaying_upserts_is_idempotent(records in prop::collection::vec(arb_record(), 0..30)) {
        let mut once = PendingSaveBatch::new();
        for record in &records {
            once.upsert(record.clone());
        }
        let mut twice = once.clone();
        for record in &records {
            twice.upsert(record.clone());
        }

        prop_assert_eq!(once.ids(), twice.ids());
        for id in once.ids() {
            prop_assert_eq!(once.get(&id), twice.get(&id));
        }
        prop_assert!(once.get("").is_none());
    }

    #[test]
    fn failed_flush_leaves_everything_untouched(
        existing in prop::collection::vec(arb_record(), 0..10),
        pending in prop::collection::vec(arb_record(), 0..10),
    ) {
        let mut target = SaveGeneration::new("k_3", 3);
        for record in existing.into_iter().filter(SaveRecord::has_id) {
            target.upsert(record);
        }
        let mut batch = PendingSaveBatch::new();
        for record in pending {
            batch.upsert(record);
        }
        let target_before = target.clone();
        let ids_before = batch.ids();

        let result = batch.flush(&mut target, FlushOptions::default(), |_| {
            Err(KeepsakeError::StoreWriteRejected { key: "k_3".into() })
        });

        prop_assert!(result.is_err());
        prop_assert_eq!(target, target_before);
        prop_assert_eq!(batch.ids(), ids_before);
    }
}
