//! Saved records and the generations that hold them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{EntityRef, LiveRef};
use crate::types::{ClassRef, IdClassification, RecordConfig, Transform};

/// One entity's persisted state at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveRecord {
    /// Save id, unique within a generation.
    pub id: String,
    /// How `id` was derived.
    #[serde(default)]
    pub id_classification: IdClassification,
    /// Spatial snapshot, if one applies.
    #[serde(default)]
    pub transform: Option<Transform>,
    /// Which sub-domains this record carries.
    #[serde(default)]
    pub config: RecordConfig,
    /// Concrete type to reconstruct when spawning anew.
    #[serde(default)]
    pub class_ref: Option<ClassRef>,
    /// Entity-defined data.
    #[serde(default)]
    pub payload: serde_json::Value,
    /// The live entity this record was taken from.
    #[serde(skip)]
    pub live_ref: LiveRef,
}

impl SaveRecord {
    /// A bare record with the given id and classification.
    #[must_use]
    pub fn new(id: impl Into<String>, id_classification: IdClassification) -> Self {
        Self {
            id: id.into(),
            id_classification,
            transform: None,
            config: RecordConfig::default(),
            class_ref: None,
            payload: serde_json::Value::Null,
            live_ref: LiveRef::none(),
        }
    }

    /// Set the spatial snapshot.
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    /// Set the class to reconstruct on spawn.
    #[must_use]
    pub fn with_class(mut self, class_ref: ClassRef) -> Self {
        self.class_ref = Some(class_ref);
        self
    }

    /// Set the sub-domain flags.
    #[must_use]
    pub fn with_config(mut self, config: RecordConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the entity-defined payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Attach a weak reference to the live entity.
    #[must_use]
    pub fn with_live(mut self, entity: &EntityRef) -> Self {
        self.live_ref = LiveRef::to(entity);
        self
    }

    /// Whether the id is usable at all.
    #[must_use]
    pub fn has_id(&self) -> bool {
        !self.id.is_empty()
    }

    /// A record can be spawned when it names a class and carries a transform.
    #[must_use]
    pub fn is_valid_for_spawning(&self) -> bool {
        self.class_ref.is_some() && self.transform.is_some()
    }
}

/// A versioned snapshot of saved records for one key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveGeneration {
    /// Full storage key, generation suffix included.
    pub key: String,
    /// Generation number.
    pub generation_index: u32,
    /// Wall-clock time of the last successful commit.
    pub saved_at: DateTime<Utc>,
    /// Records by id.
    #[serde(default)]
    pub records: BTreeMap<String, SaveRecord>,
}

impl SaveGeneration {
    /// An empty generation.
    #[must_use]
    pub fn new(key: impl Into<String>, generation_index: u32) -> Self {
        Self {
            key: key.into(),
            generation_index,
            saved_at: Utc::now(),
            records: BTreeMap::new(),
        }
    }

    /// Insert or overwrite a record by id.
    pub fn upsert(&mut self, record: SaveRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Look up a record.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SaveRecord> {
        self.records.get(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the generation holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
