//! # Keepsake Core Library
//!
//! Game-agnostic save indexing and reconciliation.
//!
//! A save is addressed by a deterministic key (game mode, owner, slot) and
//! stored as a sequence of numbered generations. This crate provides:
//!
//! - [`slot_key`]: key construction for slots, generations, levels and entities
//! - [`locator`]: finding the newest generation with few existence probes
//! - [`reconcile`]: matching saved records against a live scene
//! - [`batch`]: accumulating pending saves and committing them atomically
//! - [`registry`]: per-category save strategies with an authority gate
//! - [`store`]: in-memory and SQLite backends
//!
//! ## Performance Contract
//!
//! - Key construction: allocation only, no I/O
//! - Locating generation N: `O(log N)` probes, bounded by `max_probes`
//! - Partitioning: linear in scene size plus saved-record count

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod authority;
pub mod batch;
pub mod config;
pub mod entity;
pub mod error;
pub mod events;
pub mod locator;
pub mod metrics;
pub mod reconcile;
pub mod record;
pub mod registry;
pub mod slot_key;
pub mod store;
pub mod types;

pub use authority::{Authority, AuthorityFlag};
pub use batch::{FlushOptions, PendingSaveBatch};
pub use config::KeepsakeConfig;
pub use entity::{Classifiable, EntityRef, LiveRef, SaveActorData, Scene, SceneEntity};
pub use error::{KeepsakeError, Result};
pub use locator::{GenerationLocator, Located};
pub use reconcile::{partition, Partition};
pub use record::{SaveGeneration, SaveRecord};
pub use registry::{SaveCategory, SaveCategoryConfig, SaveLogicRegistry, SaveStrategy, StrategyCatalog};
pub use slot_key::{GameModeKind, SlotKey};
pub use store::{MemoryStore, SaveStore, SqliteStore};
pub use types::*;
