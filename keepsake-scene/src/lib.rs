//! # keepsake-scene: Scene Integration for Keepsake
//!
//! This crate connects the game-agnostic `keepsake-core` library to a live
//! game scene.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │                Host game                 │
//! │  ┌────────────────────────────────────┐  │
//! │  │          keepsake-scene            │  │
//! │  │  ┌─────────┐  ┌─────────────────┐  │  │
//! │  │  │  hooks  │─▶│ systems (batch) │  │  │
//! │  │  └─────────┘  └────────┬────────┘  │  │
//! │  │  ┌─────────┐  ┌────────▼────────┐  │  │
//! │  │  │autosave │─▶│   SaveSession   │  │  │
//! │  │  └─────────┘  └────────┬────────┘  │  │
//! │  │               ┌────────▼────────┐  │  │
//! │  │               │  keepsake-core  │  │  │
//! │  │               └─────────────────┘  │  │
//! │  └────────────────────────────────────┘  │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `session`: explicit per-slot save state, commit and load
//! - `level`: per-level snapshots and restore planning
//! - `hooks`: gameplay callbacks turned into scene events
//! - `events`: scene event types
//! - `systems`: scene events applied to the pending-save batch
//! - `autosave`: periodic commits on a `tokio` interval
//! - `config`: the `[session]` table and backend selection
//! - `telemetry`: `tracing` subscriber setup

pub mod autosave;
pub mod config;
pub mod events;
pub mod hooks;
pub mod level;
pub mod session;
pub mod systems;
pub mod telemetry;

pub use autosave::AutoSaver;
pub use config::SceneConfig;
pub use events::SceneEvent;
pub use session::{BatchHandle, SaveSession};
