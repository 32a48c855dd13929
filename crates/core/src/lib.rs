//! # Stowage Core
//!
//! Foundational types for the stowage engine.
//!
//! This crate provides the pieces shared by every planner: geometry primitives,
//! the container/item data model, the error taxonomy, engine configuration, and
//! the two external collaborators the engine talks to (an item store and an
//! activity log sink).
//!
//! ## Core Components
//!
//! - **Geometry**: [`Position`], [`contains`], [`overlaps`]
//! - **Model**: [`Container`], [`Item`]
//! - **Store**: [`ItemStore`] trait with an in-memory [`MemoryStore`]
//! - **Activity**: [`LogSink`] trait with an in-memory [`MemoryLog`]
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialization/deserialization support

pub mod activity;
pub mod config;
pub mod error;
pub mod geometry;
pub mod model;
pub mod store;

// Re-exports
pub use activity::{ItemActivity, LogEntry, LogFilter, LogKind, LogSink, LogSummary, MemoryLog};
pub use config::EngineConfig;
pub use error::{EntityKind, Error, Result};
pub use geometry::{contains, coords, overlaps, overlaps_on, Axis, Coordinates, Position};
pub use model::{Container, Item};
pub use store::{ItemFilter, ItemStore, MemoryStore};
