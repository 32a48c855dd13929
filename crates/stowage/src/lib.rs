//! # Stowage
//!
//! Vessel stowage engine: collision-free 3D placement of items in containers,
//! retrieval planning around blocking items, waste identification and return
//! planning, and a simulated mission clock.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stowage::{Container, Item, MemoryLog, MemoryStore, Stowage};
//!
//! let mut stowage = Stowage::new(MemoryStore::new(), MemoryLog::new());
//! stowage.add_container(Container::new("C1", "Lab", 100, 80, 60))?;
//! let item = stowage.add_item(Item::new("I1", "Water", "C1", 20, 15, 5))?;
//! let plan = stowage.retrieval_plan(item.id())?;
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Serialization support

/// Geometry, data model, store and log abstractions.
pub use stowage_core as core;

/// Planners and the store-backed facade.
pub use stowage_engine as engine;

// Re-export commonly used types at root level
pub use stowage_core::{
    Container, EngineConfig, Error, Item, ItemStore, LogSink, MemoryLog, MemoryStore, Position,
    Result,
};
pub use stowage_engine::{PlacementSearch, Simulation, Stowage};
