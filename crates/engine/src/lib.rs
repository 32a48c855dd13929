//! # Stowage Engine
//!
//! Placement and retrieval planning for vessel stowage.
//!
//! This crate provides:
//! - **Placement search**: first-fit coarse-to-fine lattice scan over a container
//! - **Batch recommendation**: priority-ordered placement of several items at once
//! - **Retrieval planning**: blocker detection and step-by-step retrieval plans
//! - **Waste handling**: classification, return plans, return scheduling and undocking
//! - **Simulation clock**: day-based advancement of usage and expiry
//!
//! Pure planners take already-fetched values. [`Stowage`] runs them against an
//! [`ItemStore`](stowage_core::ItemStore) and records activity to a
//! [`LogSink`](stowage_core::LogSink).

pub mod collision;
pub mod priority;
pub mod recommend;
pub mod retrieval;
pub mod search;
pub mod simulation;
pub mod stowage;
pub mod waste;

// Re-exports
pub use collision::OccupiedSpace;
pub use priority::{
    obstruction_penalty, prioritize_for_retrieval, priority_score, rank_for_placement,
    retrieval_ease_score,
};
pub use recommend::{FailureReason, PlacementOutcome, Recommendation};
pub use retrieval::{blocks, find_blockers, plan_retrieval, RetrievalPlan, RetrievalStep};
pub use search::{check_fit, validate_position, ContainerMatch, PlacementSearch, ScanOrder, SearchPass};
pub use simulation::{
    AdvanceChanges, AdvanceOutcome, AdvanceRequest, AdvanceSpan, ExpiredItem, SettingsPatch,
    Simulation, SimulationSettings, UsedItem, WasteRecord,
};
pub use stowage::{RetrieveRequest, SearchResult, Stowage};
pub use stowage_core::{EngineConfig, Error, Result};
pub use waste::{
    build_return_plan, classify, complete_undocking, identify_waste, plan_return, ExpiryStatus,
    ItemSummary, ReturnPlan, ReturnSchedule, ReturnStep, ScheduledItem, ScheduledReturn,
    ScheduledReturnDetails, UndockingFailure, UndockingReport, UsageStatus, WasteClassification,
    WasteItem,
};
