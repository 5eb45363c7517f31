//! Shared domain types for the Aurora runtime.
//!
//! These types cross the boundary between the burn orchestrator, the HTTP
//! layer and anything that reads persisted run records back from disk, so
//! they carry no behaviour beyond serialization and small derivations.

pub mod burn;
pub mod persona;

pub use burn::{
    ArtifactPaths, BurnOutcome, BurnReport, BurnStatus, BurnSummary, MonitorEvent,
    ProtocolIdentity, RunMeta, RunOutcomeSummary, RunRecord, Signal, MRJ_VERSION,
};
pub use persona::{PersonaBlueprint, PersonaInstance, StateMap};
