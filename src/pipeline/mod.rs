//! Staged pipeline execution: planning, per-segment recognition, and
//! combination of segment transcripts into a final result.

pub mod combine;
pub mod orchestrator;
pub mod plan;

pub use combine::combine_segments;
pub use orchestrator::{Engines, Orchestrator, OrchestratorConfig};
