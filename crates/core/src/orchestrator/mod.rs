//! Workflow orchestrator.
//!
//! Drives a session from upload to final artifact:
//! - Stages: sequential within a session, through the shared [`StageRunner`](crate::stage::StageRunner)
//! - Sessions: one spawned task each, running concurrently
//! - Assembly: once every stage reached a terminal outcome

mod config;
mod runner;
mod types;

pub use config::WorkflowConfig;
pub use runner::WorkflowOrchestrator;
pub use types::{OrchestratorError, OrchestratorStatus, SessionCounts, StartOutcome};
