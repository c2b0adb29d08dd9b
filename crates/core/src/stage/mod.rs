//! Execution of single plan stages.

mod runner;
mod types;

pub use runner::StageRunner;
pub use types::{StageArtifact, StageContext, StageFailure, StageOutcome};
