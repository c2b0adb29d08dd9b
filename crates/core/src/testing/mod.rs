//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of the pipeline, so sessions can be driven
//! end to end without network access or ffmpeg.
//!
//! # Example
//!
//! ```rust,ignore
//! use keyreel_core::testing::{MockAssembler, MockGenerationProvider, MockImageGenerator};
//!
//! let provider = MockGenerationProvider::new();
//! provider.complete_all().await;
//! let images = MockImageGenerator::new();
//! let assembler = MockAssembler::new();
//!
//! // Build a WorkflowOrchestrator with these, run a session, then assert on
//! // provider.submissions() / assembler.assemblies().
//! ```

mod mock_assembler;
mod mock_image_generator;
mod mock_provider;

pub use mock_assembler::MockAssembler;
pub use mock_image_generator::MockImageGenerator;
pub use mock_provider::MockGenerationProvider;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::path::Path;
    use std::time::Duration;

    use crate::config::{Config, StorageConfig};
    use crate::plan::{StagePlan, StageSpec};
    use crate::provider::{JobOutcome, ProviderError};

    /// Config rooted at `root` with a fast poll budget (1s x 3).
    pub fn test_config(root: &Path) -> Config {
        let mut config = Config::default();
        config.storage = StorageConfig::rooted_at(root);
        config.video_provider.poll_interval_secs = 1;
        config.video_provider.max_poll_attempts = 3;
        config
    }

    /// Plan of `n` video stages.
    pub fn video_plan(n: usize) -> StagePlan {
        StagePlan::new(
            "The product.",
            (0..n)
                .map(|i| StageSpec::video(format!("clip-{}", i), format!("Shot {}.", i)))
                .collect(),
        )
    }

    /// Plan of one image stage followed by one video stage.
    pub fn keyframe_plan() -> StagePlan {
        StagePlan::new(
            "The product.",
            vec![
                StageSpec::image("keyframe", "Product on a table."),
                StageSpec::video("clip", "Slow orbit."),
            ],
        )
    }

    /// A completed poll answer.
    pub fn completed(url: &str) -> Result<JobOutcome, ProviderError> {
        Ok(JobOutcome::Completed {
            url: url.to_string(),
        })
    }

    /// Budget of the poller built from [`test_config`].
    pub fn test_poll_budget() -> Duration {
        Duration::from_secs(3)
    }
}
