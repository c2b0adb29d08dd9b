//! Workflow configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the workflow orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    /// Finish successful sessions in READY instead of COMPLETED.
    /// A display client then moves them to PLAYING via the play command.
    #[serde(default)]
    pub await_playback: bool,

    /// Remove a session's downloaded clips once the pipeline ends.
    #[serde(default = "default_cleanup_temp")]
    pub cleanup_temp: bool,
}

fn default_cleanup_temp() -> bool {
    true
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            await_playback: false,
            cleanup_temp: default_cleanup_temp(),
        }
    }
}
