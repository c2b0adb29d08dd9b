use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle status of a workflow session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// Created, no reference asset yet.
    WaitingInput,
    /// Stages are running.
    Processing,
    /// Final artifact exists; waiting for a display to start playback.
    Ready,
    /// Final artifact exists (terminal).
    Completed,
    /// Playback was started (terminal).
    Playing,
    /// No artifact could be produced (terminal).
    Failed,
}

impl SessionStatus {
    pub const ALL: [SessionStatus; 6] = [
        SessionStatus::WaitingInput,
        SessionStatus::Processing,
        SessionStatus::Ready,
        SessionStatus::Completed,
        SessionStatus::Playing,
        SessionStatus::Failed,
    ];

    /// Returns true if no further transition is allowed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Playing | SessionStatus::Failed
        )
    }

    /// Returns true if moving from `self` to `next` is a legal edge.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (WaitingInput, Processing) => true,
            (Processing, Ready) | (Processing, Completed) => true,
            (Ready, Playing) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }

    /// Wire name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::WaitingInput => "WAITING_INPUT",
            SessionStatus::Processing => "PROCESSING",
            SessionStatus::Ready => "READY",
            SessionStatus::Completed => "COMPLETED",
            SessionStatus::Playing => "PLAYING",
            SessionStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One end-to-end generation request, from upload to final artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowSession {
    pub id: String,
    pub status: SessionStatus,
    /// Local path of the uploaded reference. Set once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_asset_path: Option<PathBuf>,
    /// Public URL or local path of the final artifact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_artifact_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
    pub clip_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowSession {
    /// New session in `WAITING_INPUT` with a fresh UUID.
    pub fn new() -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            status: SessionStatus::WaitingInput,
            reference_asset_path: None,
            output_artifact_ref: None,
            error_reason: None,
            clip_count: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Default for WorkflowSession {
    fn default() -> Self {
        Self::new()
    }
}
