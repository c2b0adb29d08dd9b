//! Orchestrator types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gate::GateStatus;
use crate::session::{SessionError, SessionStatus};

/// Errors from orchestrator commands.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Session not found.
    #[error("session not found: {0}")]
    NotFound(String),

    /// Command not valid in the session's current status.
    #[error("cannot {operation} session {session_id} in status {current}")]
    InvalidState {
        session_id: String,
        current: SessionStatus,
        operation: String,
    },

    /// Registry failure.
    #[error("session registry error: {0}")]
    Registry(String),
}

impl From<SessionError> for OrchestratorError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound(id) => OrchestratorError::NotFound(id),
            SessionError::InvalidState {
                session_id,
                current,
                operation,
            } => OrchestratorError::InvalidState {
                session_id,
                current,
                operation,
            },
            SessionError::Storage(msg) => OrchestratorError::Registry(msg),
        }
    }
}

/// Result of a `start` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    /// Pipeline spawned.
    Started,
    /// Session was already processing (or done processing); nothing spawned.
    AlreadyStarted,
}

/// Session counts by status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCounts {
    pub waiting_input: usize,
    pub processing: usize,
    pub ready: usize,
    pub completed: usize,
    pub playing: usize,
    pub failed: usize,
    pub total: usize,
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorStatus {
    /// Pipelines currently running.
    pub active_pipelines: usize,
    pub sessions: SessionCounts,
    /// Image generation gate usage.
    pub image_gate: GateStatus,
    /// Stages per session.
    pub plan_stages: usize,
}
