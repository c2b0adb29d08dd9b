//! Session registry trait and update types.

use std::path::PathBuf;
use thiserror::Error;

use super::{SessionStatus, WorkflowSession};

/// Error type for registry operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),

    #[error("Cannot {operation} session {session_id}: current status is {current}")]
    InvalidState {
        session_id: String,
        current: SessionStatus,
        operation: String,
    },

    #[error("Session storage error: {0}")]
    Storage(String),
}

/// A status transition plus the fields that travel with it.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusUpdate {
    pub status: SessionStatus,
    pub reference_asset_path: Option<PathBuf>,
    pub output_artifact_ref: Option<String>,
    pub error_reason: Option<String>,
    pub clip_count: Option<usize>,
}

impl StatusUpdate {
    /// Plain move to `status`.
    pub fn to(status: SessionStatus) -> Self {
        Self {
            status,
            reference_asset_path: None,
            output_artifact_ref: None,
            error_reason: None,
            clip_count: None,
        }
    }

    /// Move to `FAILED` with a reason.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            error_reason: Some(reason.into()),
            ..Self::to(SessionStatus::Failed)
        }
    }

    /// Successful end of processing.
    pub fn finished(status: SessionStatus, output_ref: impl Into<String>, clips: usize) -> Self {
        Self {
            output_artifact_ref: Some(output_ref.into()),
            clip_count: Some(clips),
            ..Self::to(status)
        }
    }

    pub fn with_reference(mut self, path: impl Into<PathBuf>) -> Self {
        self.reference_asset_path = Some(path.into());
        self
    }
}

/// Process-wide session storage.
///
/// Implementations must make `compare_and_swap_status` atomic: the status
/// check and the write happen under one critical section, so two concurrent
/// `start` calls cannot both leave `WAITING_INPUT`.
pub trait SessionRegistry: Send + Sync {
    /// Register a new session in `WAITING_INPUT`.
    fn create(&self) -> Result<WorkflowSession, SessionError>;

    /// Get a session by ID.
    fn get(&self, id: &str) -> Result<Option<WorkflowSession>, SessionError>;

    /// Insert or replace a session.
    fn put(&self, session: WorkflowSession) -> Result<(), SessionError>;

    /// All sessions, newest first.
    fn list(&self) -> Result<Vec<WorkflowSession>, SessionError>;

    /// Number of sessions currently in `status` (all sessions when `None`).
    fn count(&self, status: Option<SessionStatus>) -> Result<usize, SessionError>;

    /// Apply `update` only if the session is currently in `expected` and the
    /// edge is legal. Returns the updated session.
    fn compare_and_swap_status(
        &self,
        id: &str,
        expected: SessionStatus,
        update: StatusUpdate,
    ) -> Result<WorkflowSession, SessionError>;
}
