//! In-memory session registry.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;

use super::{SessionError, SessionRegistry, SessionStatus, StatusUpdate, WorkflowSession};

/// `RwLock<HashMap>` registry. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct InMemorySessionRegistry {
    sessions: RwLock<HashMap<String, WorkflowSession>>,
}

impl InMemorySessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> SessionError {
    SessionError::Storage("session registry lock poisoned".to_string())
}

impl SessionRegistry for InMemorySessionRegistry {
    fn create(&self) -> Result<WorkflowSession, SessionError> {
        let session = WorkflowSession::new();
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get(&self, id: &str) -> Result<Option<WorkflowSession>, SessionError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions.get(id).cloned())
    }

    fn put(&self, session: WorkflowSession) -> Result<(), SessionError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    fn list(&self) -> Result<Vec<WorkflowSession>, SessionError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        let mut all: Vec<_> = sessions.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(all)
    }

    fn count(&self, status: Option<SessionStatus>) -> Result<usize, SessionError> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(match status {
            Some(status) => sessions.values().filter(|s| s.status == status).count(),
            None => sessions.len(),
        })
    }

    fn compare_and_swap_status(
        &self,
        id: &str,
        expected: SessionStatus,
        update: StatusUpdate,
    ) -> Result<WorkflowSession, SessionError> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let session = sessions
            .get_mut(id)
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;

        if session.status != expected || !session.status.can_transition_to(update.status) {
            return Err(SessionError::InvalidState {
                session_id: id.to_string(),
                current: session.status,
                operation: format!("move to {}", update.status),
            });
        }

        session.status = update.status;
        if session.reference_asset_path.is_none() {
            session.reference_asset_path = update.reference_asset_path;
        }
        if let Some(output) = update.output_artifact_ref {
            session.output_artifact_ref = Some(output);
        }
        if let Some(reason) = update.error_reason {
            session.error_reason = Some(reason);
        }
        if let Some(clips) = update.clip_count {
            session.clip_count = clips;
        }
        session.updated_at = Utc::now();

        Ok(session.clone())
    }
}
