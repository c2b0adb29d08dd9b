//! Session API handlers.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use keyreel_core::{OrchestratorError, StartOutcome, WorkflowSession};

use crate::metrics::UPLOADS_TOTAL;
use crate::state::AppState;

/// Multipart field carrying the reference image.
pub const UPLOAD_FIELD: &str = "product_image";

/// Extension used when the client sends none we accept.
const DEFAULT_EXTENSION: &str = "jpg";

// ============================================================================
// Request/Response Types
// ============================================================================

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler error carrying its status code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<OrchestratorError> for ApiError {
    fn from(e: OrchestratorError) -> Self {
        let status = match &e {
            OrchestratorError::NotFound(_) => StatusCode::NOT_FOUND,
            OrchestratorError::InvalidState { .. } => StatusCode::CONFLICT,
            OrchestratorError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// Response for listing sessions
#[derive(Debug, Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<WorkflowSession>,
    pub total: usize,
}

/// Response after a reference upload
#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub status: StartOutcome,
    pub session_id: String,
    /// Stored reference path. Absent when the upload was not needed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_image: Option<String>,
}

/// Response of the one-shot upload endpoint
#[derive(Debug, Serialize)]
pub struct PlaylistResponse {
    pub status: StartOutcome,
    pub session_id: String,
    pub ref_image: String,
    pub public_base_url: Option<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Create a new session waiting for its reference image
pub async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<WorkflowSession>), ApiError> {
    let session = state.orchestrator().create_session()?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List all sessions, newest first
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ListSessionsResponse>, ApiError> {
    let sessions = state.orchestrator().list_sessions()?;
    Ok(Json(ListSessionsResponse {
        total: sessions.len(),
        sessions,
    }))
}

/// Get a session by id
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowSession>, ApiError> {
    Ok(Json(state.orchestrator().get_session(&id)?))
}

/// Upload the reference image for a session and start its workflow
pub async fn upload_reference(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<StartResponse>), ApiError> {
    // Unknown ids are rejected before anything is written.
    state.orchestrator().get_session(&id)?;

    let reference = store_upload(&state, &id, multipart).await?;
    let status = match state.orchestrator().start(&id, reference.clone()) {
        Ok(status) => status,
        Err(e) => {
            discard_upload(&state, &id, &reference).await;
            return Err(e.into());
        }
    };

    let ref_image = match status {
        StartOutcome::Started => Some(reference.display().to_string()),
        StartOutcome::AlreadyStarted => {
            discard_upload(&state, &id, &reference).await;
            None
        }
    };

    Ok((
        StatusCode::ACCEPTED,
        Json(StartResponse {
            status,
            session_id: id,
            ref_image,
        }),
    ))
}

/// Send the play command to a READY session
pub async fn play(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowSession>, ApiError> {
    Ok(Json(state.orchestrator().mark_playing(&id)?))
}

/// One-shot flow: create a session, store the upload, and start it
pub async fn update_playlist(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<PlaylistResponse>), ApiError> {
    let session = state.orchestrator().create_session()?;
    let reference = store_upload(&state, &session.id, multipart).await?;
    let status = state.orchestrator().start(&session.id, reference.clone())?;

    Ok((
        StatusCode::ACCEPTED,
        Json(PlaylistResponse {
            status,
            session_id: session.id,
            ref_image: reference.display().to_string(),
            public_base_url: state.config().public.base_url.clone(),
        }),
    ))
}

// ============================================================================
// Upload storage
// ============================================================================

/// Save the `product_image` field under the uploads directory.
async fn store_upload(
    state: &AppState,
    session_id: &str,
    mut multipart: Multipart,
) -> Result<PathBuf, ApiError> {
    let mut image: Option<(Option<String>, Vec<u8>)> = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(ApiError::bad_request(format!(
                    "Invalid multipart body: {}",
                    e
                )));
            }
        };
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(|s| s.to_string());
        match field.bytes().await {
            Ok(bytes) => image = Some((file_name, bytes.to_vec())),
            Err(e) => {
                UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
                return Err(ApiError::bad_request(format!("Failed to read file: {}", e)));
            }
        }
    }

    let (file_name, bytes) = match image {
        Some((name, bytes)) if !bytes.is_empty() => (name, bytes),
        Some(_) => {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(ApiError::bad_request(format!("{} is empty", UPLOAD_FIELD)));
        }
        None => {
            UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(ApiError::bad_request(format!(
                "Missing multipart field {}",
                UPLOAD_FIELD
            )));
        }
    };

    let uploads_dir = &state.storage().uploads_dir;
    tokio::fs::create_dir_all(uploads_dir)
        .await
        .map_err(|e| ApiError::internal(format!("Failed to create upload dir: {}", e)))?;

    let path = uploads_dir.join(upload_file_name(
        session_id,
        Utc::now().timestamp(),
        file_name.as_deref(),
    ));
    if let Err(e) = tokio::fs::write(&path, &bytes).await {
        warn!(session_id = %session_id, error = %e, "Failed to store upload");
        return Err(ApiError::internal(format!("Failed to store upload: {}", e)));
    }

    UPLOADS_TOTAL.with_label_values(&["stored"]).inc();
    info!(
        session_id = %session_id,
        path = %path.display(),
        size_kb = bytes.len() / 1024,
        "Reference image stored"
    );
    Ok(path)
}

/// Remove an upload the session did not take. A same-second upload shares
/// its name with the accepted one, which is kept.
async fn discard_upload(state: &AppState, session_id: &str, path: &std::path::Path) {
    let in_use = state
        .orchestrator()
        .get_session(session_id)
        .ok()
        .and_then(|s| s.reference_asset_path)
        .is_some_and(|accepted| accepted.as_path() == path);
    if in_use {
        return;
    }

    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            UPLOADS_TOTAL.with_label_values(&["discarded"]).inc();
            info!(session_id = %session_id, path = %path.display(), "Unused upload removed");
        }
        Err(e) => warn!(session_id = %session_id, error = %e, "Failed to remove unused upload"),
    }
}

/// `ref_<session>_<unix>.<ext>`, keeping a short alphanumeric extension.
pub fn upload_file_name(session_id: &str, unix_secs: i64, original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| std::path::Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| DEFAULT_EXTENSION.to_string());
    format!("ref_{}_{}.{}", session_id, unix_secs, extension)
}
