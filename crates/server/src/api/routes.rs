use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use super::{handlers, middleware::metrics_middleware, orchestrator, sessions};
use crate::state::AppState;

/// Largest accepted reference upload.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn create_router(state: Arc<AppState>) -> Router {
    let static_root = state.storage().static_root.clone();

    // API routes
    let api_routes = Router::new()
        // Health and config
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        // Sessions
        .route(
            "/sessions",
            post(sessions::create_session).get(sessions::list_sessions),
        )
        .route("/sessions/{id}", get(sessions::get_session))
        .route("/sessions/{id}/reference", post(sessions::upload_reference))
        .route("/sessions/{id}/play", post(sessions::play))
        // One-shot upload
        .route("/update_playlist", post(sessions::update_playlist))
        // Orchestrator
        .route("/orchestrator/status", get(orchestrator::get_status))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(Arc::clone(&state));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .nest_service("/static", ServeDir::new(static_root))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
