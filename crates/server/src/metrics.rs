//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the keyreel server:
//! - HTTP request metrics (latency, counts)
//! - Uploads received
//! - Session and gate status (collected dynamically)

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};

use keyreel_core::SessionStatus;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "keyreel_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "keyreel_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Reference uploads by result.
pub static UPLOADS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_uploads_total", "Reference image uploads"),
        &["result"], // "stored", "rejected", "discarded"
    )
    .unwrap()
});

// =============================================================================
// Session Metrics (collected dynamically)
// =============================================================================

/// Sessions by current status.
pub static SESSIONS_BY_STATUS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("keyreel_sessions_by_status", "Current session count by status"),
        &["status"],
    )
    .unwrap()
});

/// Pipelines currently running.
pub static PIPELINES_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "keyreel_pipelines_active",
        "Number of session pipelines currently running",
    )
    .unwrap()
});

/// Image gate slots in use.
pub static IMAGE_GATE_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "keyreel_image_gate_active",
        "Image generation calls currently holding a gate slot",
    )
    .unwrap()
});

/// Image gate waiters.
pub static IMAGE_GATE_WAITING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "keyreel_image_gate_waiting",
        "Image generation calls waiting for a gate slot",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();
    registry.register(Box::new(UPLOADS_TOTAL.clone())).unwrap();

    // Sessions
    registry
        .register(Box::new(SESSIONS_BY_STATUS.clone()))
        .unwrap();
    registry
        .register(Box::new(PIPELINES_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(IMAGE_GATE_ACTIVE.clone()))
        .unwrap();
    registry
        .register(Box::new(IMAGE_GATE_WAITING.clone()))
        .unwrap();

    // Core metrics (sessions, stages, providers, assembly)
    for metric in keyreel_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Refresh gauges from the orchestrator before encoding.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let status = match state.orchestrator().status() {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read orchestrator status for metrics");
            return;
        }
    };

    PIPELINES_ACTIVE.set(status.active_pipelines as i64);
    IMAGE_GATE_ACTIVE.set(status.image_gate.active as i64);
    IMAGE_GATE_WAITING.set(status.image_gate.waiting as i64);

    let counts = &status.sessions;
    for session_status in SessionStatus::ALL {
        let count = match session_status {
            SessionStatus::WaitingInput => counts.waiting_input,
            SessionStatus::Processing => counts.processing,
            SessionStatus::Ready => counts.ready,
            SessionStatus::Completed => counts.completed,
            SessionStatus::Playing => counts.playing,
            SessionStatus::Failed => counts.failed,
        };
        SESSIONS_BY_STATUS
            .with_label_values(&[session_status.as_str()])
            .set(count as i64);
    }
}

/// Normalize a path for metric labels (replace IDs with placeholders).
pub fn normalize_path(path: &str) -> String {
    static UUID: Lazy<regex_lite::Regex> = Lazy::new(|| {
        regex_lite::Regex::new(
            r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}",
        )
        .unwrap()
    });
    static NUMERIC: Lazy<regex_lite::Regex> =
        Lazy::new(|| regex_lite::Regex::new(r"/\d+(/|$)").unwrap());

    // Static files would otherwise produce one label set per asset.
    if path.starts_with("/static/") {
        return "/static/{file}".to_string();
    }

    let result = UUID.replace_all(path, "{id}");
    let result = NUMERIC.replace_all(&result, "/{id}$1");
    result.to_string()
}
