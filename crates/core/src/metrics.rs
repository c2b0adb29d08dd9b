//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sessions (started, finished by status)
//! - Stages (outcomes, failure reasons)
//! - Provider jobs (requests, durations, poll attempts)
//! - Image gate waits and final assembly

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Session Metrics
// =============================================================================

/// Sessions that entered PROCESSING.
pub static SESSIONS_STARTED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "keyreel_sessions_started_total",
        "Total sessions that started processing",
    )
    .unwrap()
});

/// Sessions that left PROCESSING, by resulting status.
pub static SESSIONS_FINISHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyreel_sessions_finished_total",
            "Total sessions finished by resulting status",
        ),
        &["status"], // "READY", "COMPLETED", "FAILED"
    )
    .unwrap()
});

/// End-to-end pipeline duration.
pub static SESSION_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "keyreel_session_duration_seconds",
            "Duration of a session pipeline from start to final status",
        )
        .buckets(vec![10.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0, 3600.0]),
    )
    .unwrap()
});

// =============================================================================
// Stage Metrics
// =============================================================================

/// Stage outcomes by stage kind.
pub static STAGE_OUTCOMES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_stage_outcomes_total", "Total stage outcomes"),
        &["kind", "result"], // result: "produced", "skipped"
    )
    .unwrap()
});

/// Reasons stages were skipped.
pub static STAGE_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyreel_stage_failures_total",
            "Total stage failures by reason",
        ),
        &["reason"], // "submission", "provider_failed", "timeout", "download", "image"
    )
    .unwrap()
});

// =============================================================================
// Provider Metrics
// =============================================================================

/// Provider request duration.
pub static PROVIDER_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "keyreel_provider_request_duration_seconds",
            "Duration of external provider calls",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["provider", "operation"],
    )
    .unwrap()
});

/// Provider requests total.
pub static PROVIDER_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "keyreel_provider_requests_total",
            "Total external provider requests",
        ),
        &["provider", "operation", "status"], // status: "success", "error"
    )
    .unwrap()
});

/// Poll attempts by what the attempt observed.
pub static POLL_ATTEMPTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_poll_attempts_total", "Total job poll attempts"),
        &["outcome"], // "pending", "completed", "failed", or the poll error kind
    )
    .unwrap()
});

/// Finished polling loops by verdict.
pub static POLL_VERDICTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_poll_verdicts_total", "Total polling loops by verdict"),
        &["verdict"], // "completed", "failed", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Gate and Assembly Metrics
// =============================================================================

/// Time spent waiting for an image gate permit.
pub static GATE_WAIT_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "keyreel_gate_wait_seconds",
            "Time spent waiting for an image generation slot",
        )
        .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
    )
    .unwrap()
});

/// Assembly runs by result.
pub static ASSEMBLIES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_assemblies_total", "Total assembly runs"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

/// Assembly duration.
pub static ASSEMBLY_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new(
            "keyreel_assembly_duration_seconds",
            "Duration of final clip assembly",
        )
        .buckets(vec![0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0, 600.0]),
    )
    .unwrap()
});

/// Clips downloaded by result.
pub static CLIP_DOWNLOADS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("keyreel_clip_downloads_total", "Total clip downloads"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Record one provider round trip.
pub fn record_provider_call(provider: &str, operation: &str, ok: bool, elapsed_secs: f64) {
    PROVIDER_REQUEST_DURATION
        .with_label_values(&[provider, operation])
        .observe(elapsed_secs);
    PROVIDER_REQUESTS
        .with_label_values(&[provider, operation, if ok { "success" } else { "error" }])
        .inc();
}

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sessions
        Box::new(SESSIONS_STARTED.clone()),
        Box::new(SESSIONS_FINISHED.clone()),
        Box::new(SESSION_DURATION.clone()),
        // Stages
        Box::new(STAGE_OUTCOMES.clone()),
        Box::new(STAGE_FAILURES.clone()),
        // Providers
        Box::new(PROVIDER_REQUEST_DURATION.clone()),
        Box::new(PROVIDER_REQUESTS.clone()),
        Box::new(POLL_ATTEMPTS.clone()),
        Box::new(POLL_VERDICTS.clone()),
        // Gate and assembly
        Box::new(GATE_WAIT_DURATION.clone()),
        Box::new(ASSEMBLIES_TOTAL.clone()),
        Box::new(ASSEMBLY_DURATION.clone()),
        Box::new(CLIP_DOWNLOADS.clone()),
    ]
}
