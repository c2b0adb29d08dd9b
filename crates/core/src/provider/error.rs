//! Provider error types.

use thiserror::Error;

/// Errors from provider round trips.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Submission rejected or answered without a task id. Never polled.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Poll hiccup (connection, non-success status, unreadable body).
    #[error("Transient provider error: {0}")]
    Transient(String),

    /// Response shape not understood.
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// Image generation call failed.
    #[error("Image generation failed: {0}")]
    Generation(String),

    /// Client could not be built.
    #[error("Provider configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ProviderError {
    /// Map a reqwest failure into a transient error with a short cause.
    pub(crate) fn transient(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            ProviderError::Transient("request timed out".to_string())
        } else if e.is_connect() {
            ProviderError::Transient(format!("connection failed: {}", e))
        } else {
            ProviderError::Transient(e.to_string())
        }
    }

    /// Short label for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::Submission(_) => "submission",
            ProviderError::Transient(_) => "transient",
            ProviderError::Parse(_) => "parse",
            ProviderError::Generation(_) => "generation",
            ProviderError::Config(_) => "config",
            ProviderError::Io(_) => "io",
        }
    }
}
