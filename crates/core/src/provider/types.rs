use serde::{Deserialize, Serialize};

/// One submission to a video provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Fully rendered prompt (subject included).
    pub prompt: String,
    /// Publicly resolvable URL of the reference image.
    pub image_url: String,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_url: image_url.into(),
        }
    }
}

/// Result of one status round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Not terminal yet. Unknown provider statuses land here too.
    Pending,
    /// Terminal success with the rendered artifact URL.
    Completed { url: String },
    /// Terminal failure reported by the provider.
    Failed { reason: String },
}

impl JobOutcome {
    /// Metric label for a poll that observed this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::Pending => "pending",
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::Failed { .. } => "failed",
        }
    }
}
