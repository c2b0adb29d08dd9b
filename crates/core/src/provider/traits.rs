//! Provider traits.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::{GenerationRequest, JobOutcome, ProviderError};

/// Job-based generation API: one call per round trip.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name, used in logs and metrics.
    fn name(&self) -> &str;

    /// Submit a job. Returns the provider task id.
    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError>;

    /// Query the job once.
    async fn poll(&self, task_id: &str) -> Result<JobOutcome, ProviderError>;
}

/// Derives a keyframe image from a prompt and a local reference image.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Returns the path of the written image, or `None` when the provider
    /// answered without image data.
    async fn generate(
        &self,
        prompt: &str,
        reference: &Path,
    ) -> Result<Option<PathBuf>, ProviderError>;
}
