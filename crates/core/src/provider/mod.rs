//! External generation providers.
//!
//! Video rendering is job based: a request is submitted, then a status
//! endpoint is polled until the job reaches a terminal state. The
//! [`GenerationProvider`] trait covers one submit and one poll round trip;
//! [`JobPoller`] owns the bounded retry loop around `poll`.
//!
//! Keyframe derivation goes through the synchronous [`ImageGenerator`] call
//! path and is gated process-wide by the orchestrator.

mod apimart;
mod config;
mod error;
mod gemini;
mod poller;
mod public_url;
mod traits;
mod types;

pub use apimart::ApimartClient;
pub use config::{ImageProviderConfig, VideoProviderConfig};
pub use error::ProviderError;
pub use gemini::GeminiImageClient;
pub use poller::{JobPoller, PollFailure};
pub use public_url::PublicUrlResolver;
pub use traits::{GenerationProvider, ImageGenerator};
pub use types::{GenerationRequest, JobOutcome};
