//! Bounded polling of provider jobs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::metrics::{POLL_ATTEMPTS, POLL_VERDICTS};

use super::{GenerationProvider, JobOutcome, VideoProviderConfig};

/// Why a polled job produced no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollFailure {
    #[error("provider reported failure: {reason}")]
    Failed { reason: String },

    #[error("job still pending after {attempts} poll attempts")]
    Timeout { attempts: u32 },
}

/// Polls a submitted job until it is terminal or the budget runs out.
///
/// The first poll is issued immediately, later ones are spaced by
/// `interval`, and at most `max_attempts` polls are made. The whole loop is
/// also capped at `max_attempts * interval` so a hanging status request
/// cannot stretch it.
#[derive(Debug, Clone)]
pub struct JobPoller {
    interval: Duration,
    max_attempts: u32,
}

impl JobPoller {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn from_config(config: &VideoProviderConfig) -> Self {
        Self::new(config.poll_interval(), config.max_poll_attempts)
    }

    /// Upper bound on the time spent in [`JobPoller::wait`].
    pub fn budget(&self) -> Duration {
        self.interval * self.max_attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait for `task_id` to finish. Returns the result URL on success.
    pub async fn wait(
        &self,
        provider: &dyn GenerationProvider,
        task_id: &str,
    ) -> Result<String, PollFailure> {
        let attempts = AtomicU32::new(0);
        let verdict =
            match tokio::time::timeout(self.budget(), self.poll_loop(provider, task_id, &attempts))
                .await
            {
                Ok(verdict) => verdict,
                Err(_) => Err(PollFailure::Timeout {
                    attempts: attempts.load(Ordering::SeqCst),
                }),
            };

        let label = match &verdict {
            Ok(_) => "completed",
            Err(PollFailure::Failed { .. }) => "failed",
            Err(PollFailure::Timeout { .. }) => "timeout",
        };
        POLL_VERDICTS.with_label_values(&[label]).inc();

        if let Err(PollFailure::Timeout { attempts }) = &verdict {
            warn!(task_id = %task_id, attempts, "Job polling budget exhausted");
        }
        verdict
    }

    async fn poll_loop(
        &self,
        provider: &dyn GenerationProvider,
        task_id: &str,
        attempts: &AtomicU32,
    ) -> Result<String, PollFailure> {
        for attempt in 1..=self.max_attempts {
            if attempt > 1 {
                tokio::time::sleep(self.interval).await;
            }
            attempts.store(attempt, Ordering::SeqCst);

            let outcome = match provider.poll(task_id).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    POLL_ATTEMPTS.with_label_values(&[e.kind()]).inc();
                    warn!(task_id = %task_id, attempt, error = %e, "Poll failed, treating as pending");
                    continue;
                }
            };
            POLL_ATTEMPTS.with_label_values(&[outcome.label()]).inc();

            match outcome {
                JobOutcome::Completed { url } => {
                    info!(task_id = %task_id, attempt, "Job completed");
                    return Ok(url);
                }
                JobOutcome::Failed { reason } => {
                    warn!(task_id = %task_id, attempt, reason = %reason, "Job failed");
                    return Err(PollFailure::Failed { reason });
                }
                JobOutcome::Pending => {
                    debug!(
                        task_id = %task_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "Job still pending"
                    );
                }
            }
        }

        Err(PollFailure::Timeout {
            attempts: self.max_attempts,
        })
    }
}
