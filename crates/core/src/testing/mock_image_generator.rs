//! Mock image generator for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::provider::{ImageGenerator, ProviderError};

/// Mock implementation of the ImageGenerator trait.
///
/// Unqueued calls succeed with `generated/keyframe_<n>.png`. The mock also
/// tracks how many calls overlap, which is how gate tests observe
/// concurrency.
#[derive(Debug)]
pub struct MockImageGenerator {
    calls: Arc<RwLock<Vec<(String, PathBuf)>>>,
    results: Arc<RwLock<VecDeque<Result<Option<PathBuf>, ProviderError>>>>,
    delay: Arc<RwLock<Option<Duration>>>,
    in_flight: Arc<AtomicUsize>,
    peak_in_flight: Arc<AtomicUsize>,
    generated: Arc<AtomicUsize>,
}

impl Default for MockImageGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            results: Arc::new(RwLock::new(VecDeque::new())),
            delay: Arc::new(RwLock::new(None)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            peak_in_flight: Arc::new(AtomicUsize::new(0)),
            generated: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue the result of the next call.
    pub async fn push_result(&self, result: Result<Option<PathBuf>, ProviderError>) {
        self.results.write().await.push_back(result);
    }

    /// Make every call take `delay`.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = Some(delay);
    }

    /// `(prompt, reference)` pairs, in call order.
    pub async fn calls(&self) -> Vec<(String, PathBuf)> {
        self.calls.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.calls.read().await.len()
    }

    /// Highest number of overlapping calls seen.
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageGenerator for MockImageGenerator {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(
        &self,
        prompt: &str,
        reference: &Path,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);

        self.calls
            .write()
            .await
            .push((prompt.to_string(), reference.to_path_buf()));

        let delay = *self.delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let result = match self.results.write().await.pop_front() {
            Some(result) => result,
            None => {
                let n = self.generated.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Some(PathBuf::from(format!("generated/keyframe_{}.png", n))))
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
