//! Mock video generation provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::provider::{GenerationProvider, GenerationRequest, JobOutcome, ProviderError};

/// What an unscripted poll returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DefaultPoll {
    Pending,
    Complete,
}

/// Mock implementation of the GenerationProvider trait.
///
/// - Submissions get sequential ids (`task_1`, `task_2`, ...) unless a
///   result was queued with [`push_submit`](Self::push_submit).
/// - Polls answer from a per-task script, then from the shared queue, then
///   from the default (`Pending`, or `Completed` after [`complete_all`](Self::complete_all)).
///
/// # Example
///
/// ```rust,ignore
/// use keyreel_core::testing::MockGenerationProvider;
///
/// let provider = MockGenerationProvider::new();
/// provider.script_task("task_1", vec![Ok(JobOutcome::Pending), completed("https://cdn/a.mp4")]).await;
///
/// let task_id = provider.submit(&request).await?;
/// assert_eq!(provider.submissions().await.len(), 1);
/// ```
#[derive(Debug)]
pub struct MockGenerationProvider {
    submissions: Arc<RwLock<Vec<GenerationRequest>>>,
    submit_results: Arc<RwLock<VecDeque<Result<String, ProviderError>>>>,
    polls: Arc<RwLock<Vec<String>>>,
    task_scripts: Arc<RwLock<HashMap<String, VecDeque<Result<JobOutcome, ProviderError>>>>>,
    poll_queue: Arc<RwLock<VecDeque<Result<JobOutcome, ProviderError>>>>,
    default_poll: Arc<RwLock<DefaultPoll>>,
    poll_delay: Arc<RwLock<Option<Duration>>>,
    next_task: Arc<RwLock<u64>>,
}

impl Default for MockGenerationProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockGenerationProvider {
    /// Create a new mock provider.
    pub fn new() -> Self {
        Self {
            submissions: Arc::new(RwLock::new(Vec::new())),
            submit_results: Arc::new(RwLock::new(VecDeque::new())),
            polls: Arc::new(RwLock::new(Vec::new())),
            task_scripts: Arc::new(RwLock::new(HashMap::new())),
            poll_queue: Arc::new(RwLock::new(VecDeque::new())),
            default_poll: Arc::new(RwLock::new(DefaultPoll::Pending)),
            poll_delay: Arc::new(RwLock::new(None)),
            next_task: Arc::new(RwLock::new(0)),
        }
    }

    /// URL an auto-completed task reports.
    pub fn result_url_for(task_id: &str) -> String {
        format!("https://mock.provider/videos/{}.mp4", task_id)
    }

    /// Queue the result of the next unscripted submission.
    pub async fn push_submit(&self, result: Result<String, ProviderError>) {
        self.submit_results.write().await.push_back(result);
    }

    /// Queue a poll answer used by any task without its own script.
    pub async fn push_poll(&self, result: Result<JobOutcome, ProviderError>) {
        self.poll_queue.write().await.push_back(result);
    }

    /// Script the poll answers for one task.
    pub async fn script_task(
        &self,
        task_id: &str,
        results: Vec<Result<JobOutcome, ProviderError>>,
    ) {
        self.task_scripts
            .write()
            .await
            .insert(task_id.to_string(), results.into_iter().collect());
    }

    /// Unscripted polls complete immediately.
    pub async fn complete_all(&self) {
        *self.default_poll.write().await = DefaultPoll::Complete;
    }

    /// Delay every poll by `delay`.
    pub async fn set_poll_delay(&self, delay: Duration) {
        *self.poll_delay.write().await = Some(delay);
    }

    /// Requests passed to `submit`, in order.
    pub async fn submissions(&self) -> Vec<GenerationRequest> {
        self.submissions.read().await.clone()
    }

    pub async fn submit_count(&self) -> usize {
        self.submissions.read().await.len()
    }

    /// Task ids passed to `poll`, in order.
    pub async fn polls(&self) -> Vec<String> {
        self.polls.read().await.clone()
    }

    pub async fn poll_count(&self) -> usize {
        self.polls.read().await.len()
    }

    async fn next_poll(&self, task_id: &str) -> Result<JobOutcome, ProviderError> {
        if let Some(script) = self.task_scripts.write().await.get_mut(task_id) {
            if let Some(result) = script.pop_front() {
                return result;
            }
        }
        if let Some(result) = self.poll_queue.write().await.pop_front() {
            return result;
        }
        match *self.default_poll.read().await {
            DefaultPoll::Pending => Ok(JobOutcome::Pending),
            DefaultPoll::Complete => Ok(JobOutcome::Completed {
                url: Self::result_url_for(task_id),
            }),
        }
    }
}

#[async_trait]
impl GenerationProvider for MockGenerationProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        self.submissions.write().await.push(request.clone());

        if let Some(result) = self.submit_results.write().await.pop_front() {
            return result;
        }

        let mut next = self.next_task.write().await;
        *next += 1;
        Ok(format!("task_{}", *next))
    }

    async fn poll(&self, task_id: &str) -> Result<JobOutcome, ProviderError> {
        self.polls.write().await.push(task_id.to_string());

        let delay = *self.poll_delay.read().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.next_poll(task_id).await
    }
}
