//! Workflow orchestrator implementation.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, warn};

use crate::assembler::Assembler;
use crate::config::{Config, StorageConfig};
use crate::gate::ConcurrencyGate;
use crate::metrics::{SESSIONS_FINISHED, SESSIONS_STARTED, SESSION_DURATION};
use crate::plan::{ClipRecord, StagePlan};
use crate::provider::{GenerationProvider, ImageGenerator, JobPoller, PublicUrlResolver};
use crate::session::{SessionError, SessionRegistry, SessionStatus, StatusUpdate, WorkflowSession};
use crate::stage::{StageContext, StageRunner};

use super::config::WorkflowConfig;
use super::types::{OrchestratorError, OrchestratorStatus, SessionCounts, StartOutcome};

/// Mount under which the storage root is served.
const STATIC_MOUNT: &str = "static";

struct Inner {
    config: WorkflowConfig,
    storage: StorageConfig,
    registry: Arc<dyn SessionRegistry>,
    runner: StageRunner,
    assembler: Arc<dyn Assembler>,
    urls: PublicUrlResolver,
    active_pipelines: AtomicUsize,
}

/// Decrements the active pipeline count, including on unwind.
struct ActivePipeline<'a>(&'a AtomicUsize);

impl<'a> ActivePipeline<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for ActivePipeline<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The workflow orchestrator. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WorkflowOrchestrator {
    inner: Arc<Inner>,
}

impl WorkflowOrchestrator {
    /// Build an orchestrator and its stage runner from `config`.
    pub fn new(
        config: &Config,
        registry: Arc<dyn SessionRegistry>,
        provider: Arc<dyn GenerationProvider>,
        image_generator: Arc<dyn ImageGenerator>,
        assembler: Arc<dyn Assembler>,
    ) -> Self {
        let urls = PublicUrlResolver::new(
            &config.public,
            config.storage.static_root.clone(),
            STATIC_MOUNT,
        );
        let runner = StageRunner::new(
            Arc::new(config.plan.clone()),
            provider,
            image_generator,
            Arc::clone(&assembler),
            ConcurrencyGate::new(config.image_provider.max_concurrent),
            JobPoller::from_config(&config.video_provider),
            urls.clone(),
        );

        Self {
            inner: Arc::new(Inner {
                config: config.workflow.clone(),
                storage: config.storage.clone(),
                registry,
                runner,
                assembler,
                urls,
                active_pipelines: AtomicUsize::new(0),
            }),
        }
    }

    pub fn plan(&self) -> &StagePlan {
        self.inner.runner.plan()
    }

    pub fn storage(&self) -> &StorageConfig {
        &self.inner.storage
    }

    /// Register a new session waiting for its reference image.
    pub fn create_session(&self) -> Result<WorkflowSession, OrchestratorError> {
        let session = self.inner.registry.create()?;
        info!(session_id = %session.id, "Session created");
        Ok(session)
    }

    pub fn get_session(&self, id: &str) -> Result<WorkflowSession, OrchestratorError> {
        self.inner
            .registry
            .get(id)?
            .ok_or_else(|| OrchestratorError::NotFound(id.to_string()))
    }

    pub fn list_sessions(&self) -> Result<Vec<WorkflowSession>, OrchestratorError> {
        Ok(self.inner.registry.list()?)
    }

    /// Attach `reference` and spawn the pipeline.
    ///
    /// PROCESSING and READY sessions return [`StartOutcome::AlreadyStarted`]
    /// and spawn nothing. Terminal sessions are rejected.
    pub fn start(
        &self,
        session_id: &str,
        reference: impl Into<PathBuf>,
    ) -> Result<StartOutcome, OrchestratorError> {
        let reference = reference.into();
        if self.claim(session_id, &reference)? == StartOutcome::AlreadyStarted {
            return Ok(StartOutcome::AlreadyStarted);
        }

        let this = self.clone();
        let id = session_id.to_string();
        let pipeline = tokio::spawn(async move {
            this.run_pipeline(&id, &reference).await;
        });

        let this = self.clone();
        let id = session_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = pipeline.await {
                if e.is_panic() {
                    error!(session_id = %id, "Pipeline task panicked");
                    this.finish_failed(&id, "pipeline task died unexpectedly");
                } else {
                    warn!(session_id = %id, error = %e, "Pipeline task cancelled");
                    this.finish_failed(&id, "pipeline task was cancelled");
                }
            }
        });

        Ok(StartOutcome::Started)
    }

    /// Like [`start`](Self::start), but runs the pipeline on the caller's task
    /// and returns the final session.
    pub async fn execute(
        &self,
        session_id: &str,
        reference: impl Into<PathBuf>,
    ) -> Result<WorkflowSession, OrchestratorError> {
        let reference = reference.into();
        if self.claim(session_id, &reference)? == StartOutcome::Started {
            self.run_pipeline(session_id, &reference).await;
        }
        self.get_session(session_id)
    }

    /// External play command. Valid only on READY sessions.
    pub fn mark_playing(&self, session_id: &str) -> Result<WorkflowSession, OrchestratorError> {
        let updated = self.inner.registry.compare_and_swap_status(
            session_id,
            SessionStatus::Ready,
            StatusUpdate::to(SessionStatus::Playing),
        );

        match updated {
            Ok(session) => {
                info!(session_id = %session_id, "Playback started");
                Ok(session)
            }
            Err(SessionError::InvalidState { current, .. }) => {
                Err(OrchestratorError::InvalidState {
                    session_id: session_id.to_string(),
                    current,
                    operation: "play".to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn status(&self) -> Result<OrchestratorStatus, OrchestratorError> {
        let registry = &self.inner.registry;
        let sessions = SessionCounts {
            total: registry.count(None)?,
            waiting_input: registry.count(Some(SessionStatus::WaitingInput))?,
            processing: registry.count(Some(SessionStatus::Processing))?,
            ready: registry.count(Some(SessionStatus::Ready))?,
            completed: registry.count(Some(SessionStatus::Completed))?,
            playing: registry.count(Some(SessionStatus::Playing))?,
            failed: registry.count(Some(SessionStatus::Failed))?,
        };

        Ok(OrchestratorStatus {
            active_pipelines: self.inner.active_pipelines.load(Ordering::SeqCst),
            sessions,
            image_gate: self.inner.runner.gate().status(),
            plan_stages: self.plan().len(),
        })
    }

    /// Stop admitting image calls. Pipelines still running skip their
    /// remaining keyframe stages and fall back to the original upload.
    pub fn shutdown(&self) {
        info!(
            active_pipelines = self.inner.active_pipelines.load(Ordering::SeqCst),
            "Closing image gate"
        );
        self.inner.runner.gate().close();
    }

    /// WAITING_INPUT -> PROCESSING. The registry CAS is the duplicate-start guard.
    fn claim(&self, session_id: &str, reference: &Path) -> Result<StartOutcome, OrchestratorError> {
        let claimed = self.inner.registry.compare_and_swap_status(
            session_id,
            SessionStatus::WaitingInput,
            StatusUpdate::to(SessionStatus::Processing).with_reference(reference),
        );

        match claimed {
            Ok(_) => {
                SESSIONS_STARTED.inc();
                info!(
                    session_id = %session_id,
                    reference = %reference.display(),
                    "Session processing started"
                );
                Ok(StartOutcome::Started)
            }
            Err(SessionError::InvalidState { current, .. }) if current.is_terminal() => {
                Err(OrchestratorError::InvalidState {
                    session_id: session_id.to_string(),
                    current,
                    operation: "start".to_string(),
                })
            }
            Err(SessionError::InvalidState { current, .. }) => {
                info!(session_id = %session_id, status = %current, "Session already started");
                Ok(StartOutcome::AlreadyStarted)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Run every stage, assemble, and record the terminal status.
    async fn run_pipeline(&self, session_id: &str, reference: &Path) {
        let _active = ActivePipeline::enter(&self.inner.active_pipelines);
        let start = Instant::now();
        let plan = self.inner.runner.plan();
        let clip_dir = self.inner.storage.session_temp_dir(session_id);
        let mut ctx = StageContext::new(session_id, reference, &clip_dir);

        let mut clips: Vec<ClipRecord> = Vec::new();
        for (stage_index, spec) in plan.stages.iter().enumerate() {
            let outcome = self.inner.runner.run(&mut ctx, stage_index, spec).await;
            if let Some(clip) = outcome.clip() {
                clips.push(clip.clone());
            }
        }

        if clips.is_empty() {
            warn!(session_id = %session_id, stages = plan.len(), "No clip produced");
            self.finish_failed(session_id, "no clip produced");
        } else {
            let output = self.inner.storage.output_path(session_id);
            match self.inner.assembler.assemble(&clips, &output).await {
                Ok(path) => self.finish_success(session_id, &path, clips.len()),
                Err(e) => {
                    error!(session_id = %session_id, error = %e, "Assembly failed");
                    self.finish_failed(session_id, &format!("assembly failed: {}", e));
                }
            }
        }

        if self.inner.config.cleanup_temp {
            remove_clip_dir(session_id, &clip_dir).await;
        }

        SESSION_DURATION.observe(start.elapsed().as_secs_f64());
    }

    fn finish_success(&self, session_id: &str, output: &Path, clip_count: usize) {
        let status = if self.inner.config.await_playback {
            SessionStatus::Ready
        } else {
            SessionStatus::Completed
        };
        let output_ref = self.inner.urls.artifact_ref(output);

        match self.inner.registry.compare_and_swap_status(
            session_id,
            SessionStatus::Processing,
            StatusUpdate::finished(status, &output_ref, clip_count),
        ) {
            Ok(_) => {
                SESSIONS_FINISHED.with_label_values(&[status.as_str()]).inc();
                info!(
                    session_id = %session_id,
                    status = %status,
                    clip_count,
                    output = %output_ref,
                    "Session finished"
                );
            }
            Err(e) => error!(session_id = %session_id, error = %e, "Failed to record session result"),
        }
    }

    fn finish_failed(&self, session_id: &str, reason: &str) {
        match self.inner.registry.compare_and_swap_status(
            session_id,
            SessionStatus::Processing,
            StatusUpdate::failed(reason),
        ) {
            Ok(_) => {
                SESSIONS_FINISHED
                    .with_label_values(&[SessionStatus::Failed.as_str()])
                    .inc();
                warn!(session_id = %session_id, reason = %reason, "Session failed");
            }
            Err(e) => error!(session_id = %session_id, error = %e, "Failed to record session failure"),
        }
    }
}

async fn remove_clip_dir(session_id: &str, dir: &Path) {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(session_id = %session_id, error = %e, "Failed to remove clip directory"),
    }
}
