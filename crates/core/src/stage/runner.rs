//! Stage runner: one plan stage against the providers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::assembler::Assembler;
use crate::gate::ConcurrencyGate;
use crate::metrics::{STAGE_FAILURES, STAGE_OUTCOMES};
use crate::plan::{ClipRecord, StageKind, StagePlan, StageSpec};
use crate::provider::{
    GenerationProvider, GenerationRequest, ImageGenerator, JobPoller, PollFailure,
    PublicUrlResolver,
};

use super::{StageArtifact, StageContext, StageFailure, StageOutcome};

/// Runs stages of a [`StagePlan`]. Shared by every session.
pub struct StageRunner {
    plan: Arc<StagePlan>,
    provider: Arc<dyn GenerationProvider>,
    image_generator: Arc<dyn ImageGenerator>,
    assembler: Arc<dyn Assembler>,
    gate: ConcurrencyGate,
    poller: JobPoller,
    urls: PublicUrlResolver,
}

impl StageRunner {
    pub fn new(
        plan: Arc<StagePlan>,
        provider: Arc<dyn GenerationProvider>,
        image_generator: Arc<dyn ImageGenerator>,
        assembler: Arc<dyn Assembler>,
        gate: ConcurrencyGate,
        poller: JobPoller,
        urls: PublicUrlResolver,
    ) -> Self {
        Self {
            plan,
            provider,
            image_generator,
            assembler,
            gate,
            poller,
            urls,
        }
    }

    pub fn plan(&self) -> &StagePlan {
        &self.plan
    }

    pub fn gate(&self) -> &ConcurrencyGate {
        &self.gate
    }

    /// Run `spec` as stage `stage_index`, updating `ctx` for later stages.
    pub async fn run(
        &self,
        ctx: &mut StageContext,
        stage_index: usize,
        spec: &StageSpec,
    ) -> StageOutcome {
        let outcome = match spec.kind {
            StageKind::Image => match self.derive_keyframe(ctx, stage_index, spec).await {
                Ok(path) => {
                    ctx.keyframe = Some(path.clone());
                    Ok(StageArtifact::Keyframe(path))
                }
                Err(failure) => {
                    // Next video stage starts from the uploaded reference.
                    ctx.keyframe = None;
                    Err(failure)
                }
            },
            StageKind::Video => {
                let reference = ctx.take_video_reference();
                self.render_clip(ctx, stage_index, spec, &reference)
                    .await
                    .map(|(record, result_url)| StageArtifact::Clip { record, result_url })
            }
        };

        let kind = spec.kind.as_str();
        match outcome {
            Ok(artifact) => {
                STAGE_OUTCOMES.with_label_values(&[kind, "produced"]).inc();
                info!(
                    session_id = %ctx.session_id,
                    stage_index,
                    stage = %spec.label,
                    kind,
                    "Stage produced"
                );
                StageOutcome::Produced(artifact)
            }
            Err(failure) => {
                STAGE_OUTCOMES.with_label_values(&[kind, "skipped"]).inc();
                STAGE_FAILURES.with_label_values(&[failure.label()]).inc();
                warn!(
                    session_id = %ctx.session_id,
                    stage_index,
                    stage = %spec.label,
                    kind,
                    reason = %failure,
                    "Stage skipped"
                );
                StageOutcome::Skipped {
                    reason: failure.to_string(),
                }
            }
        }
    }

    /// Image stage. Always derives from the original upload.
    async fn derive_keyframe(
        &self,
        ctx: &StageContext,
        stage_index: usize,
        spec: &StageSpec,
    ) -> Result<PathBuf, StageFailure> {
        let prompt = self.plan.render_prompt(spec);
        let _permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| StageFailure::GateClosed)?;

        debug!(
            session_id = %ctx.session_id,
            stage_index,
            generator = self.image_generator.name(),
            "Generating keyframe"
        );
        match self.image_generator.generate(&prompt, ctx.original()).await {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(StageFailure::NoImage),
            Err(e) => Err(StageFailure::ImageFailed(e.to_string())),
        }
    }

    /// Video stage: submit, poll, download.
    async fn render_clip(
        &self,
        ctx: &StageContext,
        stage_index: usize,
        spec: &StageSpec,
        reference: &Path,
    ) -> Result<(ClipRecord, String), StageFailure> {
        let request = GenerationRequest::new(
            self.plan.render_prompt(spec),
            self.urls.reference_url(reference),
        );

        let task_id = self
            .provider
            .submit(&request)
            .await
            .map_err(|e| StageFailure::Submission(e.to_string()))?;
        info!(
            session_id = %ctx.session_id,
            stage_index,
            task_id = %task_id,
            provider = self.provider.name(),
            "Video job submitted"
        );

        let result_url = self
            .poller
            .wait(self.provider.as_ref(), &task_id)
            .await
            .map_err(|failure| match failure {
                PollFailure::Failed { reason } => StageFailure::ProviderFailed(reason),
                PollFailure::Timeout { attempts } => StageFailure::Timeout { attempts },
            })?;

        let destination = ctx.clip_path(stage_index);
        let local_path = self
            .assembler
            .download(&result_url, &destination)
            .await
            .map_err(|e| StageFailure::Download(e.to_string()))?;

        Ok((ClipRecord::new(stage_index, local_path), result_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PublicConfig;
    use crate::provider::{JobOutcome, ProviderError};
    use crate::testing::{MockAssembler, MockGenerationProvider, MockImageGenerator};
    use std::time::Duration;

    struct Fixture {
        provider: Arc<MockGenerationProvider>,
        images: Arc<MockImageGenerator>,
        assembler: Arc<MockAssembler>,
        runner: StageRunner,
    }

    fn fixture(plan: StagePlan) -> Fixture {
        let provider = Arc::new(MockGenerationProvider::new());
        let images = Arc::new(MockImageGenerator::new());
        let assembler = Arc::new(MockAssembler::new());
        let config = PublicConfig {
            base_url: Some("https://reel.example.com".to_string()),
            ..Default::default()
        };
        let runner = StageRunner::new(
            Arc::new(plan),
            provider.clone(),
            images.clone(),
            assembler.clone(),
            ConcurrencyGate::new(1),
            JobPoller::new(Duration::from_secs(1), 3),
            PublicUrlResolver::new(&config, "static", "static"),
        );
        Fixture {
            provider,
            images,
            assembler,
            runner,
        }
    }

    fn image_then_video() -> StagePlan {
        StagePlan::new(
            "The mug.",
            vec![
                StageSpec::image("key", "Mug on a table."),
                StageSpec::video("clip", "Orbit the mug."),
            ],
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_keyframe_feeds_next_video() {
        let f = fixture(image_then_video());
        f.images
            .push_result(Ok(Some(PathBuf::from("static/generated_images/k.png"))))
            .await;
        f.provider.complete_all().await;

        let mut ctx = StageContext::new("s1", "static/uploads/ref.jpg", "static/videos/temp/s1");
        let plan = f.runner.plan().clone();

        let first = f.runner.run(&mut ctx, 0, &plan.stages[0]).await;
        assert_eq!(
            first,
            StageOutcome::Produced(StageArtifact::Keyframe(PathBuf::from(
                "static/generated_images/k.png"
            )))
        );

        let second = f.runner.run(&mut ctx, 1, &plan.stages[1]).await;
        assert!(second.is_produced());
        assert_eq!(second.clip().unwrap().stage_index, 1);

        let submitted = f.provider.submissions().await;
        assert_eq!(submitted.len(), 1);
        assert_eq!(
            submitted[0].image_url,
            "https://reel.example.com/static/generated_images/k.png"
        );
        assert_eq!(submitted[0].prompt, "Orbit the mug. Subject: The mug.");

        let calls = f.images.calls().await;
        assert_eq!(calls[0].0, "Mug on a table. Subject: The mug.");
        assert_eq!(calls[0].1, PathBuf::from("static/uploads/ref.jpg"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_failure_falls_back_to_original() {
        let f = fixture(image_then_video());
        f.images
            .push_result(Err(ProviderError::Generation("quota".to_string())))
            .await;
        f.provider.complete_all().await;

        let mut ctx = StageContext::new("s1", "static/uploads/ref.jpg", "static/videos/temp/s1");
        let plan = f.runner.plan().clone();

        let first = f.runner.run(&mut ctx, 0, &plan.stages[0]).await;
        assert!(matches!(first, StageOutcome::Skipped { .. }));

        let second = f.runner.run(&mut ctx, 1, &plan.stages[1]).await;
        assert!(second.is_produced());
        assert_eq!(
            f.provider.submissions().await[0].image_url,
            "https://reel.example.com/static/uploads/ref.jpg"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_image_without_output_is_skipped() {
        let f = fixture(image_then_video());
        f.images.push_result(Ok(None)).await;

        let mut ctx = StageContext::new("s1", "ref.jpg", "temp");
        let plan = f.runner.plan().clone();
        let outcome = f.runner.run(&mut ctx, 0, &plan.stages[0]).await;
        assert_eq!(
            outcome,
            StageOutcome::Skipped {
                reason: "image provider returned no image".to_string()
            }
        );
        assert!(ctx.keyframe.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submission_failure_never_polls() {
        let f = fixture(image_then_video());
        f.provider
            .push_submit(Err(ProviderError::Submission("no task id".to_string())))
            .await;

        let mut ctx = StageContext::new("s1", "ref.jpg", "temp");
        let plan = f.runner.plan().clone();
        let outcome = f.runner.run(&mut ctx, 1, &plan.stages[1]).await;

        assert!(matches!(outcome, StageOutcome::Skipped { .. }));
        assert_eq!(f.provider.poll_count().await, 0);
        assert!(f.assembler.downloads().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_provider_failure_skips_without_download() {
        let f = fixture(image_then_video());
        f.provider
            .push_poll(Ok(JobOutcome::Failed {
                reason: "policy".to_string(),
            }))
            .await;

        let mut ctx = StageContext::new("s1", "ref.jpg", "temp");
        let plan = f.runner.plan().clone();
        let outcome = f.runner.run(&mut ctx, 1, &plan.stages[1]).await;

        assert_eq!(
            outcome,
            StageOutcome::Skipped {
                reason: "provider failed: policy".to_string()
            }
        );
        assert!(f.assembler.downloads().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_failure_skips() {
        let f = fixture(image_then_video());
        f.provider.complete_all().await;
        f.assembler.fail_downloads(true).await;

        let mut ctx = StageContext::new("s1", "ref.jpg", "temp");
        let plan = f.runner.plan().clone();
        let outcome = f.runner.run(&mut ctx, 1, &plan.stages[1]).await;

        match outcome {
            StageOutcome::Skipped { reason } => assert!(reason.starts_with("download failed")),
            other => panic!("expected skip, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_clip_downloaded_into_clip_dir() {
        let f = fixture(image_then_video());
        f.provider.complete_all().await;

        let mut ctx = StageContext::new("s1", "ref.jpg", "temp/s1");
        let plan = f.runner.plan().clone();
        f.runner.run(&mut ctx, 1, &plan.stages[1]).await;

        let downloads = f.assembler.downloads().await;
        assert_eq!(downloads.len(), 1);
        assert_eq!(downloads[0].1, PathBuf::from("temp/s1/clip_1.mp4"));
    }
}
