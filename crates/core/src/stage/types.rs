use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::plan::ClipRecord;

/// What a produced stage left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageArtifact {
    /// Derived image, used by the next video stage.
    Keyframe(PathBuf),
    /// Downloaded clip plus the provider URL it came from.
    Clip {
        record: ClipRecord,
        result_url: String,
    },
}

/// Result of one stage. Skipped stages never abort their siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Produced(StageArtifact),
    Skipped { reason: String },
}

impl StageOutcome {
    pub fn is_produced(&self) -> bool {
        matches!(self, StageOutcome::Produced(_))
    }

    pub fn clip(&self) -> Option<&ClipRecord> {
        match self {
            StageOutcome::Produced(StageArtifact::Clip { record, .. }) => Some(record),
            _ => None,
        }
    }
}

/// Why a stage produced nothing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StageFailure {
    #[error("image generation failed: {0}")]
    ImageFailed(String),

    #[error("image provider returned no image")]
    NoImage,

    #[error("submission failed: {0}")]
    Submission(String),

    #[error("provider failed: {0}")]
    ProviderFailed(String),

    #[error("timed out after {attempts} poll attempts")]
    Timeout { attempts: u32 },

    #[error("download failed: {0}")]
    Download(String),

    #[error("concurrency gate unavailable")]
    GateClosed,
}

impl StageFailure {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            StageFailure::ImageFailed(_) | StageFailure::NoImage | StageFailure::GateClosed => {
                "image"
            }
            StageFailure::Submission(_) => "submission",
            StageFailure::ProviderFailed(_) => "provider_failed",
            StageFailure::Timeout { .. } => "timeout",
            StageFailure::Download(_) => "download",
        }
    }
}

/// Per-session state threaded through consecutive stages.
#[derive(Debug, Clone)]
pub struct StageContext {
    pub session_id: String,
    /// The uploaded reference. Never replaced.
    pub original: PathBuf,
    /// Keyframe waiting for the next video stage.
    pub keyframe: Option<PathBuf>,
    /// Where downloaded clips go.
    pub clip_dir: PathBuf,
}

impl StageContext {
    pub fn new(
        session_id: impl Into<String>,
        original: impl Into<PathBuf>,
        clip_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            original: original.into(),
            keyframe: None,
            clip_dir: clip_dir.into(),
        }
    }

    /// Reference for the next video stage. Consumes a pending keyframe.
    pub fn take_video_reference(&mut self) -> PathBuf {
        self.keyframe
            .take()
            .unwrap_or_else(|| self.original.clone())
    }

    pub fn clip_path(&self, stage_index: usize) -> PathBuf {
        self.clip_dir.join(format!("clip_{}.mp4", stage_index))
    }

    pub fn original(&self) -> &Path {
        &self.original
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyframe_consumed_once() {
        let mut ctx = StageContext::new("s1", "uploads/ref.jpg", "temp/s1");
        ctx.keyframe = Some(PathBuf::from("generated/k1.png"));

        assert_eq!(ctx.take_video_reference(), PathBuf::from("generated/k1.png"));
        assert_eq!(ctx.take_video_reference(), PathBuf::from("uploads/ref.jpg"));
    }

    #[test]
    fn test_clip_path() {
        let ctx = StageContext::new("s1", "ref.jpg", "temp/s1");
        assert_eq!(ctx.clip_path(3), PathBuf::from("temp/s1/clip_3.mp4"));
    }

    #[test]
    fn test_failure_labels() {
        assert_eq!(StageFailure::NoImage.label(), "image");
        assert_eq!(StageFailure::Timeout { attempts: 10 }.label(), "timeout");
        assert_eq!(
            StageFailure::Timeout { attempts: 10 }.to_string(),
            "timed out after 10 poll attempts"
        );
    }
}
