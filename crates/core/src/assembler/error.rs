//! Error types for the assembler module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching or assembling clips.
#[derive(Debug, Error)]
pub enum AssemblerError {
    /// Clip could not be fetched. The stage is skipped.
    #[error("Download of {url} failed: {reason}")]
    Download { url: String, reason: String },

    /// Nothing to assemble.
    #[error("No clips to assemble")]
    NoClips,

    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// FFprobe binary not found.
    #[error("FFprobe not found at path: {path}")]
    FfprobeNotFound { path: PathBuf },

    /// FFmpeg ran but failed.
    #[error("Assembly failed: {reason}")]
    Failed {
        reason: String,
        stderr: Option<String>,
    },

    /// Assembly timed out.
    #[error("Assembly timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AssemblerError {
    pub fn download(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Download {
            url: url.into(),
            reason: reason.into(),
        }
    }

    pub fn failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
            stderr,
        }
    }
}
