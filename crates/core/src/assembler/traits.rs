//! Trait definitions for the assembler module.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::error::AssemblerError;
use crate::plan::ClipRecord;

/// Fetches rendered clips and joins them into the final artifact.
#[async_trait]
pub trait Assembler: Send + Sync {
    /// Returns the name of this assembler implementation.
    fn name(&self) -> &str;

    /// Download `url` to `destination`. Single attempt.
    async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf, AssemblerError>;

    /// Join `clips` in `stage_index` order into `output`.
    ///
    /// One clip is copied as is. Empty input is rejected with
    /// [`AssemblerError::NoClips`].
    async fn assemble(&self, clips: &[ClipRecord], output: &Path)
        -> Result<PathBuf, AssemblerError>;

    /// Checks that required tools are available.
    async fn validate(&self) -> Result<(), AssemblerError>;
}
