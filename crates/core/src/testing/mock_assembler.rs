//! Mock assembler for testing.

use async_trait::async_trait;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::assembler::{Assembler, AssemblerError};
use crate::plan::ClipRecord;

/// Mock implementation of the Assembler trait.
///
/// Nothing touches the filesystem: downloads return the destination path and
/// assembly returns the output path. Every call is recorded.
#[derive(Debug)]
pub struct MockAssembler {
    downloads: Arc<RwLock<Vec<(String, PathBuf)>>>,
    assemblies: Arc<RwLock<Vec<(Vec<ClipRecord>, PathBuf)>>>,
    fail_all_downloads: Arc<RwLock<bool>>,
    failing_urls: Arc<RwLock<HashSet<String>>>,
    next_assemble_error: Arc<RwLock<Option<AssemblerError>>>,
}

impl Default for MockAssembler {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAssembler {
    pub fn new() -> Self {
        Self {
            downloads: Arc::new(RwLock::new(Vec::new())),
            assemblies: Arc::new(RwLock::new(Vec::new())),
            fail_all_downloads: Arc::new(RwLock::new(false)),
            failing_urls: Arc::new(RwLock::new(HashSet::new())),
            next_assemble_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Make every download fail.
    pub async fn fail_downloads(&self, fail: bool) {
        *self.fail_all_downloads.write().await = fail;
    }

    /// Make downloads of `url` fail.
    pub async fn fail_download_of(&self, url: impl Into<String>) {
        self.failing_urls.write().await.insert(url.into());
    }

    /// Configure the next assembly to fail with the given error.
    pub async fn set_next_assemble_error(&self, error: AssemblerError) {
        *self.next_assemble_error.write().await = Some(error);
    }

    /// `(url, destination)` pairs, in call order.
    pub async fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.downloads.read().await.clone()
    }

    /// Clip lists passed to `assemble`, with their output path.
    pub async fn assemblies(&self) -> Vec<(Vec<ClipRecord>, PathBuf)> {
        self.assemblies.read().await.clone()
    }

    pub async fn assemble_count(&self) -> usize {
        self.assemblies.read().await.len()
    }
}

#[async_trait]
impl Assembler for MockAssembler {
    fn name(&self) -> &str {
        "mock"
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<PathBuf, AssemblerError> {
        self.downloads
            .write()
            .await
            .push((url.to_string(), destination.to_path_buf()));

        if *self.fail_all_downloads.read().await || self.failing_urls.read().await.contains(url) {
            return Err(AssemblerError::download(url, "mock download failure"));
        }
        Ok(destination.to_path_buf())
    }

    async fn assemble(
        &self,
        clips: &[ClipRecord],
        output: &Path,
    ) -> Result<PathBuf, AssemblerError> {
        self.assemblies
            .write()
            .await
            .push((clips.to_vec(), output.to_path_buf()));

        if clips.is_empty() {
            return Err(AssemblerError::NoClips);
        }
        if let Some(error) = self.next_assemble_error.write().await.take() {
            return Err(error);
        }
        Ok(output.to_path_buf())
    }

    async fn validate(&self) -> Result<(), AssemblerError> {
        Ok(())
    }
}
