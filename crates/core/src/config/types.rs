use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::assembler::AssemblerConfig;
use crate::orchestrator::WorkflowConfig;
use crate::plan::StagePlan;
use crate::provider::{ImageProviderConfig, VideoProviderConfig};

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub public: PublicConfig,
    #[serde(default)]
    pub video_provider: VideoProviderConfig,
    #[serde(default)]
    pub image_provider: ImageProviderConfig,
    #[serde(default)]
    pub assembler: AssemblerConfig,
    #[serde(default)]
    pub workflow: WorkflowConfig,
    #[serde(default)]
    pub plan: StagePlan,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

/// Local directory layout.
///
/// Everything lives under `static_root` so the server can expose finished
/// artifacts (and uploaded references) through a single static mount.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root of the statically served tree.
    #[serde(default = "default_static_root")]
    pub static_root: PathBuf,
    /// Uploaded reference images.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    /// Keyframes produced by the image provider.
    #[serde(default = "default_generated_images_dir")]
    pub generated_images_dir: PathBuf,
    /// Final assembled videos.
    #[serde(default = "default_videos_dir")]
    pub videos_dir: PathBuf,
    /// Downloaded clips awaiting assembly.
    #[serde(default = "default_temp_dir")]
    pub temp_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            static_root: default_static_root(),
            uploads_dir: default_uploads_dir(),
            generated_images_dir: default_generated_images_dir(),
            videos_dir: default_videos_dir(),
            temp_dir: default_temp_dir(),
        }
    }
}

fn default_static_root() -> PathBuf {
    PathBuf::from("static")
}

fn default_uploads_dir() -> PathBuf {
    PathBuf::from("static/uploads")
}

fn default_generated_images_dir() -> PathBuf {
    PathBuf::from("static/generated_images")
}

fn default_videos_dir() -> PathBuf {
    PathBuf::from("static/videos")
}

fn default_temp_dir() -> PathBuf {
    PathBuf::from("static/videos/temp")
}

impl StorageConfig {
    /// Create every configured directory if missing.
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for dir in [
            &self.static_root,
            &self.uploads_dir,
            &self.generated_images_dir,
            &self.videos_dir,
            &self.temp_dir,
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Create every configured directory under a custom root (tests).
    pub fn rooted_at(root: &Path) -> Self {
        Self {
            static_root: root.to_path_buf(),
            uploads_dir: root.join("uploads"),
            generated_images_dir: root.join("generated_images"),
            videos_dir: root.join("videos"),
            temp_dir: root.join("videos").join("temp"),
        }
    }

    /// Location of the final artifact for a session.
    pub fn output_path(&self, session_id: &str) -> PathBuf {
        self.videos_dir.join(format!("{}.mp4", session_id))
    }

    /// Scratch directory for a session's downloaded clips.
    pub fn session_temp_dir(&self, session_id: &str) -> PathBuf {
        self.temp_dir.join(session_id)
    }
}

/// Public addressing of locally stored assets.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PublicConfig {
    /// Externally reachable base URL of this server (e.g. "https://reel.example.com").
    /// When absent, providers receive `fallback_reference_url` instead of a local asset.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Always-public image used when no base URL is configured.
    #[serde(default = "default_fallback_reference_url")]
    pub fallback_reference_url: String,
}

impl Default for PublicConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            fallback_reference_url: default_fallback_reference_url(),
        }
    }
}

fn default_fallback_reference_url() -> String {
    "https://static.uganda-coffee.com/coffee/20250302/mbEsGl0Lmep58MlTkLoHFszXgk0UTW8El3AkE0PuK0ZAKTXDx2RpfrmcRXXSMmrU.".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub public: PublicConfig,
    pub video_provider: SanitizedVideoProviderConfig,
    pub image_provider: SanitizedImageProviderConfig,
    pub assembler: AssemblerConfig,
    pub workflow: WorkflowConfig,
    pub plan: StagePlan,
}

/// Sanitized video provider config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedVideoProviderConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub model: String,
    pub poll_interval_secs: u64,
    pub max_poll_attempts: u32,
}

/// Sanitized image provider config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedImageProviderConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub model: String,
    pub max_concurrent: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            public: config.public.clone(),
            video_provider: SanitizedVideoProviderConfig {
                url: config.video_provider.url.clone(),
                api_key_configured: !config.video_provider.api_key.is_empty(),
                model: config.video_provider.model.clone(),
                poll_interval_secs: config.video_provider.poll_interval_secs,
                max_poll_attempts: config.video_provider.max_poll_attempts,
            },
            image_provider: SanitizedImageProviderConfig {
                url: config.image_provider.url.clone(),
                api_key_configured: !config.image_provider.api_key.is_empty(),
                model: config.image_provider.model.clone(),
                max_concurrent: config.image_provider.max_concurrent,
            },
            assembler: config.assembler.clone(),
            workflow: config.workflow.clone(),
            plan: config.plan.clone(),
        }
    }
}
