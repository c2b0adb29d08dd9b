//! Configuration for the assembler module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based assembler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssemblerConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// Path to ffprobe binary.
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,

    /// Output frame width. Clips are letterboxed to fit.
    #[serde(default = "default_width")]
    pub width: u32,

    /// Output frame height.
    #[serde(default = "default_height")]
    pub height: u32,

    /// Output frame rate.
    #[serde(default = "default_fps")]
    pub fps: u32,

    /// x264 preset.
    #[serde(default = "default_preset")]
    pub preset: String,

    /// Timeout for one clip download in seconds.
    #[serde(default = "default_download_timeout")]
    pub download_timeout_secs: u64,

    /// Timeout for the concatenation run in seconds.
    #[serde(default = "default_assembly_timeout")]
    pub assembly_timeout_secs: u64,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}

fn default_width() -> u32 {
    1280
}

fn default_height() -> u32 {
    720
}

fn default_fps() -> u32 {
    24
}

fn default_preset() -> String {
    "ultrafast".to_string()
}

fn default_download_timeout() -> u64 {
    300
}

fn default_assembly_timeout() -> u64 {
    1800
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            ffprobe_path: default_ffprobe_path(),
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            preset: default_preset(),
            download_timeout_secs: default_download_timeout(),
            assembly_timeout_secs: default_assembly_timeout(),
        }
    }
}

impl AssemblerConfig {
    pub fn with_ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = path.into();
        self
    }

    pub fn with_ffprobe_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffprobe_path = path.into();
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AssemblerConfig::default();
        assert_eq!(config.width, 1280);
        assert_eq!(config.height, 720);
        assert_eq!(config.fps, 24);
        assert_eq!(config.preset, "ultrafast");
        assert_eq!(config.download_timeout_secs, 300);
    }

    #[test]
    fn test_builders() {
        let config = AssemblerConfig::default()
            .with_resolution(1920, 1080)
            .with_fps(30)
            .with_ffmpeg_path("/opt/ffmpeg/bin/ffmpeg");
        assert_eq!(config.width, 1920);
        assert_eq!(config.fps, 30);
        assert_eq!(config.ffmpeg_path, PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }
}
