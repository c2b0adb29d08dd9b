//! Provider configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Job-based video generation API.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VideoProviderConfig {
    /// API base URL (endpoints `/videos/generations` and `/tasks/{id}` are appended).
    #[serde(default = "default_video_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_video_model")]
    pub model: String,
    /// Clip length requested from the provider.
    #[serde(default = "default_duration_secs")]
    pub duration_secs: u32,
    #[serde(default = "default_aspect_ratio")]
    pub aspect_ratio: String,
    #[serde(default = "default_submit_timeout_secs")]
    pub submit_timeout_secs: u64,
    /// Timeout of a single status request.
    #[serde(default = "default_poll_request_timeout_secs")]
    pub poll_request_timeout_secs: u64,
    /// Spacing between status requests.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,
}

impl Default for VideoProviderConfig {
    fn default() -> Self {
        Self {
            url: default_video_url(),
            api_key: String::new(),
            model: default_video_model(),
            duration_secs: default_duration_secs(),
            aspect_ratio: default_aspect_ratio(),
            submit_timeout_secs: default_submit_timeout_secs(),
            poll_request_timeout_secs: default_poll_request_timeout_secs(),
            poll_interval_secs: default_poll_interval_secs(),
            max_poll_attempts: default_max_poll_attempts(),
        }
    }
}

impl VideoProviderConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_video_url() -> String {
    "https://api.apimart.ai/v1".to_string()
}

fn default_video_model() -> String {
    "sora-2".to_string()
}

fn default_duration_secs() -> u32 {
    5
}

fn default_aspect_ratio() -> String {
    "16:9".to_string()
}

fn default_submit_timeout_secs() -> u64 {
    60
}

fn default_poll_request_timeout_secs() -> u64 {
    60
}

fn default_poll_interval_secs() -> u64 {
    60
}

fn default_max_poll_attempts() -> u32 {
    10
}

/// Image generation API used for keyframes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageProviderConfig {
    #[serde(default = "default_image_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_image_model")]
    pub model: String,
    #[serde(default = "default_image_timeout_secs")]
    pub timeout_secs: u64,
    /// Capacity of the process-wide image gate.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for ImageProviderConfig {
    fn default() -> Self {
        Self {
            url: default_image_url(),
            api_key: String::new(),
            model: default_image_model(),
            timeout_secs: default_image_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_image_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_image_model() -> String {
    "gemini-2.5-flash-image".to_string()
}

fn default_image_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    1
}
