//! Gemini image generation backend (keyframe derivation).

use async_trait::async_trait;
use base64::prelude::*;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::metrics;

use super::{ImageGenerator, ImageProviderConfig, ProviderError};

const PROVIDER_NAME: &str = "gemini";

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    parts: Vec<RequestPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
struct InlineData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseModalities")]
    response_modalities: Vec<&'static str>,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(rename = "inlineData", alias = "inline_data")]
    inline_data: Option<InlineData>,
}

/// Gemini `generateContent` client writing images into `output_dir`.
pub struct GeminiImageClient {
    client: Client,
    config: ImageProviderConfig,
    output_dir: PathBuf,
}

impl GeminiImageClient {
    pub fn new(
        config: ImageProviderConfig,
        output_dir: impl Into<PathBuf>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self {
            client,
            config,
            output_dir: output_dir.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.url.trim_end_matches('/'),
            self.config.model
        )
    }

    async fn request_image(
        &self,
        prompt: &str,
        reference: &Path,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let bytes = tokio::fs::read(reference).await?;
        let body = GenerateContentRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text {
                        text: prompt.to_string(),
                    },
                    RequestPart::InlineData {
                        inline_data: InlineData {
                            mime_type: mime_for_path(reference).to_string(),
                            data: BASE64_STANDARD.encode(&bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["TEXT", "IMAGE"],
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Generation(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Generation(format!(
                "HTTP {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let Some(image) = first_inline_image(parsed) else {
            return Ok(None);
        };

        let data = BASE64_STANDARD
            .decode(image.data.as_bytes())
            .map_err(|e| ProviderError::Parse(format!("invalid image payload: {}", e)))?;

        let path = self.output_dir.join(output_file_name(&image.mime_type));
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(&path, data).await?;
        Ok(Some(path))
    }
}

#[async_trait]
impl ImageGenerator for GeminiImageClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn generate(
        &self,
        prompt: &str,
        reference: &Path,
    ) -> Result<Option<PathBuf>, ProviderError> {
        let start = Instant::now();
        let result = self.request_image(prompt, reference).await;
        metrics::record_provider_call(
            PROVIDER_NAME,
            "generate_image",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        match &result {
            Ok(Some(path)) => debug!(path = %path.display(), "Keyframe image written"),
            Ok(None) => warn!("Image provider answered without image data"),
            Err(e) => warn!(error = %e, "Image generation failed"),
        }
        result
    }
}

fn first_inline_image(response: GenerateContentResponse) -> Option<InlineData> {
    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.inline_data)
        .filter(|d| !d.data.is_empty())
}

fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/jpeg",
    }
}

fn output_file_name(mime_type: &str) -> String {
    let ext = match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    };
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!(
        "gemini_gen_{}_{}.{}",
        chrono::Utc::now().timestamp_millis(),
        &id[..8],
        ext
    )
}
