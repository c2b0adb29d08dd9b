//! APIMart video generation backend.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::metrics;

use super::{GenerationProvider, GenerationRequest, JobOutcome, ProviderError, VideoProviderConfig};

const PROVIDER_NAME: &str = "apimart";

/// Body of `POST /videos/generations`.
#[derive(Debug, Serialize)]
struct SubmitBody<'a> {
    model: &'a str,
    prompt: &'a str,
    duration: u32,
    aspect_ratio: &'a str,
    private: bool,
    image_urls: Vec<&'a str>,
}

/// APIMart client (Sora-style async video jobs).
pub struct ApimartClient {
    client: Client,
    config: VideoProviderConfig,
}

impl ApimartClient {
    pub fn new(config: VideoProviderConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ProviderError::Config(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn submit_url(&self) -> String {
        format!("{}/videos/generations", self.config.url.trim_end_matches('/'))
    }

    fn task_url(&self, task_id: &str) -> String {
        format!(
            "{}/tasks/{}?language=en",
            self.config.url.trim_end_matches('/'),
            urlencoding::encode(task_id)
        )
    }

    async fn send_submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let body = SubmitBody {
            model: &self.config.model,
            prompt: &request.prompt,
            duration: self.config.duration_secs,
            aspect_ratio: &self.config.aspect_ratio,
            private: false,
            image_urls: vec![request.image_url.as_str()],
        };

        let response = self
            .client
            .post(self.submit_url())
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.submit_timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::Submission(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ProviderError::Submission(e.to_string()))?;

        if !status.is_success() {
            return Err(ProviderError::Submission(format!(
                "HTTP {}: {}",
                status,
                snippet(&text)
            )));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| ProviderError::Submission(format!("unreadable response: {}", e)))?;
        parse_submit_response(&json)
    }

    async fn send_poll(&self, task_id: &str) -> Result<JobOutcome, ProviderError> {
        let response = self
            .client
            .get(self.task_url(task_id))
            .bearer_auth(&self.config.api_key)
            .timeout(Duration::from_secs(self.config.poll_request_timeout_secs))
            .send()
            .await
            .map_err(|e| ProviderError::transient(&e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Transient(format!(
                "HTTP {}: {}",
                status,
                snippet(&body)
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Transient(format!("unreadable status body: {}", e)))?;
        Ok(parse_task_response(&json))
    }
}

#[async_trait]
impl GenerationProvider for ApimartClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn submit(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let start = Instant::now();
        let result = self.send_submit(request).await;
        metrics::record_provider_call(
            PROVIDER_NAME,
            "submit",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );

        match &result {
            Ok(task_id) => debug!(task_id = %task_id, "Video job submitted"),
            Err(e) => warn!(error = %e, "Video job submission failed"),
        }
        result
    }

    async fn poll(&self, task_id: &str) -> Result<JobOutcome, ProviderError> {
        let start = Instant::now();
        let result = self.send_poll(task_id).await;
        metrics::record_provider_call(
            PROVIDER_NAME,
            "poll",
            result.is_ok(),
            start.elapsed().as_secs_f64(),
        );
        result
    }
}

/// Extract the task id from a submission response.
///
/// Accepted shapes: `{"code":200,"data":{"task_id":..}}` and
/// `{"code":200,"data":[{"task_id":..}]}`.
pub(crate) fn parse_submit_response(json: &Value) -> Result<String, ProviderError> {
    let code = json.get("code").and_then(Value::as_i64);
    if code != Some(200) {
        return Err(ProviderError::Submission(format!(
            "unexpected response code: {}",
            snippet(&json.to_string())
        )));
    }

    let data = json.get("data");
    let task_id = match data {
        Some(Value::Array(items)) => items.first().and_then(|item| item.get("task_id")),
        Some(obj @ Value::Object(_)) => obj.get("task_id"),
        _ => None,
    };

    match task_id {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(ProviderError::Submission(format!(
            "response carries no task id: {}",
            snippet(&json.to_string())
        ))),
    }
}

/// Map a task status body to a [`JobOutcome`].
pub(crate) fn parse_task_response(json: &Value) -> JobOutcome {
    let data = match json.get("data") {
        Some(data) => data,
        None => return JobOutcome::Pending,
    };

    match data.get("status").and_then(Value::as_str) {
        Some("completed") => match first_video_url(data) {
            Some(url) => JobOutcome::Completed {
                url: url.to_string(),
            },
            None => JobOutcome::Failed {
                reason: "completed without output".to_string(),
            },
        },
        Some("failed") => JobOutcome::Failed {
            reason: failure_reason(data),
        },
        _ => JobOutcome::Pending,
    }
}

/// `data.result.videos[0].url[0]`; a bare string `url` is accepted too.
fn first_video_url(data: &Value) -> Option<&str> {
    let video = data.get("result")?.get("videos")?.get(0)?;
    let url = match video.get("url")? {
        Value::Array(urls) => urls.first()?.as_str(),
        Value::String(url) => Some(url.as_str()),
        _ => None,
    };
    url.filter(|url| !url.is_empty())
}

fn failure_reason(data: &Value) -> String {
    data.get("error")
        .and_then(|e| e.get("message").or(Some(e)))
        .and_then(Value::as_str)
        .or_else(|| data.get("fail_reason").and_then(Value::as_str))
        .unwrap_or("provider reported failure")
        .to_string()
}

fn snippet(text: &str) -> String {
    text.chars().take(200).collect()
}
