//! Gemini vision ROI provider.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use adapt_media::extract_frames;
use adapt_models::{RoiBox, VideoAsset};

use crate::error::{RoiError, RoiResult};
use crate::provider::{RoiProvider, SamplingParams};
use crate::types::{Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part, RegionsPayload};

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const DETECTION_PROMPT: &str = "You are locating content in a frame of an advertising video that must \
not be cropped away when the video is adapted to other screen shapes. Find brand logos, on-screen text \
(headlines, calls to action, legal lines), human faces and other salient products. Respond with JSON only: \
{\"regions\": [{\"category\": \"logo|text|face|generic\", \"x\": 0.0, \"y\": 0.0, \"width\": 0.0, \
\"height\": 0.0, \"confidence\": 0.0}]}. Coordinates are the top-left corner and size of each region as \
fractions of the frame width and height in [0, 1]. Return an empty list when nothing qualifies.";

/// Configuration for the Gemini client.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key; detection is unavailable without one
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retries per request after the first attempt
    pub max_retries: u32,
    /// Parent directory for sampled frames
    pub work_dir: Option<PathBuf>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_GEMINI_MODEL.to_string(),
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            timeout: Duration::from_secs(60),
            max_retries: 2,
            work_dir: None,
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            api_key: std::env::var("GOOGLE_API_KEY")
                .or_else(|_| std::env::var("GEMINI_API_KEY"))
                .ok()
                .filter(|k| !k.trim().is_empty()),
            model: std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string()),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or_else(|_| DEFAULT_GEMINI_BASE_URL.to_string()),
            timeout: Duration::from_secs(
                std::env::var("GEMINI_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            max_retries: std::env::var("GEMINI_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            work_dir: None,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = Some(work_dir.into());
        self
    }
}

/// ROI provider backed by Gemini vision.
pub struct GeminiRoiProvider {
    http: Client,
    config: GeminiConfig,
}

impl GeminiRoiProvider {
    pub fn new(config: GeminiConfig) -> RoiResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(RoiError::Network)?;

        Ok(Self { http, config })
    }

    pub fn from_env() -> RoiResult<Self> {
        Self::new(GeminiConfig::from_env())
    }

    pub fn has_credential(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }

    /// Detect regions in one JPEG frame of a `width` x `height` source.
    pub async fn detect_frame(&self, jpeg: &[u8], timestamp: f64, width: u32, height: u32) -> RoiResult<Vec<RoiBox>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| RoiError::MissingCredential("GOOGLE_API_KEY".to_string()))?;

        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::text(DETECTION_PROMPT), Part::jpeg(BASE64.encode(jpeg))],
            }],
            generation_config: GenerationConfig::default(),
        };

        let url = self.endpoint();
        let response = self
            .with_retry(|| async {
                let response = self
                    .http
                    .post(&url)
                    .header("x-goog-api-key", api_key)
                    .json(&request)
                    .send()
                    .await
                    .map_err(RoiError::Network)?;

                let status = response.status();
                if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                    return Err(RoiError::ServiceUnavailable(format!("Gemini returned {}", status)));
                }
                if !status.is_success() {
                    let body = response.text().await.unwrap_or_default();
                    return Err(RoiError::RequestFailed(format!("Gemini returned {}: {}", status, body)));
                }
                Ok(response)
            })
            .await?;

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| RoiError::InvalidResponse(format!("response body: {}", e)))?;
        let text = body
            .text()
            .ok_or_else(|| RoiError::InvalidResponse("response has no text candidate".to_string()))?;
        let payload: RegionsPayload = serde_json::from_str(strip_code_fence(&text))
            .map_err(|e| RoiError::InvalidResponse(format!("regions JSON: {}", e)))?;

        Ok(payload
            .regions
            .iter()
            .filter_map(|region| region.to_roi(timestamp, width, height))
            .collect())
    }

    /// Execute with retry logic.
    async fn with_retry<F, Fut, T>(&self, operation: F) -> RoiResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = RoiResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = backoff_delay(attempt);
                    warn!(
                        "Gemini request failed (attempt {}), retrying in {:?}: {}",
                        attempt + 1,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// 500ms doubled per attempt, saturating for large retry counts.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500u64.saturating_mul(2u64.saturating_pow(attempt)))
}

/// Models sometimes wrap JSON in a markdown fence despite the MIME type.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

#[async_trait]
impl RoiProvider for GeminiRoiProvider {
    async fn detect(&self, asset: &VideoAsset, params: &SamplingParams) -> RoiResult<Vec<RoiBox>> {
        if !self.has_credential() {
            return Err(RoiError::unavailable("GOOGLE_API_KEY is not set"));
        }
        if asset.width <= 0 || asset.height <= 0 {
            return Err(RoiError::unavailable("source has no usable geometry"));
        }

        let scratch = match &self.config.work_dir {
            Some(dir) => {
                tokio::fs::create_dir_all(dir).await?;
                tempfile::Builder::new().prefix("roi-frames-").tempdir_in(dir)?
            }
            None => tempfile::Builder::new().prefix("roi-frames-").tempdir()?,
        };

        let frames = extract_frames(&asset.path, scratch.path(), params.sampling_rate, params.max_frames)
            .await
            .map_err(|e| RoiError::from(e).into_unavailable())?;

        let (width, height) = (asset.width as u32, asset.height as u32);
        let mut boxes = Vec::new();
        for frame in &frames {
            let jpeg = tokio::fs::read(&frame.path).await?;
            match self.detect_frame(&jpeg, frame.timestamp, width, height).await {
                Ok(found) => {
                    debug!(timestamp = frame.timestamp, regions = found.len(), "Analyzed frame");
                    boxes.extend(found);
                }
                Err(RoiError::InvalidResponse(msg)) => {
                    warn!(timestamp = frame.timestamp, "Skipping frame: {}", msg);
                }
                Err(e) => return Err(e.into_unavailable()),
            }
        }

        info!(
            source = %asset.display_name(),
            frames = frames.len(),
            regions = boxes.len(),
            "ROI detection complete"
        );
        Ok(boxes)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
