//! Gemini client for engaging interval recommendations.
//!
//! Videos are sent inline (base64) when a local copy exists and fits under
//! the inline size limit, otherwise by URI. Models are tried in order until
//! one answers.

use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::interval::{selection_prompt, IntervalRecommender, RecommendError, VideoReference};

/// Default Gemini REST endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
/// Default model fallback chain.
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-2.5-flash-lite", "gemini-2.5-pro"];
/// Largest video sent inline (Gemini caps inline request payloads at 20 MB).
pub const DEFAULT_MAX_INLINE_BYTES: u64 = 18 * 1024 * 1024;

/// Gemini client configuration.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub models: Vec<String>,
    pub max_inline_bytes: u64,
    pub request_timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
            max_inline_bytes: DEFAULT_MAX_INLINE_BYTES,
            request_timeout: Duration::from_secs(120),
        }
    }

    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, RecommendError> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| RecommendError::NotConfigured("GEMINI_API_KEY not set".into()))?;

        let mut config = Self::new(api_key);
        if let Ok(models) = std::env::var("GEMINI_MODELS") {
            let models: Vec<String> = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
            if !models.is_empty() {
                config.models = models;
            }
        }
        if let Some(limit) = std::env::var("GEMINI_MAX_INLINE_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
        {
            config.max_inline_bytes = limit;
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_models<I, S>(mut self, models: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.models = models.into_iter().map(Into::into).collect();
        self
    }
}

/// Gemini API request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: Blob,
    },
    File {
        #[serde(rename = "fileData")]
        file_data: FileData,
    },
    Text {
        text: String,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData {
    mime_type: String,
    file_uri: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
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
    text: Option<String>,
}

/// Interval recommender backed by Gemini `generateContent`.
pub struct GeminiRecommender {
    config: GeminiConfig,
    client: Client,
}

impl GeminiRecommender {
    pub fn new(config: GeminiConfig) -> Result<Self, RecommendError> {
        if config.models.is_empty() {
            return Err(RecommendError::NotConfigured("no Gemini models configured".into()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| RecommendError::NotConfigured(e.to_string()))?;
        Ok(Self { config, client })
    }

    /// Create from environment variables.
    pub fn from_env() -> Result<Self, RecommendError> {
        Self::new(GeminiConfig::from_env()?)
    }

    /// Video part for the request: inline bytes when small enough, URI otherwise.
    async fn video_part(&self, video: &VideoReference) -> Result<Part, RecommendError> {
        let mime_type = mime_type_for(&video.url).to_string();

        if let Some(path) = &video.local_path {
            match tokio::fs::metadata(path).await {
                Ok(meta) if meta.len() <= self.config.max_inline_bytes => {
                    let bytes = tokio::fs::read(path).await?;
                    debug!(bytes = bytes.len(), "Sending video inline");
                    return Ok(Part::Inline {
                        inline_data: Blob {
                            mime_type,
                            data: STANDARD.encode(bytes),
                        },
                    });
                }
                Ok(meta) => debug!(bytes = meta.len(), "Video too large to inline, sending URI"),
                Err(e) => debug!(error = %e, "Local copy unavailable, sending URI"),
            }
        }

        Ok(Part::File {
            file_data: FileData {
                mime_type,
                file_uri: video.url.clone(),
            },
        })
    }

    /// Call one model.
    async fn call_model(&self, model: &str, request: &GeminiRequest) -> Result<String, RecommendError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            model
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(request)
            .send()
            .await
            .map_err(|e| RecommendError::Request(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(RecommendError::Status { status, body });
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| RecommendError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(RecommendError::EmptyResponse);
        }
        Ok(text)
    }
}

#[async_trait]
impl IntervalRecommender for GeminiRecommender {
    async fn recommend(&self, video: &VideoReference) -> Result<String, RecommendError> {
        let request = GeminiRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    self.video_part(video).await?,
                    Part::Text {
                        text: selection_prompt(),
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 32,
            },
        };

        let mut last_error = None;
        for model in &self.config.models {
            match self.call_model(model, &request).await {
                Ok(text) => {
                    info!(model = %model, answer = %text.trim(), "Got interval recommendation");
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Gemini model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(RecommendError::EmptyResponse))
    }
}

fn mime_type_for(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or(url).to_lowercase();
    if path.ends_with(".mov") {
        "video/quicktime"
    } else if path.ends_with(".webm") {
        "video/webm"
    } else {
        "video/mp4"
    }
}
