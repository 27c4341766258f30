//! Extraction backends for SessionGraph
//!
//! Provides an `ExtractionBackend` trait with implementations for:
//! - **Anthropic**: live extraction via the Anthropic Messages API
//! - **Offline**: replay-only mode; every call fails so only cache hits produce output
//!
//! A backend returns the raw completion text. Locating and normalizing the JSON
//! payload inside that text is the orchestrator's job.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::prompts::extraction_prompt;

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

const ANTHROPIC_VERSION: &str = "2023-06-01";

// ============================================================================
// ExtractionBackend trait
// ============================================================================

/// Abstraction over the external semantic-extraction capability.
#[async_trait]
pub trait ExtractionBackend: Send + Sync {
    /// Run one extraction over `text` and return the raw completion.
    async fn extract(&self, text: &str, context: &str) -> Result<String, ExtractionError>;

    /// Model identifier recorded alongside cached results.
    fn model(&self) -> &str;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

// ============================================================================
// Error types
// ============================================================================

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({code}): {message}")]
    Api { code: u16, message: String },

    #[error("Request timed out after {timeout_seconds}s")]
    Timeout { timeout_seconds: u64 },

    #[error("Missing API key (set ANTHROPIC_API_KEY)")]
    MissingApiKey,

    #[error("Response contained no text content")]
    EmptyResponse,

    #[error("Offline mode: live extraction is disabled")]
    Offline,
}

// ============================================================================
// Config types
// ============================================================================

/// Anthropic client configuration
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub timeout_seconds: u64,
}

impl AnthropicConfig {
    pub fn new(api_key: Option<String>, model: String) -> Self {
        let api_key = api_key
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default();

        Self {
            api_key,
            model,
            max_tokens: 8192,
            temperature: 0.1,
            timeout_seconds: 120,
        }
    }

    pub fn from_settings(api_key: Option<String>, settings: &crate::config::ExtractionConfig) -> Self {
        Self {
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_seconds: settings.timeout_seconds,
            ..Self::new(api_key, settings.model.clone())
        }
    }
}

/// Configuration union for the backend factory.
pub enum BackendConfig {
    Anthropic {
        config: AnthropicConfig,
        base_url: String,
    },
    Offline {
        model: String,
    },
}

/// Create the appropriate backend from configuration.
pub fn create_backend(config: BackendConfig) -> Result<Box<dyn ExtractionBackend>, ExtractionError> {
    match config {
        BackendConfig::Anthropic { config, base_url } => Ok(Box::new(
            AnthropicExtractionClient::with_base_url(config, base_url)?,
        )),
        BackendConfig::Offline { model } => Ok(Box::new(OfflineBackend::new(model))),
    }
}

// ============================================================================
// Anthropic API structs (private)
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<RequestMessage>,
}

#[derive(Debug, Serialize)]
struct RequestMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

// ============================================================================
// AnthropicExtractionClient
// ============================================================================

/// Anthropic extraction client, one Messages API call per extraction.
#[derive(Debug, Clone)]
pub struct AnthropicExtractionClient {
    client: Client,
    config: AnthropicConfig,
    base_url: String,
}

impl AnthropicExtractionClient {
    pub fn new(config: AnthropicConfig) -> Result<Self, ExtractionError> {
        Self::with_base_url(config, "https://api.anthropic.com".to_string())
    }

    /// Create a client with a custom base URL (for testing / proxies)
    pub fn with_base_url(config: AnthropicConfig, base_url: String) -> Result<Self, ExtractionError> {
        if config.api_key.is_empty() {
            return Err(ExtractionError::MissingApiKey);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn send(&self, prompt: String) -> Result<String, ExtractionError> {
        let url = format!("{}/v1/messages", self.base_url);

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Timeout {
                        timeout_seconds: self.config.timeout_seconds,
                    }
                } else {
                    ExtractionError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorResponse>(&error_body)
                .ok()
                .and_then(|e| e.error)
                .map(|e| e.message)
                .unwrap_or(error_body);

            tracing::error!(code = status.as_u16(), message = %message, "Anthropic API error");

            return Err(ExtractionError::Api {
                code: status.as_u16(),
                message,
            });
        }

        let body: MessagesResponse = response.json().await?;

        let text: String = body
            .content
            .into_iter()
            .filter(|block| block.block_type == "text")
            .filter_map(|block| block.text)
            .collect();

        if text.trim().is_empty() {
            return Err(ExtractionError::EmptyResponse);
        }

        Ok(text)
    }
}

#[async_trait]
impl ExtractionBackend for AnthropicExtractionClient {
    async fn extract(&self, text: &str, context: &str) -> Result<String, ExtractionError> {
        self.send(extraction_prompt(text, context)).await
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ============================================================================
// OfflineBackend
// ============================================================================

/// Replay-only backend. Needs no credential; every extraction fails with
/// `ExtractionError::Offline`, so only cached results are served.
#[derive(Debug, Clone)]
pub struct OfflineBackend {
    model: String,
}

impl OfflineBackend {
    pub fn new(model: String) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ExtractionBackend for OfflineBackend {
    async fn extract(&self, _text: &str, _context: &str) -> Result<String, ExtractionError> {
        Err(ExtractionError::Offline)
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "offline"
    }
}

// ============================================================================
// TESTS
// ============================================================================
