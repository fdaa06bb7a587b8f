//! DeepSeek chat-completion client.
//!
//! Speaks the OpenAI-compatible `/v1/chat/completions` format. One attempt
//! per call: the enricher has its own fallback, so retrying here would only
//! delay it.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::TextGenerator;
use crate::config::AdvisoryConfig;
use crate::types::PredictorError;

// ---------------------------------------------------------------------------
// API types (OpenAI-compatible)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    #[serde(default)]
    total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct DeepSeekClient {
    http: Client,
    url: String,
    api_key: SecretString,
    model: String,
    temperature: f64,
    max_tokens: u32,
}

impl DeepSeekClient {
    pub fn new(
        url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
        temperature: f64,
        max_tokens: u32,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build DeepSeek HTTP client")?;

        Ok(Self {
            http,
            url: url.into(),
            api_key,
            model: model.into(),
            temperature,
            max_tokens,
        })
    }

    /// Build a client from the `[advisory]` section and a resolved key.
    pub fn from_config(config: &AdvisoryConfig, api_key: SecretString) -> Result<Self> {
        Self::new(
            config.url.clone(),
            api_key,
            config.model.clone(),
            config.temperature,
            config.max_tokens,
            config.timeout(),
        )
    }
}

#[async_trait]
impl TextGenerator for DeepSeekClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user.to_string(),
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.url)
            .header(
                "Authorization",
                format!("Bearer {}", self.api_key.expose_secret()),
            )
            .json(&request)
            .send()
            .await
            .map_err(|e| PredictorError::Advisory(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(PredictorError::Advisory(format!(
                "HTTP {status} (model={}): {error_text}",
                self.model
            ))
            .into());
        }

        let body: ChatResponse = response
            .json()
            .await
            .context("Failed to parse DeepSeek response")?;

        let text = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .map(|m| m.content)
            .ok_or_else(|| PredictorError::Advisory("response had no choices".to_string()))?;

        debug!(
            model = %self.model,
            tokens = body.usage.map_or(0, |u| u.total_tokens),
            chars = text.len(),
            "Advisory completion received"
        );

        Ok(text)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
