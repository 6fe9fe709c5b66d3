//! Chat-completion provider.
//!
//! The assistant only needs "prompt in, text out". [`GeminiProvider`] talks to
//! the Gemini `generateContent` endpoint.

use crate::config::ChatConfig;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Text completion backend used by the assistant
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Model name shown in the dashboard status block
    fn model(&self) -> &str;

    /// Complete a fully rendered prompt (history already included)
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Builds a provider when the assistant handle is initialized.
///
/// Construction runs on every (re)initialization; an error leaves the
/// handle uninitialized.
pub trait ChatProviderFactory: Send + Sync {
    fn model(&self) -> &str;

    fn build(&self) -> Result<Arc<dyn ChatProvider>>;
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize, Debug)]
struct ErrorBody {
    message: String,
}

/// HTTP client for the Gemini generateContent API
pub struct GeminiProvider {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    temperature: f32,
    api_base: String,
}

impl GeminiProvider {
    pub fn new(config: &ChatConfig, api_key: String) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            api_key,
            model: config.model.clone(),
            temperature: config.temperature,
            api_base: config.api_base.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![Part { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
            },
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Calling chat provider");

        let response = self
            .http_client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send chat request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(anyhow!("Chat provider returned {}: {}", status, message));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse chat response")?;

        extract_text(parsed).ok_or_else(|| anyhow!("Chat provider returned no candidates"))
    }
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Builds [`GeminiProvider`]s from configuration
pub struct GeminiProviderFactory {
    config: ChatConfig,
}

impl GeminiProviderFactory {
    pub fn new(config: ChatConfig) -> Self {
        Self { config }
    }
}

impl ChatProviderFactory for GeminiProviderFactory {
    fn model(&self) -> &str {
        &self.config.model
    }

    fn build(&self) -> Result<Arc<dyn ChatProvider>> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| anyhow!("Chat API key is not configured (set SOCIALAI_CHAT_API_KEY)"))?;

        Ok(Arc::new(GeminiProvider::new(&self.config, api_key.to_string())))
    }
}
