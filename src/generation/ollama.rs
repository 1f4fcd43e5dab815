//! Ollama `/api/generate` client.

use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use super::{GenerationError, Generator};
use crate::config::GenerationConfig;

/// Blocking client for a local Ollama server.
///
/// Must be created and used off the async runtime (e.g. inside
/// `spawn_blocking`), as required by `reqwest::blocking`.
pub struct OllamaGenerator {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaGenerator {
    pub fn new(config: &GenerationConfig) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("failed to create HTTP client")?;

        let url = generate_url(&config.base_url);
        tracing::info!(url = %url, model = %config.model, "ollama generator ready");

        Ok(Self {
            client,
            url,
            model: config.model.clone(),
        })
    }
}

fn generate_url(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "sending prompt to ollama");

        let response = self
            .client
            .post(&self.url)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .map_err(|e| GenerationError::Request {
                url: self.url.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| GenerationError::Decode(e.to_string()))?;

        let text = parsed.response.trim();
        if text.is_empty() {
            return Err(GenerationError::EmptyResponse);
        }
        tracing::debug!(answer_len = text.len(), "received ollama response");
        Ok(text.to_string())
    }
}
