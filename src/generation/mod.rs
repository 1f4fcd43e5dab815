//! Text generation.
//!
//! [`Generator`] is the one call the engine makes to a language model.
//! [`ollama::OllamaGenerator`] is the bundled implementation.

pub mod ollama;

use thiserror::Error;

use crate::config::GenerationConfig;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("model server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode model response: {0}")]
    Decode(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// Prompt in, completion out.
///
/// Synchronous; async callers should use `tokio::task::spawn_blocking`.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Create a generator from config. Currently only `"ollama"` is supported.
pub fn create_generator(config: &GenerationConfig) -> anyhow::Result<Box<dyn Generator>> {
    match config.provider.as_str() {
        "ollama" => Ok(Box::new(ollama::OllamaGenerator::new(config)?)),
        other => anyhow::bail!("unknown generation provider: {other}. Supported: ollama"),
    }
}
