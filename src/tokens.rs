//! Token counting for prompt budgeting.
//!
//! The engine counts every piece of prompt text with one [`TokenCounter`] for
//! its whole lifetime, and always on the exact text that will appear in the
//! assembled prompt.

use std::path::Path;

use anyhow::Result;
use tokenizers::Tokenizer;

use crate::config::TokenizerConfig;

/// Deterministic text → token count for a fixed vocabulary.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Counts with a Hugging Face `tokenizer.json` vocabulary.
pub struct HuggingFaceTokenCounter {
    tokenizer: Tokenizer,
}

impl HuggingFaceTokenCounter {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        anyhow::ensure!(
            path.exists(),
            "tokenizer not found at {}. Run `lifelog-recall model download` first.",
            path.display()
        );

        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| anyhow::anyhow!("failed to load tokenizer: {e}"))?;
        // Counts must cover the whole text.
        tokenizer
            .with_truncation(None)
            .map_err(|e| anyhow::anyhow!("failed to disable truncation: {e}"))?;
        tokenizer.with_padding(None);

        tracing::info!(tokenizer = %path.display(), "token counter loaded");
        Ok(Self { tokenizer })
    }
}

impl TokenCounter for HuggingFaceTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        match self.tokenizer.encode(text, false) {
            Ok(encoding) => encoding.len(),
            Err(e) => {
                // Byte length never undercounts a subword vocabulary.
                tracing::error!(error = %e, "tokenization failed, counting bytes instead");
                text.len()
            }
        }
    }
}

/// Four bytes per token, rounded up. Used when no tokenizer file is available.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproxTokenCounter;

impl TokenCounter for ApproxTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.len().div_ceil(4)
    }
}

/// Create a token counter from config: `"huggingface"` or `"approx"`.
pub fn create_counter(config: &TokenizerConfig) -> Result<Box<dyn TokenCounter>> {
    match config.provider.as_str() {
        "huggingface" => {
            let path = crate::config::expand_tilde(&config.path);
            Ok(Box::new(HuggingFaceTokenCounter::from_file(path)?))
        }
        "approx" => Ok(Box::new(ApproxTokenCounter)),
        other => anyhow::bail!("unknown tokenizer provider: {other}. Supported: huggingface, approx"),
    }
}
