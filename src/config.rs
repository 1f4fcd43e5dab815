use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::query::budget::ContextBudget;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RecallConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub tokenizer: TokenizerConfig,
    pub generation: GenerationConfig,
    pub context: ContextConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub model: String,
    pub cache_dir: String,
}

/// Which tokenizer vocabulary the budget planner counts with.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TokenizerConfig {
    /// `"huggingface"` (a `tokenizer.json` file) or `"approx"` (bytes / 4).
    pub provider: String,
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: String,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

/// Context window sizing handed to the budget planner.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ContextConfig {
    pub model_context_window: usize,
    pub answer_buffer_tokens: usize,
    /// Optional tighter ceiling. `None` or `0` means "use window minus buffer".
    pub context_target_tokens: Option<usize>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_k: usize,
    /// Scope similarity search to today's transcripts on the default chat path.
    pub scope_to_today: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_recall_dir()
            .join("transcripts.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = default_recall_dir()
            .join("models")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "local".into(),
            model: "bge-small-en-v1.5".into(),
            cache_dir,
        }
    }
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        let path = default_recall_dir()
            .join("models")
            .join("tokenizer.json")
            .to_string_lossy()
            .into_owned();
        Self {
            provider: "huggingface".into(),
            path,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".into(),
            base_url: "http://localhost:11434".into(),
            model: "llama3.1:latest".into(),
            timeout_secs: 120,
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            model_context_window: 8192,
            answer_buffer_tokens: 1000,
            context_target_tokens: None,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_k: 5,
            scope_to_today: true,
        }
    }
}

/// Returns `~/.lifelog-recall/`, or `./.lifelog-recall/` when no home directory is known.
pub fn default_recall_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".lifelog-recall")
}

/// Returns the default config file path: `~/.lifelog-recall/config.toml`
pub fn default_config_path() -> PathBuf {
    default_recall_dir().join("config.toml")
}

impl RecallConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RecallConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `LIFELOG_*` environment variable overrides.
    ///
    /// Numeric overrides that do not parse are logged and ignored.
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("LIFELOG_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("LIFELOG_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("LIFELOG_OLLAMA_URL") {
            self.generation.base_url = val;
        }
        if let Ok(val) = std::env::var("LIFELOG_MODEL") {
            self.generation.model = val;
        }
        if let Some(val) = numeric_env("LIFELOG_CONTEXT_WINDOW") {
            self.context.model_context_window = val;
        }
        if let Some(val) = numeric_env("LIFELOG_ANSWER_BUFFER") {
            self.context.answer_buffer_tokens = val;
        }
        if let Some(val) = numeric_env("LIFELOG_CONTEXT_TARGET") {
            self.context.context_target_tokens = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    pub fn context_budget(&self) -> ContextBudget {
        ContextBudget {
            context_window: self.context.model_context_window,
            answer_reserve: self.context.answer_buffer_tokens,
            target_override: self.context.context_target_tokens,
        }
    }
}

fn numeric_env(key: &str) -> Option<usize> {
    let raw = std::env::var(key).ok()?;
    match raw.trim().parse::<usize>() {
        Ok(val) => Some(val),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring non-numeric override");
            None
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
