//! Configuration loading, validation, and management for AutoContext.
//!
//! Loads configuration from `~/.autocontext/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use autocontext_core::{CapacityMode, EvictionPolicy, PackingStrategy, TokenizerKind};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.autocontext/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Entry store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Retrieval / packing defaults
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// "openai", "ollama", "custom" or "hashing"
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// Base URL of an OpenAI-compatible endpoint (required for "custom")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Expected vector dimension. When unset the first stored entry fixes it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,

    /// Per-attempt timeout for a provider call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries after the first attempt, for retryable failures only
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for exponential backoff between retries
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,
}

fn default_embedding_provider() -> String {
    "openai".into()
}
fn default_embedding_model() -> String {
    "text-embedding-3-small".into()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_max_retries() -> u32 {
    2
}
fn default_backoff_ms() -> u64 {
    200
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            base_url: None,
            model: default_embedding_model(),
            api_key: None,
            dimension: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            backoff_ms: default_backoff_ms(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for EmbeddingConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingConfig")
            .field("provider", &self.provider)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &redact(&self.api_key))
            .field("dimension", &self.dimension)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("backoff_ms", &self.backoff_ms)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of entries (`N_max`)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    #[serde(default)]
    pub eviction: EvictionPolicy,

    #[serde(default)]
    pub on_full: CapacityMode,

    /// JSONL checkpoint file. `None` keeps the store in memory only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persist_path: Option<PathBuf>,

    #[serde(default = "default_true")]
    pub checkpoint_on_write: bool,

    #[serde(default)]
    pub tokenizer: TokenizerKind,
}

fn default_max_entries() -> usize {
    10_000
}
fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
            eviction: EvictionPolicy::default(),
            on_full: CapacityMode::default(),
            persist_path: None,
            checkpoint_on_write: true,
            tokenizer: TokenizerKind::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Token budget used when a request does not specify one
    #[serde(default = "default_max_tokens")]
    pub default_max_tokens: usize,

    /// Entry cap used when a request does not specify one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_max_entries: Option<usize>,

    /// Candidates scoring below this are never packed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_score: Option<f32>,

    #[serde(default)]
    pub packing: PackingStrategy,
}

fn default_max_tokens() -> usize {
    2048
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_max_tokens: default_max_tokens(),
            default_max_entries: None,
            min_score: None,
            packing: PackingStrategy::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.autocontext/config.toml),
    /// then apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_env(&Self::config_dir().join("config.toml"))
    }

    /// Load from `path`, then apply environment overrides.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides through `lookup`.
    ///
    /// - `AUTOCONTEXT_API_KEY` (falls back to `OPENAI_API_KEY`), only if no key is configured
    /// - `AUTOCONTEXT_EMBEDDING_PROVIDER`, `AUTOCONTEXT_EMBEDDING_MODEL`, `AUTOCONTEXT_EMBEDDING_URL`
    /// - `AUTOCONTEXT_MAX_ENTRIES`, `AUTOCONTEXT_DEFAULT_MAX_TOKENS`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if self.embedding.api_key.is_none() {
            self.embedding.api_key =
                lookup("AUTOCONTEXT_API_KEY").or_else(|| lookup("OPENAI_API_KEY"));
        }
        if let Some(provider) = lookup("AUTOCONTEXT_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Some(model) = lookup("AUTOCONTEXT_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(url) = lookup("AUTOCONTEXT_EMBEDDING_URL") {
            self.embedding.base_url = Some(url);
        }
        if let Some(raw) = lookup("AUTOCONTEXT_MAX_ENTRIES") {
            self.store.max_entries = parse_env("AUTOCONTEXT_MAX_ENTRIES", &raw)?;
        }
        if let Some(raw) = lookup("AUTOCONTEXT_DEFAULT_MAX_TOKENS") {
            self.retrieval.default_max_tokens = parse_env("AUTOCONTEXT_DEFAULT_MAX_TOKENS", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".autocontext")
    }

    /// Default checkpoint location used by the CLI.
    pub fn default_store_path() -> PathBuf {
        Self::config_dir().join("store").join("entries.jsonl")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_entries == 0 {
            return Err(ConfigError::ValidationError(
                "store.max_entries must be > 0".into(),
            ));
        }
        if self.embedding.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.timeout_secs must be > 0".into(),
            ));
        }
        if self.embedding.dimension == Some(0) {
            return Err(ConfigError::ValidationError(
                "embedding.dimension must be > 0".into(),
            ));
        }
        if self.retrieval.default_max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.default_max_tokens must be > 0".into(),
            ));
        }
        if let Some(min) = self.retrieval.min_score {
            if !(-1.0..=1.0).contains(&min) {
                return Err(ConfigError::ValidationError(
                    "retrieval.min_score must be between -1.0 and 1.0".into(),
                ));
            }
        }
        Ok(())
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} is not a valid number: {raw}")))
}

/// Base directory for `.autocontext`, falling back to the temp dir when no
/// home variable is set.
fn dirs_home() -> PathBuf {
    let var = if cfg!(windows) { "USERPROFILE" } else { "HOME" };
    std::env::var_os(var)
        .filter(|home| !home.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
