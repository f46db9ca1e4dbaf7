//! Subcommand implementations and shared helpers.

pub mod add;
pub mod init;
pub mod query;
pub mod stats;

use autocontext_client::AutoContextRagClient;
use autocontext_config::AppConfig;
use autocontext_core::MetadataValue;
use std::path::{Path, PathBuf};

pub fn default_config_path() -> PathBuf {
    AppConfig::config_dir().join("config.toml")
}

/// Load config from `path` with environment overrides. The CLI always
/// persists, so a missing `store.persist_path` falls back to the default.
pub fn load_config(path: &Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut config =
        AppConfig::load_with_env(path).map_err(|e| format!("Failed to load config: {e}"))?;
    if config.store.persist_path.is_none() {
        config.store.persist_path = Some(AppConfig::default_store_path());
    }
    Ok(config)
}

pub fn open_client(path: &Path) -> Result<AutoContextRagClient, Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    Ok(AutoContextRagClient::from_config(&config)?)
}

/// Parse `key=value`, inferring bool, integer, float, then string.
pub fn parse_key_value(raw: &str) -> Result<(String, MetadataValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    Ok((key.to_string(), parse_scalar(value)))
}

fn parse_scalar(value: &str) -> MetadataValue {
    if let Ok(b) = value.parse::<bool>() {
        return MetadataValue::Bool(b);
    }
    if let Ok(i) = value.parse::<i64>() {
        return MetadataValue::Int(i);
    }
    match value.parse::<f64>() {
        Ok(f) if f.is_finite() => MetadataValue::Float(f),
        _ => MetadataValue::Text(value.to_string()),
    }
}
