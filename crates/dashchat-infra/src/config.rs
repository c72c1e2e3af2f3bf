//! Configuration loader for dashchat.
//!
//! Reads `config.toml` from the data directory (`~/.dashchat/` in
//! production) into [`AppConfig`], then applies `DASHCHAT_*` environment
//! overrides. Falls back to defaults when the file is missing or malformed.

use std::path::{Path, PathBuf};

use dashchat_types::config::AppConfig;

use crate::sqlite::pool::database_url_in;

pub const DATA_DIR_ENV: &str = "DASHCHAT_DATA_DIR";
pub const UPSTREAM_URL_ENV: &str = "DASHCHAT_UPSTREAM_URL";
pub const UPSTREAM_KEY_ENV: &str = "DASHCHAT_UPSTREAM_KEY";
pub const MODEL_ENV: &str = "DASHCHAT_MODEL";
pub const DATABASE_URL_ENV: &str = "DASHCHAT_DATABASE_URL";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `DASHCHAT_DATA_DIR` environment variable
/// 2. `~/.dashchat`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".dashchat");
    }

    // Last resort: current directory
    PathBuf::from(".dashchat")
}

/// Load `{data_dir}/config.toml` and apply process environment overrides.
pub async fn load_config(data_dir: &Path) -> AppConfig {
    let mut config = load_config_file(data_dir).await;
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    config
}

/// Load `{data_dir}/config.toml` alone.
///
/// - Missing file: defaults.
/// - Unreadable or unparsable file: warning, then defaults.
pub async fn load_config_file(data_dir: &Path) -> AppConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return AppConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return AppConfig::default();
        }
    };

    match toml::from_str::<AppConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            AppConfig::default()
        }
    }
}

/// Apply `DASHCHAT_*` overrides. Empty values are ignored.
pub fn apply_env_overrides(config: &mut AppConfig, lookup: impl Fn(&str) -> Option<String>) {
    let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    if let Some(url) = get(UPSTREAM_URL_ENV) {
        config.upstream.base_url = url;
    }
    if let Some(key) = get(UPSTREAM_KEY_ENV) {
        config.upstream.api_key = Some(key);
    }
    if let Some(model) = get(MODEL_ENV) {
        config.upstream.model = model;
    }
    if let Some(url) = get(DATABASE_URL_ENV) {
        config.database_url = Some(url);
    }
}

/// The configured database URL, or the default file in the data directory.
pub fn resolve_database_url(config: &AppConfig, data_dir: &Path) -> String {
    config
        .database_url
        .clone()
        .unwrap_or_else(|| database_url_in(data_dir))
}
