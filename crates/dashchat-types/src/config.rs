//! Configuration types for dashchat.
//!
//! `AppConfig` represents the top-level `config.toml` that controls the
//! upstream target, chat context sizing, and the HTTP listener.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the relay.
///
/// Loaded from `~/.dashchat/config.toml`. All fields have sensible defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub chat: ChatConfig,

    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite URL; defaults to `{data_dir}/dashchat.db` when unset.
    #[serde(default)]
    pub database_url: Option<String>,
}

/// Where and how to reach the upstream completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Base URL; `/v1/chat/completions` is appended.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Sent as a bearer credential only when present.
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_model")]
    pub model: String,

    /// Ceiling for a whole exchange, connect through last frame.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:18789".to_string()
}

fn default_model() -> String {
    "gpt-4o".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Conversation context sizing and persona.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Number of persisted turns replayed upstream.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,

    #[serde(default = "default_assistant_name")]
    pub assistant_name: String,
}

fn default_history_limit() -> u32 {
    20
}

fn default_assistant_name() -> String {
    "Dashboard Assistant".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            assistant_name: default_assistant_name(),
        }
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_config_default_values() {
        let config = AppConfig::default();
        assert_eq!(config.chat.history_limit, 20);
        assert_eq!(config.upstream.timeout_secs, 300);
        assert!(config.upstream.api_key.is_none());
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_app_config_deserialize_with_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.upstream.model, "gpt-4o");
        assert_eq!(config.chat.assistant_name, "Dashboard Assistant");
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_app_config_deserialize_with_values() {
        let toml_str = r#"
database_url = "sqlite:///tmp/dash.db"

[upstream]
base_url = "https://llm.internal"
api_key = "sk-test"
model = "claude-sonnet"
timeout_secs = 120

[chat]
history_limit = 8
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.upstream.base_url, "https://llm.internal");
        assert_eq!(config.upstream.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.upstream.timeout_secs, 120);
        assert_eq!(config.chat.history_limit, 8);
        assert_eq!(config.chat.assistant_name, "Dashboard Assistant");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.database_url.as_deref(), Some("sqlite:///tmp/dash.db"));
    }
}
