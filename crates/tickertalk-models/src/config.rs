use serde::{Deserialize, Serialize};

use crate::session_schema::DEFAULT_CHECKPOINT_NAMESPACE;

/// Top-level configuration for tickertalk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickertalkConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub agents: AgentsConfig,
}

/// Configuration for the session store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database holding sessions and checkpoints.
    pub sqlite_path: String,
    /// Maximum number of session histories kept in the in-memory cache.
    pub history_cache_capacity: u64,
    /// How long a cached history stays in memory, in seconds.
    pub history_cache_ttl_seconds: u64,
    /// How long a writer waits on a locked database before failing, in milliseconds.
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sqlite_path: "data/tickertalk.db".to_string(),
            history_cache_capacity: 1_000,
            history_cache_ttl_seconds: 300,
            busy_timeout_ms: 5_000,
        }
    }
}

/// Configuration for the market-data gateway.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Name of the environment variable holding the API credential.
    pub api_key_env: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "https://stock.indianapi.in".to_string(),
            api_key_env: "INDIAN_API_KEY".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Configuration for the supervisor and its two sub-agents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AgentsConfig {
    pub supervisor_model: String,
    pub collector_model: String,
    pub analyst_model: String,
    /// Timeout for a single model invocation in seconds.
    pub model_timeout_seconds: u64,
    /// Sub-agent calls allowed per turn before the supervisor must answer.
    pub max_tool_calls: usize,
    /// Checkpoint namespace of the supervisor conversation.
    pub checkpoint_namespace: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            supervisor_model: "claude-sonnet-4-5-20250929".to_string(),
            collector_model: "claude-3-5-haiku-latest".to_string(),
            analyst_model: "claude-sonnet-4-5-20250929".to_string(),
            model_timeout_seconds: 90,
            max_tool_calls: 4,
            checkpoint_namespace: DEFAULT_CHECKPOINT_NAMESPACE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_config() {
        let config = TickertalkConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let deserialized: TickertalkConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn gateway_defaults() {
        let gateway = GatewayConfig::default();
        assert_eq!(gateway.base_url, "https://stock.indianapi.in");
        assert_eq!(gateway.api_key_env, "INDIAN_API_KEY");
        assert_eq!(gateway.timeout_seconds, 10);
    }

    #[test]
    fn config_from_toml() {
        let toml_str = r#"
[store]
sqlite_path = "/tmp/chat.db"

[gateway]
timeout_seconds = 5

[agents]
max_tool_calls = 2
collector_model = "claude-3-5-haiku-latest"
"#;

        let config: TickertalkConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.store.sqlite_path, "/tmp/chat.db");
        assert_eq!(config.store.history_cache_capacity, 1_000);
        assert_eq!(config.gateway.timeout_seconds, 5);
        assert_eq!(config.gateway.base_url, "https://stock.indianapi.in");
        assert_eq!(config.agents.max_tool_calls, 2);
        assert_eq!(config.agents.checkpoint_namespace, "chat");
    }

    #[test]
    fn empty_toml_is_all_defaults() {
        let config: TickertalkConfig = toml::from_str("").unwrap();
        assert_eq!(config, TickertalkConfig::default());
    }
}
