//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory with the browser client's assets
    pub static_dir: PathBuf,
    /// Allowed client origins for CORS; empty allows any
    pub client_origins: Vec<String>,
    /// Seed for spawn placement; random when unset
    pub arena_seed: Option<u64>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR, as most hosts only set PORT
        let server_addr = match var("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => var("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
        };

        let arena_seed = var("ARENA_SEED")
            .map(|s| s.parse::<u64>().map_err(|_| ConfigError::Invalid("ARENA_SEED")))
            .transpose()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            static_dir: var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("public")),

            client_origins: var("CLIENT_ORIGIN")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),

            arena_seed,
        })
    }
}

/// Settings for the headless client binary
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket endpoint of the arena server
    pub arena_url: String,
    pub bot_name: String,
    pub log_level: String,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            arena_url: var("ARENA_URL").unwrap_or_else(|| "ws://127.0.0.1:3000/ws".to_string()),
            bot_name: var("BOT_NAME").unwrap_or_else(|| "bot".to_string()),
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.server_addr.port(), 3000);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.static_dir, PathBuf::from("public"));
        assert!(config.client_origins.is_empty());
        assert_eq!(config.arena_seed, None);
    }

    #[test]
    fn port_overrides_server_addr() {
        let config = load(&[("PORT", "8123"), ("SERVER_ADDR", "127.0.0.1:9000")]).unwrap();
        assert_eq!(config.server_addr.port(), 8123);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = load(&[("CLIENT_ORIGIN", "http://a.test, http://b.test,")]).unwrap();
        assert_eq!(config.client_origins, vec!["http://a.test", "http://b.test"]);
    }

    #[test]
    fn client_defaults_and_overrides() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.arena_url, "ws://127.0.0.1:3000/ws");
        assert_eq!(config.bot_name, "bot");

        let config = ClientConfig::from_lookup(|key| match key {
            "BOT_NAME" => Some("rusty".to_string()),
            _ => None,
        });
        assert_eq!(config.bot_name, "rusty");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn bad_values_are_errors() {
        assert!(matches!(load(&[("SERVER_ADDR", "nope")]), Err(ConfigError::InvalidAddress)));
        assert!(matches!(
            load(&[("ARENA_SEED", "abc")]),
            Err(ConfigError::Invalid("ARENA_SEED"))
        ));
    }
}
