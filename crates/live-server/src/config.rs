//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (OFREZCO_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use ofrezco_live_core::BrokerConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Endpoint paths.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resource limits.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Keep-alive configuration.
    #[serde(default)]
    pub heartbeat: HeartbeatConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Marketplace database.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// How the caller identity reaches this server.
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Chat behavior.
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Endpoint paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Path for the chat WebSocket endpoint.
    #[serde(default = "default_ws_path")]
    pub websocket_path: String,

    /// Prefix for the HTTP API.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

/// Resource limits configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Maximum inbound message size in bytes.
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,

    /// Outbound queue capacity per connection.
    #[serde(default = "default_outbound_queue")]
    pub outbound_queue_capacity: usize,
}

/// Keep-alive configuration.
///
/// The server pings every `interval_ms` and closes a connection that has
/// been silent for `timeout_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatConfig {
    /// Ping interval in milliseconds.
    #[serde(default = "default_heartbeat_interval")]
    pub interval_ms: u64,

    /// Idle timeout in milliseconds.
    #[serde(default = "default_heartbeat_timeout")]
    pub timeout_ms: u64,
}

/// Metrics configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Enable metrics export.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics port.
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite URL of the marketplace database. Without one, an empty
    /// in-memory store is used.
    #[serde(default = "default_database_url")]
    pub url: Option<String>,

    /// Pool size.
    #[serde(default = "default_db_connections")]
    pub max_connections: u32,
}

/// Caller identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Request header carrying the authenticated user id, set by the
    /// session layer in front of this server.
    #[serde(default = "default_identity_header")]
    pub header: String,
}

/// Chat configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Text of the system frame sent on connect.
    #[serde(default = "default_welcome_text")]
    pub welcome_text: String,
}

// Default value functions
fn default_host() -> String {
    std::env::var("OFREZCO_HOST").unwrap_or_else(|_| "127.0.0.1".to_string())
}

fn default_port() -> u16 {
    std::env::var("OFREZCO_PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(8000)
}

fn default_true() -> bool {
    true
}

fn default_ws_path() -> String {
    "/ws/chat".to_string()
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_max_message_size() -> usize {
    64 * 1024 // 64 KB
}

fn default_outbound_queue() -> usize {
    256
}

fn default_heartbeat_interval() -> u64 {
    30_000 // 30 seconds
}

fn default_heartbeat_timeout() -> u64 {
    90_000 // 90 seconds
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_database_url() -> Option<String> {
    std::env::var("OFREZCO_DATABASE_URL").ok()
}

fn default_db_connections() -> u32 {
    5
}

fn default_identity_header() -> String {
    "x-user-id".to_string()
}

fn default_welcome_text() -> String {
    ofrezco_live_core::broker::DEFAULT_WELCOME_TEXT.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            transport: TransportConfig::default(),
            limits: LimitsConfig::default(),
            heartbeat: HeartbeatConfig::default(),
            metrics: MetricsConfig::default(),
            database: DatabaseConfig::default(),
            identity: IdentityConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            websocket_path: default_ws_path(),
            api_prefix: default_api_prefix(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            outbound_queue_capacity: default_outbound_queue(),
        }
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_heartbeat_interval(),
            timeout_ms: default_heartbeat_timeout(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_metrics_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_db_connections(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            header: default_identity_header(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            welcome_text: default_welcome_text(),
        }
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        let config_paths = [
            "ofrezco-live.toml",
            "/etc/ofrezco-live/ofrezco-live.toml",
            "~/.config/ofrezco-live/ofrezco-live.toml",
        ];

        for path in &config_paths {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                return Self::from_file(expanded.as_ref());
            }
        }

        // Fall back to defaults with environment overrides
        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Get the socket address to bind to.
    ///
    /// # Errors
    ///
    /// Returns an error if host and port do not form a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.host, self.port))
    }

    /// Broker settings derived from this configuration.
    #[must_use]
    pub fn broker_config(&self) -> BrokerConfig {
        BrokerConfig {
            outbound_capacity: self.limits.outbound_queue_capacity,
            welcome_text: self.chat.welcome_text.clone(),
        }
    }

    /// Path of an endpoint under the API prefix.
    #[must_use]
    pub fn api_path(&self, path: &str) -> String {
        format!("{}{}", self.transport.api_prefix.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transport.websocket_path, "/ws/chat");
        assert_eq!(config.identity.header, "x-user-id");
        assert_eq!(config.chat.welcome_text, "Conectado al chat");
        assert!(config.heartbeat.timeout_ms > config.heartbeat.interval_ms);
    }

    #[test]
    fn test_config_bind_addr() {
        let mut config = Config::default();
        config.host = "127.0.0.1".to_string();
        config.port = 8000;
        assert_eq!(config.bind_addr().unwrap().port(), 8000);

        config.host = "not a host".to_string();
        assert!(config.bind_addr().is_err());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"
            port = 9000

            [limits]
            outbound_queue_capacity = 32

            [database]
            url = "sqlite://marketplace.db"

            [chat]
            welcome_text = "Connected"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 9000);
        assert_eq!(config.limits.outbound_queue_capacity, 32);
        assert_eq!(config.limits.max_message_size, 64 * 1024);
        assert_eq!(config.database.url.as_deref(), Some("sqlite://marketplace.db"));

        let broker = config.broker_config();
        assert_eq!(broker.outbound_capacity, 32);
        assert_eq!(broker.welcome_text, "Connected");
    }

    #[test]
    fn test_api_path() {
        let mut config = Config::default();
        assert_eq!(config.api_path("/interests/poll"), "/api/v1/interests/poll");

        config.transport.api_prefix = "/api/".to_string();
        assert_eq!(config.api_path("/interests/poll"), "/api/interests/poll");
    }
}
