//! Server configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (PURSE_*)
//! - TOML configuration file

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "PURSE_CONFIG";

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host to bind every listener to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Donation feed (WebSocket) listener.
    #[serde(default)]
    pub pubsub: PubSubConfig,

    /// Top-up (stream) listener.
    #[serde(default)]
    pub topup: TopUpConfig,

    /// Balance query (datagram) listener.
    #[serde(default)]
    pub balance: BalanceConfig,

    /// Metrics configuration.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Donation feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PubSubConfig {
    /// HTTP port.
    #[serde(default = "default_pubsub_port")]
    pub port: u16,

    /// Path of the WebSocket endpoint.
    #[serde(default = "default_pubsub_path")]
    pub path: String,
}

/// Top-up listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopUpConfig {
    /// TCP port.
    #[serde(default = "default_topup_port")]
    pub port: u16,

    /// Maximum request size in bytes.
    #[serde(default = "default_max_request_size")]
    pub max_request_size: usize,

    /// Quiet period after which an unterminated request counts as complete.
    #[serde(default = "default_idle_timeout_ms")]
    pub idle_timeout_ms: u64,
}

/// Balance listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// UDP port.
    #[serde(default = "default_balance_port")]
    pub port: u16,

    /// Receive buffer size; larger datagrams are truncated.
    #[serde(default = "default_max_datagram_size")]
    pub max_datagram_size: usize,
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

fn env_port(name: &str) -> Option<u16> {
    std::env::var(name).ok().and_then(|p| p.parse().ok())
}

// Default value functions
fn default_host() -> String {
    std::env::var("PURSE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn default_pubsub_port() -> u16 {
    env_port("PURSE_PUBSUB_PORT").unwrap_or(8080)
}

fn default_pubsub_path() -> String {
    "/ws".to_string()
}

fn default_topup_port() -> u16 {
    env_port("PURSE_TOPUP_PORT").unwrap_or(8081)
}

fn default_max_request_size() -> usize {
    1024
}

fn default_idle_timeout_ms() -> u64 {
    250
}

fn default_balance_port() -> u16 {
    env_port("PURSE_BALANCE_PORT").unwrap_or(8082)
}

fn default_max_datagram_size() -> usize {
    1024
}

fn default_true() -> bool {
    true
}

fn default_metrics_port() -> u16 {
    9090
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            pubsub: PubSubConfig::default(),
            topup: TopUpConfig::default(),
            balance: BalanceConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Default for PubSubConfig {
    fn default() -> Self {
        Self {
            port: default_pubsub_port(),
            path: default_pubsub_path(),
        }
    }
}

impl Default for TopUpConfig {
    fn default() -> Self {
        Self {
            port: default_topup_port(),
            max_request_size: default_max_request_size(),
            idle_timeout_ms: default_idle_timeout_ms(),
        }
    }
}

impl Default for BalanceConfig {
    fn default() -> Self {
        Self {
            port: default_balance_port(),
            max_datagram_size: default_max_datagram_size(),
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

impl TopUpConfig {
    /// Idle window as a [`Duration`].
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_millis(self.idle_timeout_ms)
    }
}

impl Config {
    /// Load configuration from file or defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed.
    pub fn load() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return Self::from_file(shellexpand::tilde(&path).as_ref());
        }

        let config_paths = [
            "purse.toml",
            "/etc/purse/purse.toml",
            "~/.config/purse/purse.toml",
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

    /// Socket address for `port` on the configured host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address.
    pub fn socket_addr(&self, port: u16) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid host: {}", self.host))?;
        Ok(SocketAddr::new(ip, port))
    }

    /// Address of the metrics exporter on the configured host.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an IP address.
    pub fn metrics_addr(&self) -> Result<SocketAddr> {
        self.socket_addr(self.metrics.port)
    }

    /// Configuration bound to loopback on ephemeral ports, metrics off.
    #[must_use]
    pub fn ephemeral() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            pubsub: PubSubConfig {
                port: 0,
                path: default_pubsub_path(),
            },
            topup: TopUpConfig {
                port: 0,
                ..TopUpConfig::default()
            },
            balance: BalanceConfig {
                port: 0,
                ..BalanceConfig::default()
            },
            metrics: MetricsConfig {
                enabled: false,
                port: default_metrics_port(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.pubsub.path, "/ws");
        assert_eq!(config.topup.max_request_size, 1024);
        assert_eq!(config.balance.max_datagram_size, 1024);
        assert!(config.metrics.enabled);
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            ..Config::default()
        };
        let addr = config.socket_addr(8081).unwrap();
        assert_eq!(addr.port(), 8081);
        assert!(addr.ip().is_loopback());

        let bad = Config {
            host: "not a host".to_string(),
            ..Config::default()
        };
        assert!(bad.socket_addr(8081).is_err());
    }

    #[test]
    fn test_metrics_addr_uses_host() {
        let mut config = Config::ephemeral();
        config.metrics.port = 9191;
        assert_eq!(
            config.metrics_addr().unwrap(),
            "127.0.0.1:9191".parse::<SocketAddr>().unwrap()
        );
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            host = "0.0.0.0"

            [pubsub]
            port = 9000

            [topup]
            idle_timeout_ms = 10

            [metrics]
            enabled = false
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.pubsub.port, 9000);
        assert_eq!(config.pubsub.path, "/ws");
        assert_eq!(config.topup.idle_timeout(), Duration::from_millis(10));
        assert_eq!(config.topup.max_request_size, 1024);
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_ephemeral_config() {
        let config = Config::ephemeral();
        assert_eq!(config.socket_addr(config.topup.port).unwrap().port(), 0);
        assert!(!config.metrics.enabled);
    }
}
