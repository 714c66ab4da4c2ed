//! Configuration system for the rendezvous relay.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $RENDEZVOUS_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/rendezvous/config.toml
//!   3. ~/.config/rendezvous/config.toml

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

/// Port used when neither the config file nor the environment names one.
pub const DEFAULT_PORT: u16 = 9080;

/// Identifiers are drawn from `1..DEFAULT_ID_SPACE`.
pub const DEFAULT_ID_SPACE: u64 = 1_000_000;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RendezvousConfig {
    pub network: NetworkConfig,
    pub relay: RelayConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to listen on.
    pub bind_addr: IpAddr,
    /// TCP port for WebSocket clients.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Upper bound (exclusive) of the random identifier range.
    /// Raise it for deployments with many concurrent peers.
    pub id_space: u64,
    /// Outbound frames buffered per peer before new ones are dropped.
    pub send_queue: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Serve the read-only /api status endpoints.
    pub enabled: bool,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
        }
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            id_space: DEFAULT_ID_SPACE,
            send_queue: 256,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("rendezvous")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RendezvousConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            RendezvousConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a config file without consulting the environment.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RENDEZVOUS_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Socket address the relay listens on.
    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.network.bind_addr, self.network.port)
    }

    /// Reject values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.id_space < 2 {
            return Err(ConfigError::Invalid {
                field: "relay.id_space",
                reason: format!("must be at least 2, got {}", self.relay.id_space),
            });
        }
        if self.relay.send_queue == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.send_queue",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Apply env var overrides. `lookup` is `std::env::var` outside tests.
    ///
    /// `PORT` is honoured for hosting platforms that inject it;
    /// `RENDEZVOUS_NETWORK__PORT` takes precedence over it.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(p) = lookup("PORT").and_then(|v| v.trim().parse().ok()) {
            self.network.port = p;
        }
        if let Some(p) = lookup("RENDEZVOUS_NETWORK__PORT").and_then(|v| v.trim().parse().ok()) {
            self.network.port = p;
        }
        if let Some(a) = lookup("RENDEZVOUS_NETWORK__BIND_ADDR").and_then(|v| v.trim().parse().ok())
        {
            self.network.bind_addr = a;
        }
        if let Some(n) = lookup("RENDEZVOUS_RELAY__ID_SPACE").and_then(|v| v.trim().parse().ok()) {
            self.relay.id_space = n;
        }
        if let Some(n) = lookup("RENDEZVOUS_RELAY__SEND_QUEUE").and_then(|v| v.trim().parse().ok())
        {
            self.relay.send_queue = n;
        }
        if let Some(v) = lookup("RENDEZVOUS_API__ENABLED") {
            self.api.enabled = v == "true" || v == "1";
        }
    }
}
