//! Server configuration.
//!
//! Every option is a command-line flag that can also be set through an
//! `AGORA_*` environment variable.

use std::{net::SocketAddr, time::Duration};

use clap::Parser;
use thiserror::Error;

/// Configuration errors detected at startup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("ping_interval_secs must be shorter than idle_timeout_secs")]
    PingNotBelowIdle,

    #[error("invalid listen address {0}")]
    InvalidAddress(String),
}

/// Real-time chat hub server
#[derive(Debug, Clone, Parser)]
#[command(name = "agora-server", version, about)]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "AGORA_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "AGORA_PORT", default_value_t = 8081)]
    pub port: u16,

    /// PostgreSQL URL; messages are kept in memory when unset
    #[arg(long, env = "AGORA_DATABASE_URL")]
    pub database_url: Option<String>,

    /// Size of the PostgreSQL connection pool
    #[arg(long, env = "AGORA_DATABASE_POOL_SIZE", default_value_t = 10)]
    pub database_pool_size: u32,

    /// Create the chat_messages table on startup if it is missing
    #[arg(long, env = "AGORA_RUN_MIGRATIONS", default_value_t = false)]
    pub run_migrations: bool,

    /// Shared secret used to verify HS256 access tokens
    #[arg(long, env = "AGORA_JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: String,

    /// Maximum number of concurrent WebSocket connections
    #[arg(long, env = "AGORA_MAX_CONNECTIONS", default_value_t = 100)]
    pub max_connections: usize,

    /// Capacity of each session's outbound queue
    #[arg(long, env = "AGORA_OUTBOUND_CAPACITY", default_value_t = 256)]
    pub outbound_capacity: usize,

    /// Messages older than this many minutes are deleted
    #[arg(long, env = "AGORA_RETENTION_MINUTES", default_value_t = 30)]
    pub retention_minutes: u64,

    /// Period of the background retention sweep, in seconds
    #[arg(long, env = "AGORA_SWEEP_INTERVAL_SECS", default_value_t = 300)]
    pub sweep_interval_secs: u64,

    /// Close a session that sends nothing for this many seconds
    #[arg(long, env = "AGORA_IDLE_TIMEOUT_SECS", default_value_t = 600)]
    pub idle_timeout_secs: u64,

    /// Ping each client this often so listen-only sessions stay alive
    #[arg(long, env = "AGORA_PING_INTERVAL_SECS", default_value_t = 30)]
    pub ping_interval_secs: u64,

    /// Give up on a single outbound write after this many seconds
    #[arg(long, env = "AGORA_WRITE_TIMEOUT_SECS", default_value_t = 10)]
    pub write_timeout_secs: u64,
}

impl ServerConfig {
    /// Reject values the hub cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks: [(&'static str, u64); 7] = [
            ("max_connections", self.max_connections as u64),
            ("outbound_capacity", self.outbound_capacity as u64),
            ("retention_minutes", self.retention_minutes),
            ("sweep_interval_secs", self.sweep_interval_secs),
            ("idle_timeout_secs", self.idle_timeout_secs),
            ("ping_interval_secs", self.ping_interval_secs),
            ("write_timeout_secs", self.write_timeout_secs),
        ];
        if let Some((name, _)) = checks.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { name });
        }
        if self.ping_interval_secs >= self.idle_timeout_secs {
            return Err(ConfigError::PingNotBelowIdle);
        }
        if self.database_url.is_some() && self.database_pool_size == 0 {
            return Err(ConfigError::Zero {
                name: "database_pool_size",
            });
        }
        self.listen_addr().map(|_| ())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddress(addr))
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_minutes.saturating_mul(60))
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_secs(self.ping_interval_secs)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }
}
