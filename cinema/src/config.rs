//! Configuration management for the cinema application.
//!
//! Loads configuration from environment variables with sensible defaults.

use cinema_runtime::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// `PostgreSQL` event store configuration
    pub postgres: PostgresConfig,
    /// Command execution (retry) configuration
    pub commands: CommandConfig,
    /// Logging and metrics configuration
    pub observability: ObservabilityConfig,
    /// Per-slice toggles
    pub slices: SlicesConfig,
}

/// `PostgreSQL` configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// `PostgreSQL` connection URL. Unset means "use the in-memory store".
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Command execution configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandConfig {
    /// Attempts per command, the first one included
    pub max_attempts: usize,
    /// Backoff before the second attempt, in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Backoff cap, in milliseconds
    pub retry_max_delay_ms: u64,
    /// Backoff growth factor between attempts
    pub retry_multiplier: f64,
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log filter (trace, debug, info, warn, error, or a full `EnvFilter` directive)
    pub log_level: String,
    /// Install the Prometheus recorder
    pub metrics_enabled: bool,
    /// Address the scrape endpoint is advertised on
    pub metrics_addr: String,
}

/// Per-slice toggles
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlicesConfig {
    /// Accept `BlockSeats` commands
    pub block_seats_enabled: bool,
}

impl Config {
    /// Load configuration from the process environment (after `.env`, if any).
    #[must_use]
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "Loaded .env file");
        }
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any key/value source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> Option<T> {
            lookup(key).and_then(|s| s.parse().ok())
        }
        let lookup = &lookup;

        Self {
            postgres: PostgresConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: parse(lookup, "DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            },
            commands: CommandConfig {
                max_attempts: parse(lookup, "COMMAND_MAX_ATTEMPTS").unwrap_or(5),
                retry_initial_delay_ms: parse(lookup, "COMMAND_RETRY_INITIAL_DELAY_MS").unwrap_or(10),
                retry_max_delay_ms: parse(lookup, "COMMAND_RETRY_MAX_DELAY_MS").unwrap_or(1000),
                retry_multiplier: parse(lookup, "COMMAND_RETRY_MULTIPLIER").unwrap_or(2.0),
            },
            observability: ObservabilityConfig {
                log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
                metrics_enabled: parse(lookup, "METRICS_ENABLED").unwrap_or(false),
                metrics_addr: lookup("METRICS_ADDR").unwrap_or_else(|| "0.0.0.0:9090".to_string()),
            },
            slices: SlicesConfig {
                block_seats_enabled: parse(lookup, "BLOCK_SEATS_ENABLED").unwrap_or(true),
            },
        }
    }

    /// Retry policy for conflicting appends.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.commands.max_attempts)
            .initial_delay(Duration::from_millis(self.commands.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.commands.retry_max_delay_ms))
            .multiplier(self.commands.retry_multiplier)
            .build()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
