// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Listener configuration.
//!
//! Values are layered, later sources winning:
//!
//! 1. built-in defaults ([`ListenerConfig::default`])
//! 2. legacy `BENCHMARK_MESSAGES` environment variable
//! 3. an optional TOML file
//! 4. `LISTENER_*` environment variables, e.g. `LISTENER_QUEUE_CAPACITY`
//!
//! The older names `LISTENER_KAFKA_TOPIC` and `LISTENER_BUFFER_SIZE` are
//! accepted as aliases of `topic` and `queue_capacity`.

use std::fmt;
use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::path::Path;
use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::executor::ExecutorConfig;

/// Prefix of the environment variables read by [`ListenerConfig::load`].
pub const ENV_PREFIX: &str = "LISTENER";

/// Legacy variable holding the benchmark batch size.
pub const BENCHMARK_MESSAGES_VAR: &str = "BENCHMARK_MESSAGES";

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or deserialized.
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Where messages are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Newline-delimited payloads on standard input.
    Stdin,
    /// A Redis list named after the topic.
    Redis,
}

/// Where host records are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Process memory.
    Memory,
    /// PostgreSQL `hosts` table.
    Postgres,
}

impl FromStr for SourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown source '{other}', expected stdin or redis")),
        }
    }
}

impl FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => Err(format!("unknown sink '{other}', expected memory or postgres")),
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stdin => "stdin",
            Self::Redis => "redis",
        })
    }
}

impl fmt::Display for SinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Postgres => "postgres",
        })
    }
}

/// Complete listener configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Topic (message source) to subscribe to.
    #[serde(alias = "kafka_topic")]
    pub topic: String,
    /// Tasks allowed to wait for a worker before submission blocks.
    #[serde(alias = "buffer_size")]
    pub queue_capacity: usize,
    /// Worker pool size.
    pub worker_count: usize,
    /// Messages per benchmark window.
    pub batch_size: usize,
    /// Message source backend.
    pub source: SourceKind,
    /// Redis connection URL for [`SourceKind::Redis`].
    pub redis_url: String,
    /// Persistence backend.
    pub sink: SinkKind,
    /// PostgreSQL connection URL, required for [`SinkKind::Postgres`].
    pub database_url: Option<String>,
    /// Delete every stored host before consuming.
    pub clean_on_start: bool,
    /// Address for the Prometheus scrape endpoint, disabled when unset.
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            topic: "host.packages".to_string(),
            queue_capacity: 10,
            worker_count: 8,
            batch_size: 30,
            source: SourceKind::Stdin,
            redis_url: "redis://localhost:6379".to_string(),
            sink: SinkKind::Memory,
            database_url: None,
            clean_on_start: true,
            metrics_addr: None,
        }
    }
}

impl ListenerConfig {
    /// Load from defaults, the optional file at `path` and the environment.
    ///
    /// The result is not validated, so command-line overrides can still be
    /// applied; call [`validate`](Self::validate) before use.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Ok(batch_size) = std::env::var(BENCHMARK_MESSAGES_VAR) {
            builder = builder.set_default("batch_size", batch_size)?;
        }
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Parse a TOML document layered over the defaults, then validate.
    pub fn from_toml(toml: &str) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and cross-field requirements.
    pub fn validate(&self) -> Result<()> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::Invalid("topic must not be empty".to_string()));
        }
        self.executor_config()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.batch_size()?;
        if self.sink == SinkKind::Postgres && self.database_url.is_none() {
            return Err(ConfigError::Invalid(
                "database_url is required for the postgres sink".to_string(),
            ));
        }
        Ok(())
    }

    /// Executor sizing derived from this configuration.
    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::new(self.queue_capacity, self.worker_count)
    }

    /// Benchmark window size.
    pub fn batch_size(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.batch_size)
            .ok_or_else(|| ConfigError::Invalid("batch_size must be greater than 0".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch process environment variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_defaults_are_valid() {
        let config = ListenerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.topic, "host.packages");
        assert_eq!(config.executor_config(), ExecutorConfig::new(10, 8));
        assert_eq!(config.batch_size().unwrap().get(), 30);
    }

    #[test]
    fn test_from_toml_overrides_defaults() {
        let config = ListenerConfig::from_toml(
            r#"
            topic = "inventory"
            queue_capacity = 2
            worker_count = 1
            batch_size = 3
            sink = "postgres"
            database_url = "postgres://localhost/hosts"
            "#,
        )
        .unwrap();

        assert_eq!(config.topic, "inventory");
        assert_eq!(config.executor_config(), ExecutorConfig::new(2, 1));
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.sink, SinkKind::Postgres);
        assert_eq!(config.source, SourceKind::Stdin);
        assert!(config.clean_on_start);
    }

    #[test]
    fn test_legacy_aliases() {
        let config = ListenerConfig::from_toml(
            r#"
            kafka_topic = "host.legacy"
            buffer_size = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.topic, "host.legacy");
        assert_eq!(config.queue_capacity, 4);
    }

    #[test]
    fn test_rejects_zero_sizes() {
        for toml in ["queue_capacity = 0", "worker_count = 0", "batch_size = 0"] {
            let err = ListenerConfig::from_toml(toml).unwrap_err();
            assert!(matches!(err, ConfigError::Invalid(_)), "{toml}: {err}");
        }
    }

    #[test]
    fn test_postgres_requires_database_url() {
        let err = ListenerConfig::from_toml(r#"sink = "postgres""#).unwrap_err();
        assert!(err.to_string().contains("database_url"));
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Redis".parse::<SourceKind>().unwrap(), SourceKind::Redis);
        assert_eq!("postgresql".parse::<SinkKind>().unwrap(), SinkKind::Postgres);
        assert!("kafka".parse::<SourceKind>().is_err());
        assert_eq!(SinkKind::Memory.to_string(), "memory");
    }

    #[test]
    fn test_load_reads_environment() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("LISTENER_WORKER_COUNT", "3");
        std::env::set_var("LISTENER_SOURCE", "redis");
        let config = ListenerConfig::load(None).unwrap();
        std::env::remove_var("LISTENER_WORKER_COUNT");
        std::env::remove_var("LISTENER_SOURCE");

        assert_eq!(config.worker_count, 3);
        assert_eq!(config.source, SourceKind::Redis);
    }

    #[test]
    fn test_load_leaves_validation_to_caller() {
        let _env = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        std::env::set_var("LISTENER_QUEUE_CAPACITY", "0");
        let loaded = ListenerConfig::load(None);
        std::env::remove_var("LISTENER_QUEUE_CAPACITY");

        let mut config = loaded.unwrap();
        assert_eq!(config.queue_capacity, 0);
        assert!(config.validate().is_err());

        config.queue_capacity = 4;
        assert!(config.validate().is_ok());
    }
}
