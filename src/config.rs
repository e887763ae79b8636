//! # Configuration
//!
//! Layered service configuration.
//!
//! Sources, later overriding earlier:
//!
//! 1. **Compiled defaults**: every section implements `Default`
//! 2. **TOML file**: `REMIT_CONFIG`, default `config/remit.toml`, optional
//! 3. **Environment variables**: `REMIT__*`, `__` separating nested keys
//!    (e.g. `REMIT__CACHE__BACKEND=redis`, `REMIT__SERVER__PORT=9000`)
//!
//! # Sections
//!
//! - `server`: bind address and shutdown grace period
//! - `cache`: backend selection and per-tier TTLs
//! - `aggregation`: provider timeouts and concurrency ceiling
//! - `persistence`: database and retention
//! - `refresh`: background refresh jobs
//! - `logging`: level and output format
//! - `providers`: fixed rate provider tables

use crate::application::error::InfrastructureError;
use crate::application::jobs::refresh::RefreshConfig;
use crate::application::services::quote_aggregation::AggregationConfig;
use crate::application::services::tiered_cache::{CacheTtlConfig, TtlPolicy};
use crate::infrastructure::providers::FixedRateProviderConfig;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "REMIT_CONFIG";
/// Config file used when [`CONFIG_PATH_ENV`] is unset.
pub const DEFAULT_CONFIG_PATH: &str = "config/remit.toml";
/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "REMIT";

/// HTTP server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind.
    pub bind_address: String,
    /// Port to bind.
    pub port: u16,
    /// Grace period for in-flight requests on shutdown, in seconds.
    pub shutdown_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_secs: 10,
        }
    }
}

impl ServerConfig {
    /// `address:port` to bind.
    #[must_use]
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}

/// Cache store backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// Process-local map.
    #[default]
    Memory,
    /// Shared Redis server.
    Redis,
}

/// Cache settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backend to use.
    pub backend: CacheBackend,
    /// Redis URL, required for the Redis backend.
    pub redis_url: Option<String>,
    /// Prefix added to every Redis key.
    pub key_prefix: Option<String>,
    /// Seconds between expired-entry purges of the memory backend.
    pub cleanup_interval_secs: u64,
    /// Per-tier TTLs.
    pub ttl: CacheTtlConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            key_prefix: None,
            cleanup_interval_secs: 60,
            ttl: CacheTtlConfig::default(),
        }
    }
}

impl CacheConfig {
    /// Interval between expired-entry purges.
    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

/// Durable storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// Whether successful quotes are persisted at all.
    pub enabled: bool,
    /// PostgreSQL URL; records stay in memory when unset.
    pub database_url: Option<String>,
    /// Records older than this many days are purged by the daily sweep.
    pub retention_days: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            database_url: None,
            retention_days: 30,
        }
    }
}

impl PersistenceConfig {
    /// Retention window.
    #[must_use]
    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_days.saturating_mul(24 * 3600))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP server.
    pub server: ServerConfig,
    /// Cache.
    pub cache: CacheConfig,
    /// Provider fan-out.
    pub aggregation: AggregationConfig,
    /// Durable storage.
    pub persistence: PersistenceConfig,
    /// Background jobs.
    pub refresh: RefreshConfig,
    /// Logging.
    pub logging: LoggingConfig,
    /// Fixed rate providers.
    pub providers: Vec<FixedRateProviderConfig>,
}

impl AppConfig {
    /// Loads configuration from `path` (if it exists) and `REMIT__*`
    /// environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(&path.as_ref().to_string_lossy()).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Loads configuration from `REMIT_CONFIG` or `config/remit.toml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(path)
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns `InfrastructureError::Configuration` describing the first
    /// violation.
    pub fn validate(&self) -> Result<(), InfrastructureError> {
        let agg = &self.aggregation;
        if agg.min_provider_timeout_ms == 0 || agg.min_provider_timeout_ms > agg.max_provider_timeout_ms {
            return Err(InfrastructureError::configuration(format!(
                "aggregation provider timeout bounds {}..{}ms are invalid",
                agg.min_provider_timeout_ms, agg.max_provider_timeout_ms
            )));
        }
        if agg.request_timeout_ms == 0 {
            return Err(InfrastructureError::configuration(
                "aggregation.request_timeout_ms must be positive",
            ));
        }
        if agg.max_concurrency == 0 {
            return Err(InfrastructureError::configuration(
                "aggregation.max_concurrency must be positive",
            ));
        }

        if self.cache.backend == CacheBackend::Redis
            && self.cache.redis_url.as_deref().is_none_or(str::is_empty)
        {
            return Err(InfrastructureError::configuration(
                "cache.redis_url is required for the redis backend",
            ));
        }
        if self.cache.backend == CacheBackend::Memory && self.cache.cleanup_interval_secs == 0 {
            return Err(InfrastructureError::configuration(
                "cache.cleanup_interval_secs must be positive",
            ));
        }
        let ttl = &self.cache.ttl;
        for (tier, policy) in [
            ("exact", ttl.exact),
            ("failure", ttl.failure),
            ("rate", ttl.rate),
            ("availability", ttl.availability),
        ] {
            validate_ttl(tier, policy)?;
        }

        if self.refresh.enabled && self.refresh.interval_secs == 0 {
            return Err(InfrastructureError::configuration(
                "refresh.interval_secs must be positive",
            ));
        }

        let mut seen = HashSet::new();
        for provider in &self.providers {
            let id = provider.id.trim().to_lowercase();
            if id.is_empty() {
                return Err(InfrastructureError::configuration("provider id must not be empty"));
            }
            if !seen.insert(id) {
                return Err(InfrastructureError::configuration(format!(
                    "provider '{}' is configured twice",
                    provider.id
                )));
            }
            if let Some(entry) = provider
                .rates
                .iter()
                .find(|r| !(r.exchange_rate.is_finite() && r.exchange_rate > 0.0))
            {
                return Err(InfrastructureError::configuration(format!(
                    "provider '{}' has non-positive rate for {}->{}",
                    provider.id, entry.source_currency, entry.dest_currency
                )));
            }
        }

        Ok(())
    }
}

fn validate_ttl(tier: &str, policy: TtlPolicy) -> Result<(), InfrastructureError> {
    if policy.base_secs == 0 {
        return Err(InfrastructureError::configuration(format!(
            "cache.ttl.{tier}.base_secs must be positive"
        )));
    }
    Ok(())
}
