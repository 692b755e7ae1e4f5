// src/config/mod.rs
//! Cascading configuration: secret store, then environment, then the caller's default.
//!
//! Nothing is cached. Every read walks the layers again, so a rotated secret or an
//! edited environment is seen on the next call.

pub mod settings;
pub mod values;

use std::sync::Arc;

use crate::error::ConfigError;
use crate::record::Symbol;

pub use settings::{
    active_sources, BrokerSettings, ManagedQueueSettings, PollSettings, QueueSettings,
    SourceSettings, TelemetrySettings,
};
pub use values::{NoValues, ProcessEnv, SecretsDir, StaticValues, ValueSource};

/// Names of the process-wide keys. Per-source keys are built from
/// [`crate::record::Source::config_prefix`].
pub mod keys {
    pub const SECRETS_DIR: &str = "SECRETS_DIR";

    pub const POLLER_TYPE: &str = "POLLER_TYPE";
    pub const SYMBOLS: &str = "SYMBOLS";
    pub const POLL_INTERVAL: &str = "POLL_INTERVAL";
    pub const POLL_TIMEOUT: &str = "POLL_TIMEOUT";
    pub const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";
    pub const SYMBOL_CONCURRENCY: &str = "SYMBOL_CONCURRENCY";

    pub const ENABLE_RETRY: &str = "ENABLE_RETRY";
    pub const MAX_RETRIES: &str = "MAX_RETRIES";
    pub const RETRY_MULTIPLIER: &str = "RETRY_MULTIPLIER";
    pub const RETRY_MIN_DELAY: &str = "RETRY_MIN_DELAY";
    pub const RETRY_MAX_DELAY: &str = "RETRY_MAX_DELAY";

    pub const QUEUE_TYPE: &str = "QUEUE_TYPE";
    pub const RABBITMQ_HOST: &str = "RABBITMQ_HOST";
    pub const RABBITMQ_PORT: &str = "RABBITMQ_PORT";
    pub const RABBITMQ_EXCHANGE: &str = "RABBITMQ_EXCHANGE";
    pub const RABBITMQ_ROUTING_KEY: &str = "RABBITMQ_ROUTING_KEY";
    pub const RABBITMQ_VHOST: &str = "RABBITMQ_VHOST";
    pub const RABBITMQ_USER: &str = "RABBITMQ_USER";
    pub const RABBITMQ_PASS: &str = "RABBITMQ_PASS";
    pub const SQS_QUEUE_URL: &str = "SQS_QUEUE_URL";

    pub const ENABLE_LOGGING: &str = "ENABLE_LOGGING";
    pub const LOG_LEVEL: &str = "LOG_LEVEL";
    pub const LOG_FORMAT: &str = "LOG_FORMAT";
    pub const METRICS_ADDR: &str = "METRICS_ADDR";

    pub const NEWSAPI_KEY: &str = "NEWSAPI_KEY";
    pub const NEWSAPI_QUERY: &str = "NEWSAPI_QUERY";
    pub const BENZINGA_API_KEY: &str = "BENZINGA_API_KEY";
    pub const YOUTUBE_API_KEY: &str = "YOUTUBE_API_KEY";
    pub const YOUTUBE_TRANSCRIPT_URL: &str = "YOUTUBE_TRANSCRIPT_URL";
}

/// Read-only, cheaply clonable resolver shared by every poller task.
#[derive(Clone)]
pub struct ConfigResolver {
    secrets: Arc<dyn ValueSource>,
    env: Arc<dyn ValueSource>,
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("secrets", &self.secrets.name())
            .field("env", &self.env.name())
            .finish()
    }
}

impl ConfigResolver {
    pub fn new(secrets: impl ValueSource + 'static, env: impl ValueSource + 'static) -> Self {
        Self {
            secrets: Arc::new(secrets),
            env: Arc::new(env),
        }
    }

    /// Resolver over an environment-only layer set (no secret store).
    pub fn from_values(env: impl ValueSource + 'static) -> Self {
        Self::new(NoValues, env)
    }

    /// Production wiring: `$SECRETS_DIR` (when set) as the secret store, then the
    /// process environment.
    pub fn from_process() -> Self {
        match std::env::var(keys::SECRETS_DIR) {
            Ok(dir) if !dir.trim().is_empty() => Self::new(SecretsDir::new(dir.trim()), ProcessEnv),
            _ => Self::new(NoValues, ProcessEnv),
        }
    }

    /// First hit across secret store and environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        if let Some(v) = self.secrets.get(key) {
            tracing::trace!(key, layer = self.secrets.name(), "config resolved");
            return Some(v);
        }
        let v = self.env.get(key)?;
        tracing::trace!(key, layer = self.env.name(), "config resolved");
        Some(v)
    }

    /// Secret store, environment, then `default`. Fails only when all three are absent.
    pub fn resolve(&self, key: &str, default: Option<&str>) -> Result<String, ConfigError> {
        self.lookup(key)
            .or_else(|| default.map(str::to_string))
            .ok_or_else(|| ConfigError::missing(key))
    }

    pub fn resolve_or(&self, key: &str, default: &str) -> String {
        self.lookup(key).unwrap_or_else(|| default.to_string())
    }

    /// Required key that must also be non-blank.
    pub fn require_non_empty(&self, key: &str) -> Result<String, ConfigError> {
        let v = self.resolve(key, None)?;
        if v.trim().is_empty() {
            return Err(ConfigError::missing(key));
        }
        Ok(v.trim().to_string())
    }

    pub fn as_int(&self, key: &str, default: Option<u64>) -> Result<u64, ConfigError> {
        let default = default.map(|d| d.to_string());
        let raw = self.resolve(key, default.as_deref())?;
        raw.trim()
            .parse::<u64>()
            .map_err(|e| ConfigError::invalid(key, raw.as_str(), e))
    }

    pub fn as_float(&self, key: &str, default: Option<f64>) -> Result<f64, ConfigError> {
        let default = default.map(|d| d.to_string());
        let raw = self.resolve(key, default.as_deref())?;
        let v = raw
            .trim()
            .parse::<f64>()
            .map_err(|e| ConfigError::invalid(key, raw.as_str(), e))?;
        if !v.is_finite() {
            return Err(ConfigError::invalid(key, raw.as_str(), "not a finite number"));
        }
        Ok(v)
    }

    /// Only the literal `"true"` is true.
    pub fn as_bool(&self, key: &str, default: bool) -> bool {
        match self.lookup(key) {
            Some(v) => v == "true",
            None => default,
        }
    }

    /// Comma-split, trimmed, upper-cased, blanks dropped. An empty result is
    /// reported as missing.
    pub fn as_string_list(&self, key: &str, default: Option<&str>) -> Result<Vec<String>, ConfigError> {
        let raw = self.resolve(key, default)?;
        let items: Vec<String> = raw
            .split(',')
            .filter_map(Symbol::parse)
            .map(|s| s.as_str().to_string())
            .collect();
        if items.is_empty() {
            return Err(ConfigError::missing(key));
        }
        Ok(items)
    }

    /// The active symbol set.
    pub fn symbols(&self) -> Result<Vec<Symbol>, ConfigError> {
        let raw = self.resolve(keys::SYMBOLS, None)?;
        let symbols: Vec<Symbol> = raw.split(',').filter_map(Symbol::parse).collect();
        if symbols.is_empty() {
            return Err(ConfigError::missing(keys::SYMBOLS));
        }
        Ok(symbols)
    }
}
