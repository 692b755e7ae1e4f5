// src/error.rs
//! Error taxonomy shared by the resolver, the adapters and the queue transports.

use thiserror::Error;

/// A configuration read that could not be satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Key absent from the secret store, the environment, and no default given.
    #[error("missing required configuration: {key}")]
    Missing { key: String },

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, value: impl Into<String>, reason: impl ToString) -> Self {
        Self::Invalid {
            key: key.into(),
            value: value.into(),
            reason: reason.to_string(),
        }
    }

    pub fn key(&self) -> &str {
        match self {
            Self::Missing { key } | Self::Invalid { key, .. } => key,
        }
    }
}

/// Failure of one adapter fetch for one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Timeouts, connection resets, 408/429/5xx. Worth another attempt.
    #[error("transient fetch error: {0}")]
    Transient(String),

    /// Parse errors, other 4xx, anything a retry will not fix.
    #[error("permanent fetch error: {0}")]
    Permanent(String),
}

impl FetchError {
    pub fn transient(msg: impl Into<String>) -> Self {
        Self::Transient(msg.into())
    }

    pub fn permanent(msg: impl Into<String>) -> Self {
        Self::Permanent(msg.into())
    }

    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Metric label for this kind.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Transient(_) => "transient",
            Self::Permanent(_) => "permanent",
        }
    }
}

/// Unrecoverable transport failure while emitting a batch.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("{transport}: connection failed: {message}")]
    Connect {
        transport: &'static str,
        message: String,
    },

    #[error("{transport}: send failed after {sent} message(s): {message}")]
    Send {
        transport: &'static str,
        sent: usize,
        message: String,
    },

    #[error("encoding record failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_kinds() {
        assert!(FetchError::transient("timeout").is_transient());
        assert!(!FetchError::permanent("404").is_transient());
        assert_eq!(FetchError::permanent("x").kind(), "permanent");
    }

    #[test]
    fn config_error_exposes_key() {
        assert_eq!(ConfigError::missing("RABBITMQ_VHOST").key(), "RABBITMQ_VHOST");
        let e = ConfigError::invalid("POLL_INTERVAL", "soon", "not a number");
        assert_eq!(e.key(), "POLL_INTERVAL");
        assert!(e.to_string().contains("soon"));
    }
}
