// src/config/values.rs
//! Places a configuration value can come from.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// One lookup layer. Implementations must re-read on every call so rotated
/// secrets and edited environments are picked up without a restart.
pub trait ValueSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str;
}

/// The process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ValueSource for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }

    fn name(&self) -> &'static str {
        "env"
    }
}

/// A directory of one-file-per-key secrets (e.g. mounted container secrets).
/// File contents are trimmed; a missing or unreadable file is "not present".
#[derive(Debug, Clone)]
pub struct SecretsDir {
    root: PathBuf,
}

impl SecretsDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ValueSource for SecretsDir {
    fn get(&self, key: &str) -> Option<String> {
        // Keys are plain identifiers; refuse anything that could escape the root.
        if key.is_empty() || key.contains(['/', '\\']) || key.starts_with('.') {
            return None;
        }
        let content = fs::read_to_string(self.root.join(key)).ok()?;
        Some(content.trim().to_string())
    }

    fn name(&self) -> &'static str {
        "secrets-dir"
    }
}

/// In-memory values, mostly for tests and embedding.
#[derive(Debug, Default, Clone)]
pub struct StaticValues {
    values: HashMap<String, String>,
}

impl StaticValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StaticValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl ValueSource for StaticValues {
    fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// A layer that never has anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoValues;

impl ValueSource for NoValues {
    fn get(&self, _key: &str) -> Option<String> {
        None
    }

    fn name(&self) -> &'static str {
        "none"
    }
}
