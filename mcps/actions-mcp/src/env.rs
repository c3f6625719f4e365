//! Merged environment snapshot
//!
//! Environment values come from the process environment plus a `.env` file
//! next to the configuration file, captured once at startup. On a name
//! collision the process environment wins, so an operator can override a
//! `.env` entry when launching the server.

use std::collections::HashMap;
use std::path::Path;

/// Immutable snapshot of the environment visible to actions
///
/// Used for the startup required-variable gate, for resolving env-var typed
/// parameters, and as the full environment of every spawned child process.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    /// Capture the process environment merged with an optional `.env` file
    ///
    /// A missing `.env` file is not an error; a malformed one is.
    pub fn capture(dotenv_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut vars = HashMap::new();

        if let Some(path) = dotenv_path {
            if path.exists() {
                for item in dotenvy::from_path_iter(path)? {
                    let (key, value) = item?;
                    vars.insert(key, value);
                }
                tracing::debug!(path = %path.display(), "loaded .env file");
            }
        }

        // Process environment takes precedence over .env entries.
        for (key, value) in std::env::vars() {
            vars.insert(key, value);
        }

        Ok(Self { vars })
    }

    /// Build a snapshot from explicit pairs, bypassing the process environment
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
