//! Type definitions for actions MCP

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Result Types
// ============================================================================

/// Result of a single action invocation
///
/// A non-zero exit code is ordinary data for the caller to interpret, not an
/// error. A timed-out invocation has `exit_code: null` and `timed_out: true`
/// together with whatever output was captured before the kill.
#[derive(Debug, Serialize, Deserialize)]
pub struct ActionOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub timed_out: bool,
}

// ============================================================================
// Error Types
// ============================================================================

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|p| format!("  - {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn comma_list(items: &[String]) -> String {
    items.join(", ")
}

/// Malformed configuration schema. Fatal at startup.
///
/// Carries every structural problem found in one pass, not just the first.
#[derive(Error, Debug)]
#[error("invalid configuration:\n{}", bullet_list(.problems))]
pub struct ConfigError {
    pub problems: Vec<String>,
}

impl ConfigError {
    pub fn new(problems: Vec<String>) -> Self {
        Self { problems }
    }

    pub fn single(problem: impl Into<String>) -> Self {
        Self {
            problems: vec![problem.into()],
        }
    }
}

/// Required environment variables missing at startup. Fatal.
///
/// Lists all missing names together so the operator can fix them in one go.
#[derive(Error, Debug)]
#[error("required environment variables not set: {}", comma_list(.missing))]
pub struct StartupEnvError {
    pub missing: Vec<String>,
}

/// Bad caller parameter at call time. Surfaced as a per-call error.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("path '{path}' for parameter '{param}' escapes the project root")]
    PathEscapesProject { param: String, path: String },

    #[error("path '{path}' for parameter '{param}' does not exist")]
    PathNotFound { param: String, path: String },

    #[error("required parameter '{0}' not provided")]
    MissingParameter(String),
}

/// Failure to run the child process. Surfaced as a per-call error.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to spawn '{command}': {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_lists_every_problem() {
        let err = ConfigError::new(vec!["first".to_string(), "second".to_string()]);
        let msg = err.to_string();
        assert!(msg.contains("first"));
        assert!(msg.contains("second"));
    }

    #[test]
    fn startup_env_error_names_all_missing_vars() {
        let err = StartupEnvError {
            missing: vec!["API_KEY".to_string(), "DB_URL".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "required environment variables not set: API_KEY, DB_URL"
        );
    }
}
