//! Error types for tool-guardrails
//!
//! Blocking a command is a classification outcome, not an error. Errors here
//! cover registration, configuration, and I/O at the edges of the crate.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the guardrail pipeline
#[derive(Debug, Error)]
pub enum GuardrailError {
    /// A custom sensitive pattern failed to compile at registration time
    #[error("invalid pattern '{name}': {source}")]
    InvalidPattern {
        /// Type tag of the rejected pattern
        name: String,
        #[source]
        source: regex::Error,
    },

    /// A custom sensitive pattern matches the empty string
    #[error("pattern '{name}' matches the empty string")]
    EmptyMatchPattern { name: String },

    /// Reading a config, pattern, or audit file failed
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A TOML file could not be parsed
    #[error("failed to parse {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The tracing subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Errors from the durable cache tier.
///
/// These never escape the cache: every variant is downgraded to a miss or a
/// no-op at the cache boundary.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("durable store unavailable: {0}")]
    Unavailable(String),

    #[error("durable store timed out after {0} ms")]
    Timeout(u64),

    #[error("corrupt durable entry: {0}")]
    Corrupt(String),
}

/// Result alias for guardrail operations
pub type Result<T> = std::result::Result<T, GuardrailError>;
