//! # Error Handling
//!
//! This module defines the centralized error type for `aggregit`. It uses
//! `thiserror` to describe every failure mode the engine can produce, each
//! variant carrying the context a user needs to act on it.
//!
//! ## Propagation
//!
//! Only two kinds of error ever reach the caller of a whole run:
//!
//! - configuration errors (`Error::Config`), raised before any source is
//!   touched;
//! - infrastructural failures such as an unwritable workspace directory.
//!
//! Everything that happens *per source* or *per file* is caught by the
//! orchestrator, the build pipeline or the verifier and converted into an
//! entry of the corresponding result or report structure.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for aggregit operations
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration is malformed or incomplete.
    ///
    /// Carries an optional hint for how to fix it.
    #[error("Configuration error: {message}{}", format_hint(hint))]
    Config {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// A `git` subprocess exited unsuccessfully or could not be spawned.
    #[error("Git command failed: git {command} - {message}")]
    Git { command: String, message: String },

    /// A `git` subprocess did not finish within the configured timeout.
    #[error("Git command timed out after {seconds}s: git {command}")]
    Timeout { command: String, seconds: u64 },

    /// A filesystem operation failed on a specific path.
    #[error("Filesystem error at '{}': {message}", path.display())]
    FileSystem { path: PathBuf, message: String },

    /// A network request failed for a specific URL.
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// An internal invariant was violated.
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The run was cancelled between two sources.
    #[error("Operation cancelled")]
    Cancelled,

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

fn format_hint(hint: &Option<String>) -> String {
    hint.as_ref()
        .map(|h| format!("\n  hint: {}", h))
        .unwrap_or_default()
}

impl Error {
    /// Shorthand for a configuration error without a hint.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            hint: None,
        }
    }

    /// Wrap an I/O failure together with the path it happened on.
    pub fn fs(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        Error::FileSystem {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
