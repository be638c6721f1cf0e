//! Error types for linkstash.
//!
//! One error enum covers the whole crate. The taxonomy mirrors how failures
//! are meant to be handled:
//!
//! - Configuration errors (missing directory, no path configured) are fatal
//!   to the call that raised them.
//! - Validation errors (unknown key, missing key, malformed value) propagate
//!   immediately and are never silently dropped.
//! - Absence of a file is **not** an error: [`crate::storage::MetaStore`]
//!   returns `Ok(None)` / `Ok(false)` for it.
//! - Per-file harvest failures are soft: they are logged, reported in
//!   [`crate::sync::Harvest::skipped`], and never abort the harvest.

use thiserror::Error;

/// Result type alias for linkstash operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in linkstash operations.
#[derive(Error, Debug)]
pub enum Error {
    /// IO error during file or lock operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV encode/decode error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Binary encode/decode error.
    #[error("binary codec error: {0}")]
    Binary(#[from] bincode::Error),

    /// A key was used that the governing schema (or target key set) does not
    /// declare. This is how stale meta files and malformed CSV headers are
    /// caught.
    #[error("unknown key '{key}' (declared keys: {})", declared.join(", "))]
    UnknownKey {
        /// The offending key.
        key: String,
        /// The keys that would have been accepted.
        declared: Vec<String>,
    },

    /// A schema-declared key was absent from raw input and default filling
    /// was disabled.
    #[error("missing key '{key}' in raw data (default filling disabled)")]
    MissingKey {
        /// The absent key.
        key: String,
    },

    /// A raw value could not be coerced into a set of strings.
    #[error("invalid value for key '{key}': {message}")]
    InvalidValue {
        /// The key whose value was malformed.
        key: String,
        /// What was wrong with it.
        message: String,
    },

    /// The meta file decoded to something other than a JSON object.
    #[error("meta file is not a JSON object: {path}")]
    NotAnObject {
        /// The offending file.
        path: std::path::PathBuf,
    },

    /// Configuration error (missing directory, unresolvable path).
    #[error("configuration error: {0}")]
    Config(String),
}
