//! Centralized error types for reportfetch.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the reportfetch library.
///
/// Per-message problems (bad subject, missing link, failed download) are not
/// errors at this level; they are [`FailureReason`](crate::model::outcome::FailureReason)s
/// handled inside the pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// A CSV file could not be read or written.
    #[error("CSV error in '{path}': {source}")]
    Csv { path: PathBuf, source: csv::Error },

    /// The registry table could not be read. Fatal for a run.
    #[error("Report registry unavailable at '{path}': {reason}")]
    RegistryUnavailable { path: PathBuf, reason: String },

    /// Updated registry values could not be written back.
    #[error("Failed to write report registry '{path}': {reason}")]
    RegistryWrite { path: PathBuf, reason: String },

    /// The mailbox could not be listed or a message could not be moved.
    #[error("Mailbox error: {0}")]
    Mailbox(String),

    /// Building or using the HTTP client failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The configuration is incomplete or invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Convenience alias for `Result<T, ReportError>`.
pub type Result<T> = std::result::Result<T, ReportError>;

impl ReportError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Csv` variant from a path and a `csv::Error`.
    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(source: reqwest::Error) -> Self {
        Self::Http(source.to_string())
    }
}
