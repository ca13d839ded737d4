//! Per-message ingestion outcomes.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Reference to a report persisted by an [`ArtifactStore`](crate::store::ArtifactStore).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StoredArtifact {
    /// Storage key, `<YYYY-MM-DD>-<report name>`.
    pub key: String,
    /// Where the store put it.
    pub location: PathBuf,
    /// Stored size in bytes.
    pub size: u64,
    /// Hex SHA-256 of the stored bytes.
    pub sha256: String,
}

/// Why a message could not be ingested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Subject did not match the report pattern, or named an unknown report.
    UnrecognizedSubject,
    /// No secure download link in the body.
    MissingDownloadUrl,
    /// The download did not return HTTP 200.
    FetchFailure,
    /// The download was not valid gzip text.
    DecompressionFailure,
    /// The artifact store rejected the write.
    StorageFailure(String),
}

impl FailureReason {
    /// Human-readable notification body naming the original subject.
    pub fn describe(&self, subject: &str) -> String {
        match self {
            Self::UnrecognizedSubject => format!("Unexpected subject found for message: {subject}"),
            Self::MissingDownloadUrl => format!("No download URL found for message: {subject}"),
            Self::FetchFailure => format!("Error in downloading content for message: {subject}"),
            Self::DecompressionFailure => {
                format!("Error in converting download to csv for message: {subject}")
            }
            Self::StorageFailure(_) => format!("Error in storing report for message: {subject}"),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnrecognizedSubject => f.write_str("unexpected subject"),
            Self::MissingDownloadUrl => f.write_str("no download URL"),
            Self::FetchFailure => f.write_str("download error"),
            Self::DecompressionFailure => f.write_str("conversion error"),
            Self::StorageFailure(detail) => write!(f, "storage error: {detail}"),
        }
    }
}

/// Terminal state of one processed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestionResult {
    /// Report stored, registry updated, message archived.
    Success {
        report_name: String,
        artifact: StoredArtifact,
        received_at: DateTime<Utc>,
    },
    /// Message flagged and an error notification sent.
    Failure { reason: FailureReason },
}

impl IngestionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
