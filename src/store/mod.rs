//! Durable storage for downloaded reports.

pub mod directory;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::outcome::StoredArtifact;

/// Content type of every stored report.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// A place reports can be written to, addressed by key.
pub trait ArtifactStore {
    /// Persist `data` under `key`. Writing an existing key replaces it.
    fn store(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredArtifact>;
}

/// Time zone used to render the date part of storage keys.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyTimezone {
    /// The host's local time zone.
    #[default]
    Local,
    Utc,
}

/// Storage key for a report: `<YYYY-MM-DD>-<report name>`.
pub fn storage_key(received_at: DateTime<Utc>, report_name: &str, zone: KeyTimezone) -> String {
    let date = match zone {
        KeyTimezone::Local => received_at.with_timezone(&Local).format("%Y-%m-%d"),
        KeyTimezone::Utc => received_at.format("%Y-%m-%d"),
    };
    format!("{date}-{report_name}")
}

/// Sanitize a string for use in filenames.
///
/// Replaces invalid characters with `_` and truncates to `max_len`.
pub fn sanitize_filename_part(s: &str, max_len: usize) -> String {
    let sanitized: String = s
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' || c == '_' || c == '@' {
                c
            } else {
                '_'
            }
        })
        .take(max_len)
        .collect();

    if sanitized.is_empty() {
        "unknown".to_string()
    } else {
        sanitized
    }
}
