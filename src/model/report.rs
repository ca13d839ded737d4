//! Report definitions as held in the registry.

use chrono::{DateTime, Duration, Utc};

/// One known report type, loaded from a registry row.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReportDefinition {
    /// Unique report name, matched against parsed message subjects.
    pub name: String,

    /// Free-text description. Informational only.
    pub description: String,

    /// Maximum number of days without a delivery before an alert fires.
    pub alert_threshold_days: u32,

    /// When the most recent report was received. `None` means never.
    pub last_received_at: Option<DateTime<Utc>>,
}

impl ReportDefinition {
    /// Create a definition that has never been received.
    pub fn new(name: impl Into<String>, alert_threshold_days: u32) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            alert_threshold_days,
            last_received_at: None,
        }
    }

    /// Last receipt, with "never" mapped to the Unix epoch.
    pub fn last_received_or_epoch(&self) -> DateTime<Utc> {
        self.last_received_at.unwrap_or(DateTime::UNIX_EPOCH)
    }

    /// Whether more than `alert_threshold_days` have passed since the last receipt.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        let silence = now.signed_duration_since(self.last_received_or_epoch());
        silence > Duration::days(i64::from(self.alert_threshold_days))
    }
}
