//! Overdue-report detection, run once after the inbox pass.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::notify::{AlertSettings, Notifier};
use crate::registry::ReportRegistry;

/// Opening of the overdue summary notification.
pub const OVERDUE_PREFIX: &str =
    "Email reports were expected for the following reports, but have not been seen: ";

/// Send one notification listing every overdue report; nothing if none are.
///
/// Returns the overdue names in registry order. Delivery failures are logged.
pub fn check_and_notify(
    registry: &ReportRegistry,
    now: DateTime<Utc>,
    notifier: &dyn Notifier,
    alert: &AlertSettings,
) -> Vec<String> {
    let overdue = registry.list_overdue(now);
    if overdue.is_empty() {
        info!(reports = registry.len(), "All reports are fresh");
        return overdue;
    }

    info!(count = overdue.len(), "Reports overdue");
    alert.notify(notifier, &overdue_message(&overdue));
    overdue
}

/// Body of the overdue summary.
pub fn overdue_message(names: &[String]) -> String {
    format!("{OVERDUE_PREFIX}{}", names.join(", "))
}

/// Freshness of one report, for display.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ReportStatus {
    pub name: String,
    pub description: String,
    pub alert_threshold_days: u32,
    pub last_received_at: Option<DateTime<Utc>>,
    /// Whole days since the last receipt; `None` if never received.
    pub age_days: Option<i64>,
    pub overdue: bool,
}

/// Freshness of every report, in registry order.
pub fn report_status(registry: &ReportRegistry, now: DateTime<Utc>) -> Vec<ReportStatus> {
    registry
        .definitions()
        .map(|d| ReportStatus {
            name: d.name.clone(),
            description: d.description.clone(),
            alert_threshold_days: d.alert_threshold_days,
            last_received_at: d.last_received_at,
            age_days: d
                .last_received_at
                .map(|last| now.signed_duration_since(last).num_days()),
            overdue: d.is_overdue(now),
        })
        .collect()
}
