//! Operator notifications: per-message failures and the freshness summary.

pub mod outbox;

use tracing::warn;

use crate::error::Result;

/// Delivers a notification to a recipient.
///
/// Delivery is best-effort: callers log an `Err` and carry on.
pub trait Notifier {
    fn send_notification(&self, recipient: &str, subject: &str, body: &str) -> Result<()>;
}

/// Notifier that only writes to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send_notification(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        warn!(recipient = recipient, subject = subject, "{body}");
        Ok(())
    }
}

/// Recipient and subject line for every alert of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub recipient: String,
    pub subject: String,
}

impl AlertSettings {
    /// Send `body` through `notifier`, logging (not returning) a delivery failure.
    pub fn notify(&self, notifier: &dyn Notifier, body: &str) -> bool {
        match notifier.send_notification(&self.recipient, &self.subject, body) {
            Ok(()) => true,
            Err(e) => {
                warn!(recipient = %self.recipient, error = %e, "Failed to deliver notification");
                false
            }
        }
    }
}
