//! Notifier that drops RFC 5322 messages into an outbox folder.
//!
//! Any local MTA or mail-forwarding agent watching the folder can deliver them.

use std::cell::Cell;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::info;

use super::Notifier;
use crate::error::{ReportError, Result};
use crate::store::sanitize_filename_part;

/// Writes each notification as an `.eml` file.
#[derive(Debug)]
pub struct OutboxNotifier {
    dir: PathBuf,
    sender: String,
    sequence: Cell<u32>,
}

impl OutboxNotifier {
    /// Use `dir` as the outbox, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>, sender: impl Into<String>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;
        Ok(Self {
            dir,
            sender: sender.into(),
            sequence: Cell::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Notifier for OutboxNotifier {
    fn send_notification(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let now = Utc::now();
        let seq = self.sequence.get();
        self.sequence.set(seq.wrapping_add(1));

        let filename = format!(
            "{}_{:04}_{}.eml",
            now.format("%Y%m%d_%H%M%S"),
            seq,
            sanitize_filename_part(subject, 80)
        );
        let path = self.dir.join(filename);

        let message = render_message(
            &self.sender,
            recipient,
            subject,
            body,
            &now.to_rfc2822(),
            &format!("{}.{}.{}@reportfetch", now.timestamp(), std::process::id(), seq),
        );
        std::fs::write(&path, message).map_err(|e| ReportError::io(&path, e))?;

        info!(path = %path.display(), recipient = recipient, "Queued notification");
        Ok(())
    }
}

/// Render a plain-text RFC 5322 message with CRLF line endings.
fn render_message(
    from: &str,
    to: &str,
    subject: &str,
    body: &str,
    date: &str,
    message_id: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("From: {from}\r\n"));
    out.push_str(&format!("To: {to}\r\n"));
    out.push_str(&format!("Subject: {}\r\n", single_line(subject)));
    out.push_str(&format!("Date: {date}\r\n"));
    out.push_str(&format!("Message-ID: <{message_id}>\r\n"));
    out.push_str("MIME-Version: 1.0\r\n");
    out.push_str("Content-Type: text/plain; charset=utf-8\r\n");
    out.push_str("Content-Transfer-Encoding: 8bit\r\n");
    out.push_str("\r\n");
    for line in body.lines() {
        out.push_str(line);
        out.push_str("\r\n");
    }
    out
}

fn single_line(s: &str) -> String {
    s.replace(['\r', '\n'], " ")
}
