//! Inbound mailbox messages and the threads that group them.

use chrono::{DateTime, Utc};

/// One message as seen in the inbox.
///
/// The `id` is an opaque, mailbox-scoped handle passed back to
/// [`Mailbox::flag`](crate::mailbox::Mailbox::flag) and
/// [`Mailbox::archive`](crate::mailbox::Mailbox::archive).
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Mailbox handle (for Maildir, the unique part of the file name).
    pub id: String,

    /// Decoded subject line.
    pub subject: String,

    /// Plain-text body.
    pub body: String,

    /// HTML body, when the message has one.
    pub html: Option<String>,

    /// Date the message was received.
    pub received_at: DateTime<Utc>,

    /// Set when an earlier run already tried this message and failed.
    pub flagged: bool,

    /// The `Message-ID` header value, without angle brackets.
    pub message_id: String,

    /// The `In-Reply-To` header value, if present.
    pub in_reply_to: Option<String>,

    /// Message-IDs from the `References` header.
    pub references: Vec<String>,
}

impl InboundMessage {
    /// Build a message with no threading headers.
    pub fn new(
        id: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            subject: subject.into(),
            body: body.into(),
            html: None,
            received_at,
            flagged: false,
            message_id: String::new(),
            in_reply_to: None,
            references: Vec::new(),
        }
    }
}

/// A conversation: related messages ordered oldest first.
#[derive(Debug, Clone)]
pub struct MailThread {
    /// `Message-ID` of the thread root (or a synthetic ID).
    pub root_message_id: String,
    /// Messages in the thread, sorted by `received_at` ascending.
    pub messages: Vec<InboundMessage>,
}

impl MailThread {
    /// Date of the newest message in the thread.
    pub fn newest(&self) -> DateTime<Utc> {
        self.messages
            .iter()
            .map(|m| m.received_at)
            .max()
            .unwrap_or(DateTime::UNIX_EPOCH)
    }
}
