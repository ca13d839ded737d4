//! Mailbox access: listing inbox threads, flagging failures, archiving successes.

pub mod maildir;
pub mod threading;

use crate::error::Result;
use crate::model::message::MailThread;

/// The inbox a run reads report emails from.
pub trait Mailbox {
    /// Every message currently in the inbox, grouped into threads.
    fn inbox_threads(&mut self) -> Result<Vec<MailThread>>;

    /// Mark a message as attempted-and-failed. Flagging twice is a no-op.
    fn flag(&mut self, id: &str) -> Result<()>;

    /// Move a successfully ingested message out of the inbox.
    fn archive(&mut self, id: &str) -> Result<()>;
}
