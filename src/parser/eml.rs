//! Parser for individual `.eml` files (RFC 5322 messages, as stored one per file in a Maildir).

use std::path::Path;

use chrono::{DateTime, Utc};
use mail_parser::MessageParser;

use crate::error::{ReportError, Result};
use crate::model::message::InboundMessage;
use crate::parser::header;

/// Read and parse a single `.eml` file into an [`InboundMessage`].
///
/// `fallback_date` is used when the message carries no usable `Date:` header
/// (callers pass the file's modification time).
pub fn parse_eml(
    path: impl AsRef<Path>,
    id: &str,
    flagged: bool,
    fallback_date: DateTime<Utc>,
) -> Result<InboundMessage> {
    let path = path.as_ref();
    let data = std::fs::read(path).map_err(|e| ReportError::io(path, e))?;
    Ok(parse_eml_bytes(&data, id, flagged, fallback_date))
}

/// Parse raw message bytes into an [`InboundMessage`].
///
/// `body` is the first text part (HTML converted to text by `mail-parser` when
/// there is none); `html` keeps the raw HTML so links inside tags stay visible.
/// Messages `mail-parser` rejects still yield an entry built from the raw text,
/// so that the pipeline can flag and report them.
pub fn parse_eml_bytes(
    data: &[u8],
    id: &str,
    flagged: bool,
    fallback_date: DateTime<Utc>,
) -> InboundMessage {
    let header_end = find_header_end(data).unwrap_or(data.len());
    let threading = header::parse_thread_headers(&data[..header_end]);

    let parser = MessageParser::default();
    let (subject, body, html, parsed_date) = match parser.parse(data) {
        Some(msg) => {
            let subject = msg.subject().unwrap_or_default().to_string();
            let body = msg.body_text(0).map(|s| s.into_owned()).unwrap_or_default();
            let html = msg.body_html(0).map(|s| s.into_owned());
            let date = msg
                .date()
                .and_then(|d| DateTime::<Utc>::from_timestamp(d.to_timestamp(), 0));
            (subject, body, html, date)
        }
        None => {
            tracing::warn!(id = id, "mail-parser rejected message, using raw text");
            let body = String::from_utf8_lossy(&data[header_end..]).trim().to_string();
            (String::new(), body, None, None)
        }
    };

    InboundMessage {
        id: id.to_string(),
        subject,
        body,
        html,
        received_at: parsed_date.or(threading.date).unwrap_or(fallback_date),
        flagged,
        message_id: threading.message_id,
        in_reply_to: threading.in_reply_to,
        references: threading.references,
    }
}

/// Find the byte offset where headers end (position of the first blank line).
fn find_header_end(data: &[u8]) -> Option<usize> {
    for i in 0..data.len().saturating_sub(1) {
        if data[i] == b'\n' && data[i + 1] == b'\n' {
            return Some(i);
        }
        if i + 3 < data.len()
            && data[i] == b'\r'
            && data[i + 1] == b'\n'
            && data[i + 2] == b'\r'
            && data[i + 3] == b'\n'
        {
            return Some(i);
        }
    }
    None
}
