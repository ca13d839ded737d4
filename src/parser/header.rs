//! RFC 5322 header helpers for the fields `mail-parser` is not asked for:
//! threading identifiers and a tolerant `Date:` fallback.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Threading identifiers of one message, angle brackets removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadHeaders {
    pub message_id: String,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Read threading headers and the date from raw header bytes.
pub fn parse_thread_headers(raw_headers: &[u8]) -> ThreadHeaders {
    let text = decode_header_bytes(raw_headers);
    let headers = unfold_headers(&text);

    let message_id = get_header(&headers, "message-id")
        .and_then(|s| extract_all_angle_brackets(&s).into_iter().next())
        .unwrap_or_default();

    let in_reply_to = get_header(&headers, "in-reply-to")
        .and_then(|s| extract_all_angle_brackets(&s).into_iter().next());

    let references = get_header(&headers, "references")
        .map(|s| extract_all_angle_brackets(&s))
        .unwrap_or_default();

    let date = get_header(&headers, "date").and_then(|s| parse_date(&s));

    ThreadHeaders {
        message_id,
        in_reply_to,
        references,
        date,
    }
}

/// Decode raw header bytes to a string.
///
/// Tries UTF-8 first, then falls back to Windows-1252 (which accepts every byte).
fn decode_header_bytes(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);

    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            decoded.into_owned()
        }
    }
}

/// Unfold headers: join continuation lines (starting with space or tab) with the previous header.
///
/// Returns a list of `(lowercase_name, raw_value)` pairs.
fn unfold_headers(text: &str) -> Vec<(String, String)> {
    let mut result: Vec<(String, String)> = Vec::new();

    for line in text.lines() {
        if line.starts_with(' ') || line.starts_with('\t') {
            if let Some(last) = result.last_mut() {
                last.1.push(' ');
                last.1.push_str(line.trim());
            }
        } else if let Some(colon_pos) = line.find(':') {
            let name = line[..colon_pos].trim().to_lowercase();
            let value = line[colon_pos + 1..].trim().to_string();
            result.push((name, value));
        }
    }

    result
}

/// Get the first value for a header name (case-insensitive).
fn get_header(headers: &[(String, String)], name: &str) -> Option<String> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

/// Extract the contents of every `<…>` token, without the brackets.
fn extract_all_angle_brackets(s: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut remaining = s;
    while let Some(start) = remaining.find('<') {
        let Some(end) = remaining[start..].find('>') else {
            break;
        };
        let id = remaining[start + 1..start + end].trim();
        if !id.is_empty() {
            result.push(id.to_string());
        }
        remaining = &remaining[start + end + 1..];
    }
    result
}

/// Parse an email date string (RFC 2822, RFC 3339, or a few common variants).
pub fn parse_date(date_str: &str) -> Option<DateTime<Utc>> {
    let trimmed = date_str.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    // Drop a trailing "(UTC)"-style comment
    let no_comment = match trimmed.find(" (") {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    };

    let formats = [
        "%a, %d %b %Y %H:%M:%S %z",
        "%d %b %Y %H:%M:%S %z",
        "%Y-%m-%d %H:%M:%S %z",
    ];
    for fmt in &formats {
        if let Ok(dt) = DateTime::parse_from_str(no_comment, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in ["%d %b %Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(no_comment, fmt) {
            return Some(Utc.from_utc_datetime(&ndt));
        }
    }
    None
}
