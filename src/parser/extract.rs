//! Report name and download link extraction.
//!
//! Both extractors are purely syntactic: they do not consult the registry,
//! and the first match wins.

use std::sync::LazyLock;

use regex::Regex;

/// Subject prefix used by the report delivery emails.
pub const SUBJECT_PREFIX: &str = "AdWords Report Request | ";

static SUBJECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^AdWords Report Request \| (.*)$").expect("valid subject pattern")
});

// Quotes and angle brackets end the link so that `href="…"` in HTML bodies works.
static URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://adwords\.google\.com/aw_reporting/email_download[^\s"'<>]+"#)
        .expect("valid download URL pattern")
});

/// Return the report name from a subject such as
/// `"AdWords Report Request | Campaign Performance"`.
///
/// Surrounding whitespace is trimmed, as it is for registry names.
pub fn extract_report_name(subject: &str) -> Option<String> {
    SUBJECT_RE
        .captures(subject)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Return the first secure report download link found in `body`.
pub fn extract_download_url(body: &str) -> Option<String> {
    URL_RE
        .find(body)
        .map(|m| m.as_str().replace("&amp;", "&"))
}
