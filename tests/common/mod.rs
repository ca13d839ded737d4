//! In-memory collaborators shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use sha2::{Digest, Sha256};

use reportfetch::error::{ReportError, Result};
use reportfetch::fetch::{HttpFetch, HttpResponse};
use reportfetch::mailbox::threading::build_threads;
use reportfetch::mailbox::Mailbox;
use reportfetch::model::message::{InboundMessage, MailThread};
use reportfetch::model::outcome::StoredArtifact;
use reportfetch::notify::{AlertSettings, Notifier};
use reportfetch::registry::table::{CellUpdate, RegistryTable};
use reportfetch::store::ArtifactStore;

pub const DOWNLOAD_URL: &str =
    "https://adwords.google.com/aw_reporting/email_download?file=abc123&token=xyz";

pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
}

pub fn gzip(text: &str) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    encoder.finish().unwrap()
}

pub fn alert() -> AlertSettings {
    AlertSettings {
        recipient: "ops@example.com".to_string(),
        subject: "Report alert".to_string(),
    }
}

/// A report email as the delivery service sends it.
pub fn report_email(id: &str, report: &str, received_at: DateTime<Utc>) -> InboundMessage {
    InboundMessage::new(
        id,
        format!("AdWords Report Request | {report}"),
        format!("Your report is ready.\n\nDownload: {DOWNLOAD_URL}\n"),
        received_at,
    )
}

// ─── Mailbox ────────────────────────────────────────────────────────

/// Inbox held in memory. Flagging sets the message's flag; archiving removes it.
#[derive(Default)]
pub struct MemoryMailbox {
    pub messages: Vec<InboundMessage>,
    pub flagged: Vec<String>,
    pub archived: Vec<String>,
    pub fail_listing: bool,
}

impl MemoryMailbox {
    pub fn with(messages: Vec<InboundMessage>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }
}

impl Mailbox for MemoryMailbox {
    fn inbox_threads(&mut self) -> Result<Vec<MailThread>> {
        if self.fail_listing {
            return Err(ReportError::Mailbox("inbox unavailable".to_string()));
        }
        Ok(build_threads(self.messages.clone()))
    }

    fn flag(&mut self, id: &str) -> Result<()> {
        let message = self
            .messages
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| ReportError::Mailbox(format!("no message {id}")))?;
        message.flagged = true;
        self.flagged.push(id.to_string());
        Ok(())
    }

    fn archive(&mut self, id: &str) -> Result<()> {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != id);
        if self.messages.len() == before {
            return Err(ReportError::Mailbox(format!("no message {id}")));
        }
        self.archived.push(id.to_string());
        Ok(())
    }
}

// ─── HTTP ───────────────────────────────────────────────────────────

/// Answers from a fixed URL table; unknown URLs fail like a dead host.
#[derive(Default)]
pub struct StaticHttp {
    pub responses: HashMap<String, HttpResponse>,
    pub requests: RefCell<Vec<String>>,
}

impl StaticHttp {
    pub fn serving(url: &str, status: u16, body: Vec<u8>) -> Self {
        let mut http = Self::default();
        http.responses
            .insert(url.to_string(), HttpResponse { status, body });
        http
    }
}

impl HttpFetch for StaticHttp {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.borrow_mut().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ReportError::Http(format!("connection refused: {url}")))
    }
}

// ─── Store ──────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryStore {
    pub objects: RefCell<BTreeMap<String, Vec<u8>>>,
    pub fail: bool,
}

impl MemoryStore {
    pub fn text(&self, key: &str) -> Option<String> {
        self.objects
            .borrow()
            .get(key)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl ArtifactStore for MemoryStore {
    fn store(&self, key: &str, data: &[u8], _content_type: &str) -> Result<StoredArtifact> {
        if self.fail {
            return Err(ReportError::io(
                key,
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            ));
        }
        self.objects
            .borrow_mut()
            .insert(key.to_string(), data.to_vec());
        Ok(StoredArtifact {
            key: key.to_string(),
            location: PathBuf::from(format!("memory://{key}")),
            size: data.len() as u64,
            sha256: format!("{:x}", Sha256::digest(data)),
        })
    }
}

// ─── Notifier ───────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: RefCell<Vec<(String, String, String)>>,
}

impl RecordingNotifier {
    pub fn bodies(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(_, _, b)| b.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn send_notification(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        self.sent
            .borrow_mut()
            .push((recipient.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

// ─── Registry table ─────────────────────────────────────────────────

/// Registry rows in memory, header included.
#[derive(Default)]
pub struct MemoryTable {
    pub rows: Vec<Vec<String>>,
    pub writes: Vec<Vec<CellUpdate>>,
    pub fail_read: bool,
    pub fail_write: bool,
}

impl MemoryTable {
    /// Header plus one row per `(name, threshold, last_received)`.
    pub fn with_reports(reports: &[(&str, u32, &str)]) -> Self {
        let mut rows = vec![vec![
            "name".to_string(),
            "description".to_string(),
            "alert_threshold_days".to_string(),
            "last_received_at".to_string(),
        ]];
        for (name, days, last) in reports {
            rows.push(vec![
                name.to_string(),
                String::new(),
                days.to_string(),
                last.to_string(),
            ]);
        }
        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn cell(&self, row: usize, column: usize) -> &str {
        &self.rows[row][column]
    }
}

impl RegistryTable for MemoryTable {
    fn location(&self) -> PathBuf {
        PathBuf::from("memory://registry")
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        if self.fail_read {
            return Err(ReportError::Config("table offline".to_string()));
        }
        Ok(self.rows.clone())
    }

    fn update_cells(&mut self, updates: &[CellUpdate]) -> Result<()> {
        if self.fail_write {
            return Err(ReportError::Config("table is read-only".to_string()));
        }
        for update in updates {
            self.rows[update.row][update.column] = update.value.clone();
        }
        self.writes.push(updates.to_vec());
        Ok(())
    }
}
