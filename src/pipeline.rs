//! Per-message ingestion: parse, download, decompress, store, record, archive.
//!
//! Each stage either hands its output to the next or stops with a
//! [`FailureReason`]. Side effects (storing, archiving, flagging, notifying)
//! happen only once a message reaches a terminal state.

use tracing::{debug, info, warn};

use crate::fetch::{self, HttpFetch};
use crate::mailbox::Mailbox;
use crate::model::message::{InboundMessage, MailThread};
use crate::model::outcome::{FailureReason, IngestionResult, StoredArtifact};
use crate::notify::{AlertSettings, Notifier};
use crate::parser::extract::{extract_download_url, extract_report_name};
use crate::registry::ReportRegistry;
use crate::store::{storage_key, ArtifactStore, KeyTimezone, CSV_CONTENT_TYPE};

/// Counts from one pass over the inbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct PassSummary {
    pub threads: usize,
    pub messages: usize,
    pub skipped: usize,
    pub ingested: usize,
    pub failed: usize,
    /// Stored artifacts, in processing order.
    pub artifacts: Vec<StoredArtifact>,
}

/// A report that made it through every stage up to storage.
struct Ingested {
    report_name: String,
    artifact: StoredArtifact,
}

/// Processes inbox messages against the registry.
pub struct IngestionPipeline<'a> {
    http: &'a dyn HttpFetch,
    store: &'a dyn ArtifactStore,
    notifier: &'a dyn Notifier,
    alert: &'a AlertSettings,
    key_timezone: KeyTimezone,
}

impl<'a> IngestionPipeline<'a> {
    pub fn new(
        http: &'a dyn HttpFetch,
        store: &'a dyn ArtifactStore,
        notifier: &'a dyn Notifier,
        alert: &'a AlertSettings,
        key_timezone: KeyTimezone,
    ) -> Self {
        Self {
            http,
            store,
            notifier,
            alert,
            key_timezone,
        }
    }

    /// Run every message of every thread through the pipeline.
    ///
    /// The progress callback receives `(processed, total)` messages.
    pub fn process_threads(
        &self,
        threads: &[MailThread],
        mailbox: &mut dyn Mailbox,
        registry: &mut ReportRegistry,
        progress: Option<&dyn Fn(usize, usize)>,
    ) -> PassSummary {
        let total: usize = threads.iter().map(|t| t.messages.len()).sum();
        let mut summary = PassSummary {
            threads: threads.len(),
            messages: total,
            ..PassSummary::default()
        };

        let mut processed = 0;
        for thread in threads {
            for message in &thread.messages {
                match self.process_message(message, mailbox, registry) {
                    None => summary.skipped += 1,
                    Some(IngestionResult::Success { artifact, .. }) => {
                        summary.ingested += 1;
                        summary.artifacts.push(artifact);
                    }
                    Some(IngestionResult::Failure { .. }) => summary.failed += 1,
                }
                processed += 1;
                if let Some(progress) = progress {
                    progress(processed, total);
                }
            }
        }

        info!(
            messages = summary.messages,
            ingested = summary.ingested,
            failed = summary.failed,
            skipped = summary.skipped,
            "Inbox pass complete"
        );
        summary
    }

    /// Process one message. Returns `None` when it was skipped as already flagged.
    pub fn process_message(
        &self,
        message: &InboundMessage,
        mailbox: &mut dyn Mailbox,
        registry: &mut ReportRegistry,
    ) -> Option<IngestionResult> {
        if message.flagged {
            debug!(id = %message.id, subject = %message.subject, "Skipping flagged message");
            return None;
        }

        match self.ingest(message, registry) {
            Ok(Ingested {
                report_name,
                artifact,
            }) => {
                registry.record_receipt(&report_name, message.received_at);
                if let Err(e) = mailbox.archive(&message.id) {
                    warn!(id = %message.id, error = %e, "Failed to archive ingested message");
                }
                info!(report = %report_name, key = %artifact.key, "Ingested report");
                Some(IngestionResult::Success {
                    report_name,
                    artifact,
                    received_at: message.received_at,
                })
            }
            Err(reason) => {
                warn!(id = %message.id, subject = %message.subject, reason = %reason, "Message not ingested");
                if let Err(e) = mailbox.flag(&message.id) {
                    warn!(id = %message.id, error = %e, "Failed to flag message");
                }
                self.alert
                    .notify(self.notifier, &reason.describe(&message.subject));
                Some(IngestionResult::Failure { reason })
            }
        }
    }

    /// The stage chain. Stops at the first missing piece.
    fn ingest(
        &self,
        message: &InboundMessage,
        registry: &ReportRegistry,
    ) -> Result<Ingested, FailureReason> {
        let report_name = extract_report_name(&message.subject)
            .filter(|name| registry.contains(name))
            .ok_or(FailureReason::UnrecognizedSubject)?;

        let url = extract_download_url(&message.body)
            .or_else(|| message.html.as_deref().and_then(extract_download_url))
            .ok_or(FailureReason::MissingDownloadUrl)?;

        let content = fetch::fetch(self.http, &url).ok_or(FailureReason::FetchFailure)?;
        let csv = fetch::decompress(&content).ok_or(FailureReason::DecompressionFailure)?;

        let key = storage_key(message.received_at, &report_name, self.key_timezone);
        let artifact = self
            .store
            .store(&key, csv.as_bytes(), CSV_CONTENT_TYPE)
            .map_err(|e| FailureReason::StorageFailure(e.to_string()))?;

        Ok(Ingested {
            report_name,
            artifact,
        })
    }
}
