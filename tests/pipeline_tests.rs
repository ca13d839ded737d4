//! Integration tests for the per-message ingestion pipeline.

mod common;

use common::*;
use reportfetch::mailbox::Mailbox;
use reportfetch::model::message::InboundMessage;
use reportfetch::model::outcome::{FailureReason, IngestionResult};
use reportfetch::model::report::ReportDefinition;
use reportfetch::pipeline::IngestionPipeline;
use reportfetch::registry::ReportRegistry;
use reportfetch::store::KeyTimezone;

fn registry() -> ReportRegistry {
    ReportRegistry::from_definitions([
        ReportDefinition::new("Daily Spend", 2),
        ReportDefinition::new("Weekly Clicks", 7),
    ])
}

struct Harness {
    http: StaticHttp,
    store: MemoryStore,
    notifier: RecordingNotifier,
}

impl Harness {
    fn serving_csv(text: &str) -> Self {
        Self {
            http: StaticHttp::serving(DOWNLOAD_URL, 200, gzip(text)),
            store: MemoryStore::default(),
            notifier: RecordingNotifier::default(),
        }
    }

    fn run(
        &self,
        mailbox: &mut MemoryMailbox,
        registry: &mut ReportRegistry,
    ) -> Vec<Option<IngestionResult>> {
        let alert = alert();
        let pipeline = IngestionPipeline::new(
            &self.http,
            &self.store,
            &self.notifier,
            &alert,
            KeyTimezone::Utc,
        );
        let threads = mailbox.inbox_threads().unwrap();
        let mut results = Vec::new();
        for thread in &threads {
            for message in &thread.messages {
                results.push(pipeline.process_message(message, mailbox, registry));
            }
        }
        results
    }
}

fn failure_of(result: &Option<IngestionResult>) -> FailureReason {
    match result {
        Some(IngestionResult::Failure { reason }) => reason.clone(),
        other => panic!("expected a failure, got {other:?}"),
    }
}

// ─── Test 1: Happy path stores, records and archives ────────────────

#[test]
fn test_report_is_stored_recorded_and_archived() {
    let harness = Harness::serving_csv("a,b,c\n");
    let received = at(2024, 3, 9, 12);
    let mut mailbox = MemoryMailbox::with(vec![report_email("m1", "Daily Spend", received)]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(results.len(), 1);
    match &results[0] {
        Some(IngestionResult::Success {
            report_name,
            artifact,
            received_at,
        }) => {
            assert_eq!(report_name, "Daily Spend");
            assert_eq!(artifact.key, "2024-03-09-Daily Spend");
            assert_eq!(artifact.size, 6);
            assert_eq!(*received_at, received);
        }
        other => panic!("expected success, got {other:?}"),
    }

    assert_eq!(
        harness.store.text("2024-03-09-Daily Spend").as_deref(),
        Some("a,b,c\n")
    );
    assert_eq!(
        registry.get("Daily Spend").unwrap().last_received_at,
        Some(received)
    );
    assert_eq!(registry.pending_updates(), 1);
    assert_eq!(mailbox.archived, vec!["m1"]);
    assert!(mailbox.flagged.is_empty());
    assert!(harness.notifier.sent.borrow().is_empty());
    assert_eq!(*harness.http.requests.borrow(), vec![DOWNLOAD_URL]);
}

// ─── Test 2: HTML-escaped links are unescaped before download ───────

#[test]
fn test_link_found_in_html_body() {
    let harness = Harness::serving_csv("x\n");
    let mut message = report_email("m1", "Daily Spend", at(2024, 3, 9, 12));
    message.body = "Open the HTML part to download.".to_string();
    message.html = Some(format!(
        "<a href=\"{}\">Download</a>",
        DOWNLOAD_URL.replace('&', "&amp;")
    ));
    let mut mailbox = MemoryMailbox::with(vec![message]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert!(results[0].as_ref().unwrap().is_success());
    assert_eq!(*harness.http.requests.borrow(), vec![DOWNLOAD_URL]);
}

// ─── Test 3: Unexpected subject ─────────────────────────────────────

#[test]
fn test_unexpected_subject_flags_and_notifies() {
    let harness = Harness::serving_csv("a\n");
    let message = InboundMessage::new("m1", "Weekly newsletter", "hello", at(2024, 3, 9, 12));
    let mut mailbox = MemoryMailbox::with(vec![message]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::UnrecognizedSubject);
    assert_eq!(mailbox.flagged, vec!["m1"]);
    assert!(mailbox.archived.is_empty());
    assert!(harness.http.requests.borrow().is_empty());

    let sent = harness.notifier.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ops@example.com");
    assert_eq!(sent[0].1, "Report alert");
    assert_eq!(
        sent[0].2,
        "Unexpected subject found for message: Weekly newsletter"
    );
}

// ─── Test 4: Report name missing from the registry ──────────────────

#[test]
fn test_unknown_report_name_is_unexpected_subject() {
    let harness = Harness::serving_csv("a\n");
    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Monthly Budget", at(2024, 3, 9, 12))]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::UnrecognizedSubject);
    assert!(harness.http.requests.borrow().is_empty());
    assert_eq!(registry.pending_updates(), 0);
}

#[test]
fn test_trailing_space_in_subject_matches_registry_name() {
    let harness = Harness::serving_csv("a\n");
    let mut message = report_email("m1", "Daily Spend", at(2024, 3, 9, 12));
    message.subject.push(' ');
    let mut mailbox = MemoryMailbox::with(vec![message]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert!(results[0].as_ref().unwrap().is_success());
    assert!(harness.store.text("2024-03-09-Daily Spend").is_some());
}

// ─── Test 5: No download link ───────────────────────────────────────

#[test]
fn test_missing_link() {
    let harness = Harness::serving_csv("a\n");
    let mut message = report_email("m1", "Daily Spend", at(2024, 3, 9, 12));
    message.body = "See http://example.com/report.csv.gz".to_string();
    let mut mailbox = MemoryMailbox::with(vec![message]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::MissingDownloadUrl);
    assert_eq!(mailbox.flagged, vec!["m1"]);
    assert_eq!(
        harness.notifier.bodies(),
        vec!["No download URL found for message: AdWords Report Request | Daily Spend"]
    );
}

// ─── Test 6: Download refused or unreachable ────────────────────────

#[test]
fn test_non_200_download() {
    let harness = Harness {
        http: StaticHttp::serving(DOWNLOAD_URL, 404, b"not found".to_vec()),
        store: MemoryStore::default(),
        notifier: RecordingNotifier::default(),
    };
    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Daily Spend", at(2024, 3, 9, 12))]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::FetchFailure);
    assert!(harness.store.objects.borrow().is_empty());
    assert_eq!(
        harness.notifier.bodies(),
        vec!["Error in downloading content for message: AdWords Report Request | Daily Spend"]
    );
}

#[test]
fn test_transport_error_is_fetch_failure() {
    let harness = Harness {
        http: StaticHttp::default(),
        store: MemoryStore::default(),
        notifier: RecordingNotifier::default(),
    };
    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Daily Spend", at(2024, 3, 9, 12))]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::FetchFailure);
}

// ─── Test 7: Body is not gzip ───────────────────────────────────────

#[test]
fn test_plain_body_is_decompression_failure() {
    let harness = Harness {
        http: StaticHttp::serving(DOWNLOAD_URL, 200, b"a,b,c\n".to_vec()),
        store: MemoryStore::default(),
        notifier: RecordingNotifier::default(),
    };
    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Daily Spend", at(2024, 3, 9, 12))]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert_eq!(failure_of(&results[0]), FailureReason::DecompressionFailure);
    assert_eq!(
        harness.notifier.bodies(),
        vec!["Error in converting download to csv for message: AdWords Report Request | Daily Spend"]
    );
}

// ─── Test 8: Store rejects the write ────────────────────────────────

#[test]
fn test_storage_failure_flags_without_recording() {
    let harness = Harness {
        http: StaticHttp::serving(DOWNLOAD_URL, 200, gzip("a\n")),
        store: MemoryStore {
            fail: true,
            ..MemoryStore::default()
        },
        notifier: RecordingNotifier::default(),
    };
    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Daily Spend", at(2024, 3, 9, 12))]);
    let mut registry = registry();

    let results = harness.run(&mut mailbox, &mut registry);

    assert!(matches!(
        failure_of(&results[0]),
        FailureReason::StorageFailure(_)
    ));
    assert_eq!(registry.get("Daily Spend").unwrap().last_received_at, None);
    assert_eq!(mailbox.flagged, vec!["m1"]);
    assert!(mailbox.archived.is_empty());
    assert_eq!(harness.notifier.sent.borrow().len(), 1);
}

// ─── Test 9: Flagged messages are left alone ────────────────────────

#[test]
fn test_second_pass_skips_flagged_message() {
    let harness = Harness::serving_csv("a\n");
    let message = InboundMessage::new("m1", "Weekly newsletter", "hello", at(2024, 3, 9, 12));
    let mut mailbox = MemoryMailbox::with(vec![message]);
    let mut registry = registry();

    harness.run(&mut mailbox, &mut registry);
    let second = harness.run(&mut mailbox, &mut registry);

    assert_eq!(second.len(), 1);
    assert!(second[0].is_none());
    assert_eq!(mailbox.flagged, vec!["m1"]);
    assert_eq!(harness.notifier.sent.borrow().len(), 1);
}

// ─── Test 10: Receipt dates only move forward ───────────────────────

#[test]
fn test_older_delivery_keeps_newer_receipt() {
    let harness = Harness::serving_csv("a\n");
    let newer = at(2024, 3, 9, 12);
    let mut registry = registry();
    registry.record_receipt("Daily Spend", newer);

    let mut mailbox =
        MemoryMailbox::with(vec![report_email("m1", "Daily Spend", at(2024, 3, 1, 8))]);
    let results = harness.run(&mut mailbox, &mut registry);

    assert!(results[0].as_ref().unwrap().is_success());
    assert_eq!(
        registry.get("Daily Spend").unwrap().last_received_at,
        Some(newer)
    );
    assert_eq!(mailbox.archived, vec!["m1"]);
    assert!(harness.store.text("2024-03-01-Daily Spend").is_some());
}

// ─── Test 11: Whole pass summary ────────────────────────────────────

#[test]
fn test_process_threads_counts_outcomes() {
    let harness = Harness::serving_csv("a\n");
    let mut skipped = InboundMessage::new("m3", "Already failed", "", at(2024, 3, 7, 9));
    skipped.flagged = true;
    let mut mailbox = MemoryMailbox::with(vec![
        report_email("m1", "Daily Spend", at(2024, 3, 9, 12)),
        report_email("m2", "Weekly Clicks", at(2024, 3, 8, 12)),
        InboundMessage::new("m4", "Lunch?", "", at(2024, 3, 6, 9)),
        skipped,
    ]);
    let mut registry = registry();
    let alert = alert();
    let pipeline = IngestionPipeline::new(
        &harness.http,
        &harness.store,
        &harness.notifier,
        &alert,
        KeyTimezone::Utc,
    );

    let threads = mailbox.inbox_threads().unwrap();
    let calls = std::cell::RefCell::new(Vec::new());
    let summary = pipeline.process_threads(
        &threads,
        &mut mailbox,
        &mut registry,
        Some(&|done, total| calls.borrow_mut().push((done, total))),
    );

    assert_eq!(summary.threads, 4);
    assert_eq!(summary.messages, 4);
    assert_eq!(summary.ingested, 2);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.artifacts.len(), 2);
    assert_eq!(calls.borrow().last(), Some(&(4, 4)));
    assert_eq!(registry.pending_updates(), 2);
}
