//! One batch run: load the registry, process the inbox, save, check freshness.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::error::Result;
use crate::fetch::HttpFetch;
use crate::freshness;
use crate::mailbox::Mailbox;
use crate::notify::{AlertSettings, Notifier};
use crate::pipeline::{IngestionPipeline, PassSummary};
use crate::registry::table::RegistryTable;
use crate::registry::ReportRegistry;
use crate::store::{ArtifactStore, KeyTimezone};

/// The external systems a run talks to.
pub struct Collaborators<'a> {
    pub mailbox: &'a mut dyn Mailbox,
    pub table: &'a mut dyn RegistryTable,
    pub http: &'a dyn HttpFetch,
    pub store: &'a dyn ArtifactStore,
    pub notifier: &'a dyn Notifier,
}

/// Static settings for a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSettings {
    pub alert: AlertSettings,
    pub key_timezone: KeyTimezone,
}

/// What a run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RunSummary {
    #[serde(flatten)]
    pub pass: PassSummary,
    /// Reports past their alert threshold after the pass.
    pub overdue: Vec<String>,
    /// Registry cells rewritten.
    pub registry_updates: usize,
}

/// Run one batch.
///
/// Fails before touching any message if the registry or the inbox cannot be
/// read. A failure to write the registry back is returned only after the
/// freshness check has run. `now` defaults to the clock at check time.
pub fn run_batch(
    collaborators: Collaborators<'_>,
    settings: &JobSettings,
    now: Option<DateTime<Utc>>,
    progress: Option<&dyn Fn(usize, usize)>,
) -> Result<RunSummary> {
    let Collaborators {
        mailbox,
        table,
        http,
        store,
        notifier,
    } = collaborators;

    let mut registry = ReportRegistry::load(&*table)?;
    let threads = mailbox.inbox_threads()?;
    info!(
        threads = threads.len(),
        reports = registry.len(),
        "Starting inbox pass"
    );

    let pipeline = IngestionPipeline::new(http, store, notifier, &settings.alert, settings.key_timezone);
    let pass = pipeline.process_threads(&threads, mailbox, &mut registry, progress);

    let saved = registry.save(table);

    let now = now.unwrap_or_else(Utc::now);
    let overdue = freshness::check_and_notify(&registry, now, notifier, &settings.alert);

    let registry_updates = saved.inspect_err(|e| {
        error!(error = %e, "Registry changes were not saved");
    })?;

    Ok(RunSummary {
        pass,
        overdue,
        registry_updates,
    })
}
