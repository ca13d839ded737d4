//! The report registry: known report names, alert thresholds, and last-received dates.
//!
//! Loaded once per run from a [`RegistryTable`], updated in memory as reports
//! arrive, and written back explicitly with [`ReportRegistry::save`].

pub mod table;

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::error::{ReportError, Result};
use crate::model::report::ReportDefinition;

use self::table::{CellUpdate, RegistryTable};

const NAME_COLUMN: usize = 0;
const DESCRIPTION_COLUMN: usize = 1;
const THRESHOLD_COLUMN: usize = 2;
const LAST_RECEIVED_COLUMN: usize = 3;

#[derive(Debug, Clone)]
struct RegistryEntry {
    definition: ReportDefinition,
    /// Row in the backing table (0-based, header is row 0).
    row: usize,
    /// `last_received_at` moved since load.
    dirty: bool,
}

/// In-memory view of the registry table for one run.
#[derive(Debug, Clone, Default)]
pub struct ReportRegistry {
    entries: Vec<RegistryEntry>,
    by_name: HashMap<String, usize>,
}

impl ReportRegistry {
    /// Read the whole table. Malformed rows are skipped with a warning.
    ///
    /// Fails with [`ReportError::RegistryUnavailable`] when the table cannot be read.
    pub fn load(table: &dyn RegistryTable) -> Result<Self> {
        let rows = table
            .read_rows()
            .map_err(|e| ReportError::RegistryUnavailable {
                path: table.location(),
                reason: e.to_string(),
            })?;

        let mut registry = Self::default();
        for (row_index, row) in rows.iter().enumerate().skip(1) {
            match parse_row(row) {
                Ok(Some(definition)) => {
                    if registry.by_name.contains_key(&definition.name) {
                        warn!(
                            row = row_index + 1,
                            name = %definition.name,
                            "Duplicate report name in registry, keeping the first"
                        );
                        continue;
                    }
                    registry.push(definition, row_index);
                }
                Ok(None) => {}
                Err(reason) => {
                    warn!(row = row_index + 1, reason = %reason, "Skipping malformed registry row");
                }
            }
        }

        info!(
            location = %table.location().display(),
            reports = registry.len(),
            "Loaded report registry"
        );
        Ok(registry)
    }

    /// Build a registry from definitions, as if read from consecutive table rows.
    pub fn from_definitions(definitions: impl IntoIterator<Item = ReportDefinition>) -> Self {
        let mut registry = Self::default();
        for (i, definition) in definitions.into_iter().enumerate() {
            if !registry.by_name.contains_key(&definition.name) {
                registry.push(definition, i + 1);
            }
        }
        registry
    }

    fn push(&mut self, definition: ReportDefinition, row: usize) {
        self.by_name
            .insert(definition.name.clone(), self.entries.len());
        self.entries.push(RegistryEntry {
            definition,
            row,
            dirty: false,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ReportDefinition> {
        self.by_name.get(name).map(|&i| &self.entries[i].definition)
    }

    /// Definitions in table order.
    pub fn definitions(&self) -> impl Iterator<Item = &ReportDefinition> {
        self.entries.iter().map(|e| &e.definition)
    }

    /// Record that `name` was received at `timestamp`.
    ///
    /// The stored value only moves forward. Unknown names are ignored.
    /// Returns `true` if the stored value changed.
    pub fn record_receipt(&mut self, name: &str, timestamp: DateTime<Utc>) -> bool {
        let Some(&index) = self.by_name.get(name) else {
            warn!(name = name, "Receipt for a report missing from the registry");
            return false;
        };

        let entry = &mut self.entries[index];
        match entry.definition.last_received_at {
            Some(current) if current >= timestamp => {
                debug!(name = name, %current, %timestamp, "Keeping newer receipt");
                false
            }
            _ => {
                entry.definition.last_received_at = Some(timestamp);
                entry.dirty = true;
                true
            }
        }
    }

    /// Names of reports silent for longer than their threshold, in table order.
    pub fn list_overdue(&self, now: DateTime<Utc>) -> Vec<String> {
        self.definitions()
            .filter(|d| d.is_overdue(now))
            .map(|d| d.name.clone())
            .collect()
    }

    /// Number of receipts not yet written back.
    pub fn pending_updates(&self) -> usize {
        self.entries.iter().filter(|e| e.dirty).count()
    }

    /// Write every changed `last_received_at` back to the table in one update.
    ///
    /// Returns the number of cells written.
    pub fn save(&mut self, table: &mut dyn RegistryTable) -> Result<usize> {
        let updates: Vec<CellUpdate> = self
            .entries
            .iter()
            .filter(|e| e.dirty)
            .filter_map(|e| {
                e.definition.last_received_at.map(|ts| CellUpdate {
                    row: e.row,
                    column: LAST_RECEIVED_COLUMN,
                    value: format_timestamp(ts),
                })
            })
            .collect();

        if updates.is_empty() {
            return Ok(0);
        }

        table
            .update_cells(&updates)
            .map_err(|e| ReportError::RegistryWrite {
                path: table.location(),
                reason: e.to_string(),
            })?;

        for entry in &mut self.entries {
            entry.dirty = false;
        }
        info!(cells = updates.len(), "Saved report registry");
        Ok(updates.len())
    }
}

/// Parse one data row. `Ok(None)` for blank rows.
fn parse_row(row: &[String]) -> std::result::Result<Option<ReportDefinition>, String> {
    let cell = |i: usize| row.get(i).map(|s| s.trim()).unwrap_or("");

    if row.iter().all(|c| c.trim().is_empty()) {
        return Ok(None);
    }

    let name = cell(NAME_COLUMN);
    if name.is_empty() {
        return Err("empty report name".to_string());
    }

    let threshold = cell(THRESHOLD_COLUMN);
    let alert_threshold_days = threshold
        .parse::<u32>()
        .map_err(|_| format!("invalid alert threshold '{threshold}' for '{name}'"))?;

    let last = cell(LAST_RECEIVED_COLUMN);
    let last_received_at = if last.is_empty() {
        None
    } else {
        Some(
            parse_timestamp(last)
                .ok_or_else(|| format!("invalid last received date '{last}' for '{name}'"))?,
        )
    };

    Ok(Some(ReportDefinition {
        name: name.to_string(),
        description: cell(DESCRIPTION_COLUMN).to_string(),
        alert_threshold_days,
        last_received_at,
    }))
}

/// Parse a last-received cell: RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC), or `YYYY-MM-DD`.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(ndt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(Utc.from_utc_datetime(&ndt));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

/// Render a timestamp the way [`ReportRegistry::save`] writes it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
