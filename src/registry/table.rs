//! Tabular backing for the report registry.
//!
//! The registry is a four-column table (`name`, `description`,
//! `alert_threshold_days`, `last_received_at`) with a header in row 1.
//! [`CsvTable`] keeps it in a CSV file on disk.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{ReportError, Result};

/// One cell to overwrite. Indices are 0-based over all rows, header included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellUpdate {
    pub row: usize,
    pub column: usize,
    pub value: String,
}

/// A table that can be read in full and rewritten cell by cell.
pub trait RegistryTable {
    /// Human-readable location, used in error messages.
    fn location(&self) -> PathBuf;

    /// Read every row, header included.
    fn read_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Overwrite the given cells, leaving everything else untouched.
    fn update_cells(&mut self, updates: &[CellUpdate]) -> Result<()>;
}

/// Registry table stored as an RFC 4180 CSV file.
#[derive(Debug, Clone)]
pub struct CsvTable {
    path: PathBuf,
}

impl CsvTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryTable for CsvTable {
    fn location(&self) -> PathBuf {
        self.path.clone()
    }

    fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let text = std::fs::read_to_string(&self.path).map_err(|e| ReportError::io(&self.path, e))?;
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(&text);

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ReportError::csv(&self.path, e))?;
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn update_cells(&mut self, updates: &[CellUpdate]) -> Result<()> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut rows = self.read_rows()?;
        for update in updates {
            let row = rows.get_mut(update.row).ok_or_else(|| ReportError::RegistryWrite {
                path: self.path.clone(),
                reason: format!("row {} does not exist", update.row + 1),
            })?;
            if row.len() <= update.column {
                row.resize(update.column + 1, String::new());
            }
            row[update.column] = update.value.clone();
        }

        // Write next to the target and rename, so a crash never leaves half a table.
        let tmp_path = self.path.with_extension("csv.tmp");
        let file = std::fs::File::create(&tmp_path).map_err(|e| ReportError::io(&tmp_path, e))?;
        let mut writer = csv::WriterBuilder::new().flexible(true).from_writer(file);
        for row in &rows {
            writer
                .write_record(row)
                .map_err(|e| ReportError::csv(&tmp_path, e))?;
        }
        let file = writer
            .into_inner()
            .map_err(|e| ReportError::io(&tmp_path, e.into_error()))?;
        file.sync_all().map_err(|e| ReportError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &self.path).map_err(|e| ReportError::io(&self.path, e))?;

        debug!(path = %self.path.display(), cells = updates.len(), "Rewrote registry table");
        Ok(())
    }
}
