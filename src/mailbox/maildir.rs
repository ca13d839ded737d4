//! Maildir-backed [`Mailbox`].
//!
//! The inbox is the `new/` and `cur/` subdirectories of the Maildir root.
//! Flags live in the file name after `:2,`; the `F` (flagged) flag marks a
//! message whose ingestion already failed. Archiving moves the file into
//! the `cur/` folder of a separate archive Maildir.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::threading::build_threads;
use super::Mailbox;
use crate::error::{ReportError, Result};
use crate::model::message::{InboundMessage, MailThread};
use crate::parser::eml::parse_eml;

/// Separator between the unique name and the info section of a Maildir file name.
const INFO_SEPARATOR: &str = ":2,";
const FLAGGED: char = 'F';
const SEEN: char = 'S';

/// A Maildir inbox with an archive Maildir next to it.
#[derive(Debug, Clone)]
pub struct Maildir {
    root: PathBuf,
    archive: PathBuf,
}

/// One file of the inbox, split into its unique name and flags.
#[derive(Debug, Clone, PartialEq, Eq)]
struct MaildirEntry {
    path: PathBuf,
    id: String,
    flags: String,
}

impl Maildir {
    /// Open a Maildir. `archive` defaults to the `.Archive` sub-folder (Maildir++ layout).
    ///
    /// Missing `new/`, `cur/` and `tmp/` directories are created.
    pub fn open(root: impl Into<PathBuf>, archive: Option<PathBuf>) -> Result<Self> {
        let root = root.into();
        let archive = archive.unwrap_or_else(|| root.join(".Archive"));
        ensure_layout(&root)?;
        Ok(Self { root, archive })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn archive_dir(&self) -> &Path {
        &self.archive
    }

    /// List inbox files (`new/` first, then `cur/`), sorted by name within each.
    fn entries(&self) -> Result<Vec<MaildirEntry>> {
        let mut result = Vec::new();
        for sub in ["new", "cur"] {
            let dir = self.root.join(sub);
            let mut names: Vec<PathBuf> = std::fs::read_dir(&dir)
                .map_err(|e| ReportError::io(&dir, e))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|p| p.is_file())
                .collect();
            names.sort();

            for path in names {
                let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let (id, flags) = split_name(name);
                result.push(MaildirEntry {
                    id: id.to_string(),
                    flags: flags.to_string(),
                    path,
                });
            }
        }
        Ok(result)
    }

    fn locate(&self, id: &str) -> Result<MaildirEntry> {
        self.entries()?
            .into_iter()
            .find(|e| e.id == id)
            .ok_or_else(|| ReportError::Mailbox(format!("message '{id}' not found in inbox")))
    }
}

impl Mailbox for Maildir {
    fn inbox_threads(&mut self) -> Result<Vec<MailThread>> {
        let entries = self.entries()?;
        let mut messages: Vec<InboundMessage> = Vec::with_capacity(entries.len());

        for entry in &entries {
            let fallback = modified_time(&entry.path);
            match parse_eml(&entry.path, &entry.id, entry.flags.contains(FLAGGED), fallback) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    warn!(path = %entry.path.display(), error = %e, "Skipping unreadable message");
                }
            }
        }

        debug!(root = %self.root.display(), count = messages.len(), "Listed inbox");
        Ok(build_threads(messages))
    }

    fn flag(&mut self, id: &str) -> Result<()> {
        let entry = self.locate(id)?;
        if entry.flags.contains(FLAGGED) {
            return Ok(());
        }

        let flags = add_flag(&entry.flags, FLAGGED);
        let target = self
            .root
            .join("cur")
            .join(format!("{}{INFO_SEPARATOR}{flags}", entry.id));
        std::fs::rename(&entry.path, &target).map_err(|e| ReportError::io(&entry.path, e))?;

        info!(id = id, "Flagged message");
        Ok(())
    }

    fn archive(&mut self, id: &str) -> Result<()> {
        let entry = self.locate(id)?;
        ensure_layout(&self.archive)?;

        let flags = add_flag(&entry.flags, SEEN);
        let target = self
            .archive
            .join("cur")
            .join(format!("{}{INFO_SEPARATOR}{flags}", entry.id));
        std::fs::rename(&entry.path, &target).map_err(|e| ReportError::io(&entry.path, e))?;

        info!(id = id, archive = %self.archive.display(), "Archived message");
        Ok(())
    }
}

/// Create `new/`, `cur/` and `tmp/` under `root` if missing.
fn ensure_layout(root: &Path) -> Result<()> {
    for sub in ["new", "cur", "tmp"] {
        let dir = root.join(sub);
        std::fs::create_dir_all(&dir).map_err(|e| ReportError::io(&dir, e))?;
    }
    Ok(())
}

/// Split `unique:2,FS` into (`unique`, `FS`).
fn split_name(name: &str) -> (&str, &str) {
    match name.find(INFO_SEPARATOR) {
        Some(pos) => (&name[..pos], &name[pos + INFO_SEPARATOR.len()..]),
        None => (name, ""),
    }
}

/// Add a flag, keeping flags sorted and unique as Maildir requires.
fn add_flag(flags: &str, flag: char) -> String {
    let mut chars: Vec<char> = flags.chars().chain(std::iter::once(flag)).collect();
    chars.sort_unstable();
    chars.dedup();
    chars.into_iter().collect()
}

fn modified_time(path: &Path) -> DateTime<Utc> {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| DateTime::<Utc>::from(SystemTime::UNIX_EPOCH))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("123.M1.host:2,FS"), ("123.M1.host", "FS"));
        assert_eq!(split_name("123.M1.host"), ("123.M1.host", ""));
    }

    #[test]
    fn test_add_flag_sorted_unique() {
        assert_eq!(add_flag("S", 'F'), "FS");
        assert_eq!(add_flag("FS", 'F'), "FS");
        assert_eq!(add_flag("", 'S'), "S");
    }

    #[test]
    fn test_open_creates_layout() {
        let tmp = tempfile::tempdir().unwrap();
        let maildir = Maildir::open(tmp.path().join("inbox"), None).unwrap();
        assert!(maildir.root().join("new").is_dir());
        assert!(maildir.root().join("cur").is_dir());
        assert!(maildir.root().join("tmp").is_dir());
        assert_eq!(maildir.archive_dir(), tmp.path().join("inbox").join(".Archive"));
    }
}
