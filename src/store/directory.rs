//! [`ArtifactStore`] writing one file per report into an output folder.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::{debug, info};

use super::ArtifactStore;
use crate::error::{ReportError, Result};
use crate::model::outcome::StoredArtifact;

/// Stores artifacts as files under a single directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    /// Use `root` as the output folder, creating it if needed.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| ReportError::io(&root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File path an artifact with this key and content type lands at.
    ///
    /// Distinct keys always map to distinct files.
    pub fn path_for(&self, key: &str, content_type: &str) -> PathBuf {
        let stem = encode_key(key);
        match extension_for(content_type) {
            Some(ext) => self.root.join(format!("{stem}.{ext}")),
            None => self.root.join(stem),
        }
    }
}

impl ArtifactStore for DirectoryStore {
    fn store(&self, key: &str, data: &[u8], content_type: &str) -> Result<StoredArtifact> {
        let path = self.path_for(key, content_type);
        if path.exists() {
            info!(path = %path.display(), "Replacing existing artifact");
        }

        let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".part");
        let tmp_path = path.with_file_name(tmp_name);
        std::fs::write(&tmp_path, data).map_err(|e| ReportError::io(&tmp_path, e))?;
        std::fs::rename(&tmp_path, &path).map_err(|e| ReportError::io(&path, e))?;

        let sha256 = format!("{:x}", Sha256::digest(data));
        debug!(path = %path.display(), bytes = data.len(), sha256 = %sha256, "Stored artifact");

        Ok(StoredArtifact {
            key: key.to_string(),
            location: path,
            size: data.len() as u64,
            sha256,
        })
    }
}

/// Percent-encode the characters a file name cannot hold, plus `%` itself.
///
/// Everything else, spaces included, is kept as is.
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for c in key.chars() {
        match c {
            '%' | '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => {
                out.push_str(&format!("%{:02X}", c as u32));
            }
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for b in c.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
            c => out.push(c),
        }
    }
    out
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type.split(';').next().unwrap_or("").trim() {
        "text/csv" => Some("csv"),
        "text/plain" => Some("txt"),
        "application/json" => Some("json"),
        _ => None,
    }
}
