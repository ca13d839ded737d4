//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `--config <path>` (command line)
//! 2. `$REPORTFETCH_CONFIG` (environment variable)
//! 3. `~/.config/reportfetch/config.toml` (Linux/macOS)
//!    `%APPDATA%\reportfetch\config.toml` (Windows)
//! 4. Built-in defaults
//!
//! The defaults are not enough to run a batch: [`Config::validate`] insists on
//! a recipient, a maildir, a registry table and an output folder.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ReportError, Result};
use crate::job::JobSettings;
use crate::notify::AlertSettings;
use crate::store::KeyTimezone;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Inbox location.
    pub mailbox: MailboxConfig,
    /// Report registry table.
    pub registry: RegistryConfig,
    /// Where downloaded reports are written.
    pub storage: StorageConfig,
    /// Alert delivery.
    pub notification: NotificationConfig,
    /// Report download client.
    pub http: HttpConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
    /// Time zone for the date in storage keys: "local" or "utc".
    pub key_timezone: KeyTimezone,
}

/// Inbox location.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MailboxConfig {
    /// Maildir holding the report emails.
    pub maildir: Option<PathBuf>,
    /// Maildir that ingested messages are moved to (default: `<maildir>/.Archive`).
    pub archive_dir: Option<PathBuf>,
}

/// Report registry table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// CSV file: name, description, alert threshold in days, last received.
    pub path: Option<PathBuf>,
}

/// Where downloaded reports are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Output folder.
    pub output_dir: Option<PathBuf>,
}

/// Alert delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Address that receives failure and overdue alerts.
    pub recipient: String,
    /// `From:` address of queued alerts.
    pub sender: String,
    /// Subject line of every alert.
    pub subject: String,
    /// Folder alerts are queued in as `.eml` files. Alerts are only logged when unset.
    pub outbox_dir: Option<PathBuf>,
}

/// Report download client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header.
    pub user_agent: String,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "info".to_string(),
            key_timezone: KeyTimezone::Local,
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            sender: "reportfetch@localhost".to_string(),
            subject: "Report ingestion alert".to_string(),
            outbox_dir: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            user_agent: concat!("reportfetch/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

// ── Validation ──────────────────────────────────────────────────

/// Locations a batch run needs, all present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub maildir: PathBuf,
    pub archive_dir: Option<PathBuf>,
    pub registry: PathBuf,
    pub output_dir: PathBuf,
}

impl Config {
    /// Check that everything a batch run needs is set.
    pub fn validate(&self) -> Result<RunPaths> {
        let mut missing = Vec::new();
        if self.notification.recipient.trim().is_empty() {
            missing.push("notification.recipient");
        }
        if self.mailbox.maildir.is_none() {
            missing.push("mailbox.maildir");
        }
        if self.registry.path.is_none() {
            missing.push("registry.path");
        }
        if self.storage.output_dir.is_none() {
            missing.push("storage.output_dir");
        }
        if self.http.timeout_secs == 0 {
            missing.push("http.timeout_secs (must be > 0)");
        }
        if !missing.is_empty() {
            return Err(ReportError::Config(format!(
                "missing settings: {}",
                missing.join(", ")
            )));
        }

        Ok(RunPaths {
            maildir: self.mailbox.maildir.clone().unwrap_or_default(),
            archive_dir: self.mailbox.archive_dir.clone(),
            registry: self.registry.path.clone().unwrap_or_default(),
            output_dir: self.storage.output_dir.clone().unwrap_or_default(),
        })
    }

    /// Settings handed to [`run_batch`](crate::job::run_batch).
    pub fn job_settings(&self) -> JobSettings {
        JobSettings {
            alert: AlertSettings {
                recipient: self.notification.recipient.clone(),
                subject: self.notification.subject.clone(),
            },
            key_timezone: self.general.key_timezone,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }
}

// ── Load ────────────────────────────────────────────────────────

/// Load configuration from `explicit` or the standard locations.
///
/// An explicitly given file must exist. Any file that is found must parse.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => match config_file_path() {
            Some(p) if p.exists() => p,
            _ => {
                tracing::debug!("No config file found, using defaults");
                return Ok(Config::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path).map_err(|e| ReportError::io(&path, e))?;
    let cfg = toml::from_str::<Config>(&contents)
        .map_err(|e| ReportError::Config(format!("{}: {e}", path.display())))?;
    tracing::info!(path = %path.display(), "Loaded config");
    Ok(cfg)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("REPORTFETCH_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("reportfetch").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("reportfetch")
}
