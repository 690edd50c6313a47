//! Audit trail of cache lifecycle events
//!
//! Each event is one JSON line in `<state_dir>/treecache/audit.log`:
//! `{"timestamp":..,"service":..,"event":"cache.purged",..fields}`.

use crate::cache::PurgeReport;
use crate::config::{schema::Config, ConfigManager};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Something a cache service did that is worth keeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum AuditEvent {
    #[serde(rename = "cache.activated")]
    Activated { root: String, resolver_live: bool },
    #[serde(rename = "cache.deactivated")]
    Deactivated,
    #[serde(rename = "cache.purged")]
    Purged {
        purged_by: String,
        removed: usize,
        failed: usize,
    },
    #[serde(rename = "cache.write_failed")]
    WriteFailed { path: String, reason: String },
}

impl AuditEvent {
    pub fn purged(report: &PurgeReport) -> Self {
        Self::Purged {
            purged_by: report.purged_by.clone(),
            removed: report.removed_count(),
            failed: report.failed_count(),
        }
    }
}

#[derive(Serialize)]
struct AuditEntry<'a> {
    timestamp: DateTime<Utc>,
    service: &'a str,
    #[serde(flatten)]
    event: &'a AuditEvent,
}

/// Appends audit events for one service
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Option<PathBuf>,
}

impl AuditLog {
    /// Audit log at the default location, if enabled in config
    pub fn new(config: &Config) -> Self {
        if config.general.audit_log {
            Self::at(ConfigManager::audit_log_path())
        } else {
            Self::disabled()
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    pub fn disabled() -> Self {
        Self { path: None }
    }

    /// Record an event. IO failures are logged and the event dropped.
    pub async fn record(&self, service: &str, event: AuditEvent) {
        let Some(path) = &self.path else {
            return;
        };

        let entry = AuditEntry {
            timestamp: Utc::now(),
            service,
            event: &event,
        };
        let mut line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                warn!("Failed to serialize audit event: {}", e);
                return;
            }
        };
        line.push('\n');

        if let Err(e) = append(path, &line).await {
            warn!("Failed to write audit log {}: {}", path.display(), e);
        }
    }
}

async fn append(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}
