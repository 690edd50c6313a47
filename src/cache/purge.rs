//! Purge reports and history

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// A child of the cache root that could not be deleted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of one full purge
///
/// A purge completes even when individual deletions fail; those failures
/// are listed here instead of aborting the purge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurgeReport {
    pub purged_at: DateTime<Utc>,
    pub purged_by: String,
    pub removed: Vec<String>,
    pub failures: Vec<PurgeFailure>,
}

impl PurgeReport {
    pub fn new(purged_by: impl Into<String>) -> Self {
        Self {
            purged_at: Utc::now(),
            purged_by: purged_by.into(),
            removed: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether every child was removed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn removed_count(&self) -> usize {
        self.removed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    pub(crate) fn record_failure(&mut self, path: impl ToString, reason: impl ToString) {
        self.failures.push(PurgeFailure {
            path: path.to_string(),
            reason: reason.to_string(),
        });
    }
}

/// Most recent purge reports, newest last
#[derive(Debug, Clone)]
pub struct PurgeHistory {
    limit: usize,
    records: VecDeque<PurgeReport>,
}

impl PurgeHistory {
    /// History keeping at most `limit` reports (at least one)
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            limit,
            records: VecDeque::with_capacity(limit),
        }
    }

    pub fn push(&mut self, report: PurgeReport) {
        if self.records.len() == self.limit {
            self.records.pop_front();
        }
        self.records.push_back(report);
    }

    pub fn last(&self) -> Option<&PurgeReport> {
        self.records.back()
    }

    pub fn records(&self) -> Vec<PurgeReport> {
        self.records.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
