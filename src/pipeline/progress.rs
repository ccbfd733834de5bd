//! Run Progress Registry
//!
//! Maps run IDs to `{progress, status, filename}` snapshots. Readers poll
//! concurrently; each run replaces only its own entry, and always as a whole.
//!
//! - `progress` in `0..=100`: running, 100 means complete with `filename` set
//! - negative `progress`: terminal failure, `status` carries the error text

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

use crate::constants::progress::{COMPLETE, FAILED, QUEUED};
use crate::types::RunId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub progress: i32,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
}

impl ProgressEntry {
    pub fn is_complete(&self) -> bool {
        self.progress >= COMPLETE
    }

    pub fn is_failed(&self) -> bool {
        self.progress < 0
    }

    pub fn is_terminal(&self) -> bool {
        self.is_complete() || self.is_failed()
    }
}

/// Concurrent run-id keyed progress table
#[derive(Debug, Default)]
pub struct ProgressRegistry {
    entries: DashMap<RunId, ProgressEntry>,
}

impl ProgressRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new run and hand back its writer
    pub fn register(self: &Arc<Self>) -> RunProgress {
        let id = RunId::new();
        self.set(
            id,
            ProgressEntry {
                progress: QUEUED,
                status: "Queued".to_string(),
                filename: None,
            },
        );
        RunProgress {
            registry: Arc::clone(self),
            id,
        }
    }

    pub fn set(&self, id: RunId, entry: ProgressEntry) {
        debug!(run = %id, progress = entry.progress, "{}", entry.status);
        self.entries.insert(id, entry);
    }

    /// Snapshot of one run
    pub fn get(&self, id: &RunId) -> Option<ProgressEntry> {
        self.entries.get(id).map(|e| e.value().clone())
    }

    pub fn remove(&self, id: &RunId) -> Option<ProgressEntry> {
        self.entries.remove(id).map(|(_, e)| e)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Write handle for a single run's entry
#[derive(Debug, Clone)]
pub struct RunProgress {
    registry: Arc<ProgressRegistry>,
    id: RunId,
}

impl RunProgress {
    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn stage(&self, progress: i32, status: impl Into<String>) {
        self.registry.set(
            self.id,
            ProgressEntry {
                progress,
                status: status.into(),
                filename: None,
            },
        );
    }

    pub fn complete(&self, filename: impl Into<String>) {
        self.registry.set(
            self.id,
            ProgressEntry {
                progress: COMPLETE,
                status: "Completed".to_string(),
                filename: Some(filename.into()),
            },
        );
    }

    pub fn fail(&self, message: impl std::fmt::Display) {
        self.registry.set(
            self.id,
            ProgressEntry {
                progress: FAILED,
                status: format!("Error: {}", message),
                filename: None,
            },
        );
    }

    pub fn snapshot(&self) -> Option<ProgressEntry> {
        self.registry.get(&self.id)
    }
}
