//! Persistent processing tracker.
//!
//! The tracker owns the work queue and the three terminal record sets
//! (processed, failed, skipped) that give the pipeline crash-resumable,
//! idempotent batch semantics. Every identifier appears in at most one
//! record set; recording an outcome removes any prior record for that id.
//! All mutations run under a single mutex boundary; `persist` snapshots
//! the state under the lock and writes after releasing it.

mod persist;

pub use persist::{TRACKER_SCHEMA_VERSION, TrackerFile, TrackerLock, load as read_tracker_file};

use crate::errors::TrackerError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Record of a successfully processed artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub path: String,
    pub file_name: String,
    pub processed_at: DateTime<Utc>,
    pub result: Value,
    pub dependencies_resolved: Vec<String>,
    pub retry_count: u32,
}

/// Record of a failed artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedRecord {
    pub path: String,
    pub file_name: String,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}

/// Record of a deliberately skipped artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedRecord {
    pub path: String,
    pub file_name: String,
    pub reason: String,
}

/// Aggregate run statistics derived from the tracker state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackerStatistics {
    pub total_processed: usize,
    pub total_failed: usize,
    pub total_skipped: usize,
    pub remaining_in_queue: usize,
    pub total_dependencies_resolved: usize,
    /// Percentage of terminal outcomes that succeeded (0.0 when nothing
    /// has reached a processed/failed outcome yet).
    pub success_rate: f64,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone)]
struct TrackerState {
    queue: VecDeque<String>,
    processed: BTreeMap<String, ProcessedRecord>,
    failed: BTreeMap<String, FailedRecord>,
    skipped: BTreeMap<String, SkippedRecord>,
    started_at: DateTime<Utc>,
}

impl TrackerState {
    fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            processed: BTreeMap::new(),
            failed: BTreeMap::new(),
            skipped: BTreeMap::new(),
            started_at: Utc::now(),
        }
    }

    fn is_terminal(&self, id: &str) -> bool {
        self.processed.contains_key(id)
            || self.failed.contains_key(id)
            || self.skipped.contains_key(id)
    }

    fn remove_records(&mut self, id: &str) {
        self.processed.remove(id);
        self.failed.remove(id);
        self.skipped.remove(id);
    }

    fn statistics(&self) -> TrackerStatistics {
        let total_processed = self.processed.len();
        let total_failed = self.failed.len();
        let terminal = total_processed + total_failed;
        let success_rate = if terminal == 0 {
            0.0
        } else {
            total_processed as f64 / terminal as f64 * 100.0
        };

        let mut all_deps = std::collections::BTreeSet::new();
        for record in self.processed.values() {
            all_deps.extend(record.dependencies_resolved.iter().cloned());
        }

        TrackerStatistics {
            total_processed,
            total_failed,
            total_skipped: self.skipped.len(),
            remaining_in_queue: self.queue.len(),
            total_dependencies_resolved: all_deps.len(),
            success_rate,
            elapsed_seconds: (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0,
        }
    }
}

fn file_name_of(id: &str) -> String {
    Path::new(id)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.to_string())
}

/// Tracks queue state and per-artifact outcomes across a migration run.
pub struct ProcessingTracker {
    state: Mutex<TrackerState>,
    file: Option<PathBuf>,
    _lock: Option<TrackerLock>,
}

impl ProcessingTracker {
    /// In-memory tracker with no persistence.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(TrackerState::new()),
            file: None,
            _lock: None,
        }
    }

    /// Tracker persisted at `path`. Acquires an exclusive lock for the
    /// lifetime of the tracker and restores prior state when the file
    /// already exists.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, TrackerError> {
        let path = path.into();
        let lock = TrackerLock::acquire(&path)?;

        let tracker = Self {
            state: Mutex::new(TrackerState::new()),
            file: Some(path.clone()),
            _lock: Some(lock),
        };

        if path.exists() {
            tracker.restore()?;
        }

        Ok(tracker)
    }

    pub fn file(&self) -> Option<&Path> {
        self.file.as_deref()
    }

    fn state(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append identifiers not already queued and not already terminal.
    pub fn enqueue<I>(&self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut state = self.state();
        for id in ids {
            let id = id.into();
            if !state.queue.contains(&id) && !state.is_terminal(&id) {
                state.queue.push_back(id);
            }
        }
    }

    /// Pop the head of the queue.
    pub fn dequeue(&self) -> Option<String> {
        self.state().queue.pop_front()
    }

    pub fn queue_len(&self) -> usize {
        self.state().queue.len()
    }

    pub fn is_processed(&self, id: &str) -> bool {
        self.state().processed.contains_key(id)
    }

    /// True when the id has any terminal record.
    pub fn is_terminal(&self, id: &str) -> bool {
        self.state().is_terminal(id)
    }

    /// Record a successful outcome, replacing any prior record for `id`.
    pub fn record_processed(
        &self,
        id: &str,
        result: Value,
        dependencies_resolved: Vec<String>,
        retry_count: u32,
    ) {
        let mut state = self.state();
        state.remove_records(id);
        state.processed.insert(
            id.to_string(),
            ProcessedRecord {
                path: id.to_string(),
                file_name: file_name_of(id),
                processed_at: Utc::now(),
                result,
                dependencies_resolved,
                retry_count,
            },
        );
    }

    /// Record a failure, replacing any prior record for `id`.
    pub fn record_failed(&self, id: &str, reason: impl Into<String>) {
        let mut state = self.state();
        state.remove_records(id);
        state.failed.insert(
            id.to_string(),
            FailedRecord {
                path: id.to_string(),
                file_name: file_name_of(id),
                reason: reason.into(),
                failed_at: Utc::now(),
            },
        );
    }

    /// Record a skip, replacing any prior record for `id`.
    pub fn record_skipped(&self, id: &str, reason: impl Into<String>) {
        let mut state = self.state();
        state.remove_records(id);
        state.skipped.insert(
            id.to_string(),
            SkippedRecord {
                path: id.to_string(),
                file_name: file_name_of(id),
                reason: reason.into(),
            },
        );
    }

    pub fn failed_records(&self) -> Vec<FailedRecord> {
        self.state().failed.values().cloned().collect()
    }

    pub fn skipped_records(&self) -> Vec<SkippedRecord> {
        self.state().skipped.values().cloned().collect()
    }

    pub fn statistics(&self) -> TrackerStatistics {
        self.state().statistics()
    }

    /// Serialize the full state to the configured file, atomically.
    ///
    /// A failure here is fatal for the current run: in-memory state may
    /// already diverge from disk, which voids the resumability guarantee.
    pub fn persist(&self) -> Result<(), TrackerError> {
        let path = self.file.clone().ok_or(TrackerError::NoPath)?;
        let snapshot = {
            let state = self.state.lock().map_err(|_| TrackerError::LockPoisoned)?;
            TrackerFile {
                version: TRACKER_SCHEMA_VERSION,
                start_time: state.started_at,
                last_updated: Utc::now(),
                processed: state.processed.clone(),
                failed: state.failed.clone(),
                skipped: state.skipped.clone(),
                queue: state.queue.iter().cloned().collect(),
                statistics: state.statistics(),
            }
        };
        persist::save_atomic(&path, &snapshot)
    }

    /// Replace in-memory state with the last persisted state.
    pub fn restore(&self) -> Result<(), TrackerError> {
        let path = self.file.clone().ok_or(TrackerError::NoPath)?;
        let file = persist::load(&path)?;

        let mut state = self.state();
        state.queue = file.queue.into_iter().collect();
        state.processed = file.processed;
        state.failed = file.failed;
        state.skipped = file.skipped;
        state.started_at = file.start_time;
        Ok(())
    }

    /// Clear all records and the queue; the next enqueue of a previously
    /// terminal id is accepted again.
    pub fn reset(&self) {
        let mut state = self.state();
        *state = TrackerState::new();
    }
}

impl Default for ProcessingTracker {
    fn default() -> Self {
        Self::new()
    }
}
