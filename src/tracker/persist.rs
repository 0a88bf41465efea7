//! Versioned on-disk format for the processing tracker.
//!
//! State is written atomically (temp file + rename) so a crash mid-write
//! never leaves a truncated tracker behind. The schema carries an explicit
//! version: files without one are read as version 1, files from a newer
//! build are rejected instead of being partially decoded.

use super::{FailedRecord, ProcessedRecord, SkippedRecord, TrackerStatistics};
use crate::errors::TrackerError;
use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

/// Current tracker file schema version.
pub const TRACKER_SCHEMA_VERSION: u32 = 1;

fn default_version() -> u32 {
    TRACKER_SCHEMA_VERSION
}

/// Serialized tracker state.
///
/// New fields must be optional (serde defaults) so older files keep
/// restoring; incompatible changes bump `TRACKER_SCHEMA_VERSION`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerFile {
    #[serde(default = "default_version")]
    pub version: u32,
    pub start_time: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub processed: BTreeMap<String, ProcessedRecord>,
    pub failed: BTreeMap<String, FailedRecord>,
    pub skipped: BTreeMap<String, SkippedRecord>,
    pub queue: Vec<String>,
    pub statistics: TrackerStatistics,
}

/// Write the tracker file atomically.
pub fn save_atomic(path: &Path, file: &TrackerFile) -> Result<(), TrackerError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| TrackerError::Write {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let payload = serde_json::to_string_pretty(file).map_err(TrackerError::Encode)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, payload).map_err(|source| TrackerError::Write {
        path: tmp.clone(),
        source,
    })?;
    fs::rename(&tmp, path).map_err(|source| TrackerError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Load and version-check a tracker file.
pub fn load(path: &Path) -> Result<TrackerFile, TrackerError> {
    let content = fs::read_to_string(path).map_err(|source| TrackerError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let file: TrackerFile =
        serde_json::from_str(&content).map_err(|source| TrackerError::Decode {
            path: path.to_path_buf(),
            source,
        })?;

    if file.version > TRACKER_SCHEMA_VERSION {
        return Err(TrackerError::UnsupportedVersion {
            path: path.to_path_buf(),
            found: file.version,
            supported: TRACKER_SCHEMA_VERSION,
        });
    }

    Ok(file)
}

/// Exclusive advisory lock guarding a tracker file against concurrent
/// runs. Released when dropped.
#[derive(Debug)]
pub struct TrackerLock {
    _file: File,
    path: PathBuf,
}

impl TrackerLock {
    pub fn acquire(tracker_path: &Path) -> Result<Self, TrackerError> {
        let lock_path = tracker_path.with_extension("json.lock");
        if let Some(parent) = lock_path.parent() {
            fs::create_dir_all(parent).map_err(|source| TrackerError::Write {
                path: lock_path.clone(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|source| TrackerError::Write {
                path: lock_path.clone(),
                source,
            })?;

        file.try_lock_exclusive()
            .map_err(|_| TrackerError::LockHeld {
                path: tracker_path.to_path_buf(),
            })?;

        Ok(Self {
            _file: file,
            path: lock_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
