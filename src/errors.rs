//! Typed error hierarchy for the Crucible migration pipeline.
//!
//! Three top-level enums cover the three subsystems:
//! - `ConfigError` — startup configuration validation failures
//! - `TrackerError` — processing tracker persistence failures
//! - `PhaseError` — per-phase transform/refine failures

use std::path::PathBuf;
use thiserror::Error;

/// Errors from configuration loading and validation.
///
/// Every variant here is raised before the first artifact is processed;
/// a run never starts with an invalid gate configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown phase '{0}': expected one of analysis, conversion, storage")]
    UnknownPhase(String),

    #[error("Unknown criterion '{criterion}' for phase '{phase}'")]
    UnknownCriterion { phase: String, criterion: String },

    #[error("Criterion weights for phase '{phase}' sum to {sum:.4}, expected 1.0")]
    WeightSum { phase: String, sum: f64 },

    #[error("Negative weight {weight} for criterion '{criterion}' in phase '{phase}'")]
    NegativeWeight {
        phase: String,
        criterion: String,
        weight: f64,
    },

    #[error("Threshold {value} for phase '{phase}' is outside 0-100")]
    ThresholdOutOfRange { phase: String, value: f64 },

    #[error("Retry limit for phase '{0}' must be at least 1")]
    ZeroRetryLimit(String),

    #[error("Resolver max depth must be at least 1")]
    ZeroMaxDepth,
}

/// Errors from the processing tracker.
///
/// Persistence failures are fatal for the current run: once in-memory
/// state may diverge from disk the resumability guarantee is void.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Failed to write tracker file at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read tracker file at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode tracker state: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Failed to decode tracker file at {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Tracker file {path} has schema version {found}, this build supports up to {supported}")]
    UnsupportedVersion {
        path: PathBuf,
        found: u32,
        supported: u32,
    },

    #[error("Tracker file {path} is locked by another run")]
    LockHeld { path: PathBuf },

    #[error("Tracker state lock poisoned")]
    LockPoisoned,

    #[error("No tracker file path configured")]
    NoPath,
}

/// Errors from a single phase execution.
#[derive(Debug, Error)]
pub enum PhaseError {
    #[error("Transform failed in phase '{phase}': {message}")]
    TransformFailed { phase: String, message: String },

    #[error("Refinement failed in phase '{phase}' on attempt {attempt}: {message}")]
    RefineFailed {
        phase: String,
        attempt: u32,
        message: String,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PhaseError {
    /// Build a transform failure for the given phase.
    pub fn transform(phase: &str, message: impl Into<String>) -> Self {
        Self::TransformFailed {
            phase: phase.to_string(),
            message: message.into(),
        }
    }
}
