//! Aggregate execution report for one run.

use crate::refine::PhaseAttempt;
use crate::tracker::TrackerStatistics;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Outcome of one artifact across the full pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactReport {
    pub id: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub attempts: Vec<PhaseAttempt>,
}

/// Roll-up of every validation performed during the run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total_validations: usize,
    pub passed: usize,
    pub needs_refinement: usize,
    pub average_success_factor: f64,
}

impl ValidationSummary {
    fn from_artifacts(artifacts: &[ArtifactReport]) -> Self {
        let attempts: Vec<&PhaseAttempt> =
            artifacts.iter().flat_map(|a| a.attempts.iter()).collect();
        let total = attempts.len();
        let passed = attempts.iter().filter(|a| a.passed).count();
        let average = if total == 0 {
            0.0
        } else {
            let sum: f64 = attempts.iter().map(|a| a.validation.success_factor).sum();
            (sum / total as f64 * 100.0).round() / 100.0
        };

        Self {
            total_validations: total,
            passed,
            needs_refinement: total - passed,
            average_success_factor: average,
        }
    }
}

/// Read-only aggregate of all phase attempts and tracker outcomes,
/// produced at the end of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub artifacts: Vec<ArtifactReport>,
    pub validation: ValidationSummary,
    pub statistics: TrackerStatistics,
}

impl ExecutionReport {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            ended_at: None,
            artifacts: Vec::new(),
            validation: ValidationSummary::default(),
            statistics: TrackerStatistics::default(),
        }
    }

    pub fn record_artifact(&mut self, artifact: ArtifactReport) {
        self.artifacts.push(artifact);
    }

    /// Close the report with final tracker statistics.
    pub fn finish(&mut self, statistics: TrackerStatistics) {
        self.ended_at = Some(Utc::now());
        self.validation = ValidationSummary::from_artifacts(&self.artifacts);
        self.statistics = statistics;
    }

    pub fn passed_count(&self) -> usize {
        self.artifacts.iter().filter(|a| a.passed).count()
    }

    pub fn failed_count(&self) -> usize {
        self.artifacts.len() - self.passed_count()
    }

    /// Write the report as JSON into `dir`, named after the run id.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).context("Failed to create report directory")?;
        let path = dir.join(format!("run-{}.json", self.run_id));
        let content =
            serde_json::to_string_pretty(self).context("Failed to serialize execution report")?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        Ok(path)
    }
}

impl Default for ExecutionReport {
    fn default() -> Self {
        Self::new()
    }
}
