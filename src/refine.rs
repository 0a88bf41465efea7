//! Bounded refine/retry loop around one phase.
//!
//! The loop composes a phase's transform, the quality gate, and an
//! external refiner into the state machine
//! `Pending -> Attempting(k) -> Scoring(k) -> {Passed | Attempting(k+1) |
//! ExhaustedRetries}`. `Passed` and `ExhaustedRetries` are the only
//! terminal states, and exhaustion always returns the last candidate:
//! best-effort output is preserved, never discarded.

use crate::errors::PhaseError;
use crate::gate::{PhaseGateConfig, QualityGate, ValidationResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Read-only context handed to transforms and refiners for one artifact.
#[derive(Debug, Clone, Copy)]
pub struct PhaseContext<'a> {
    pub artifact_path: &'a Path,
    pub source_content: &'a str,
    /// Feature category assigned by the classifier.
    pub category: &'a str,
    /// Resolved dependency ids of this artifact.
    pub dependencies: &'a [String],
    pub target_root: &'a Path,
}

/// One phase's content transformation. Invoked synchronously; may fail.
pub trait Transform {
    fn run(&self, input: &Value, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError>;
}

impl<F> Transform for F
where
    F: Fn(&Value, &PhaseContext<'_>) -> Result<Value, PhaseError>,
{
    fn run(&self, input: &Value, ctx: &PhaseContext<'_>) -> Result<Value, PhaseError> {
        self(input, ctx)
    }
}

/// Improves a failing candidate given validator feedback.
pub trait Refiner {
    fn refine(
        &self,
        candidate: &Value,
        validation: &ValidationResult,
        attempt: u32,
    ) -> Result<Value, PhaseError>;
}

impl<F> Refiner for F
where
    F: Fn(&Value, &ValidationResult, u32) -> Result<Value, PhaseError>,
{
    fn refine(
        &self,
        candidate: &Value,
        validation: &ValidationResult,
        attempt: u32,
    ) -> Result<Value, PhaseError> {
        self(candidate, validation, attempt)
    }
}

/// States of the refinement loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Pending,
    Attempting(u32),
    Scoring(u32),
    Passed,
    ExhaustedRetries,
}

/// Terminal status of one phase for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Passed,
    ExhaustedRetries,
}

/// Immutable record of one attempt, appended to the artifact's execution
/// log whether it passed or not.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseAttempt {
    pub phase: String,
    /// 1-based attempt number.
    pub attempt: u32,
    pub validation: ValidationResult,
    pub passed: bool,
}

/// Result of driving one phase to a terminal state.
#[derive(Debug, Clone)]
pub struct LoopOutcome {
    pub status: PhaseStatus,
    /// Passing output, or the last candidate when retries were exhausted.
    pub output: Value,
    /// Attempts actually made (= retry limit on exhaustion).
    pub attempts: u32,
}

/// Drives one phase through transform, scoring, and bounded refinement.
pub struct RefinementLoop<'a> {
    gate: &'a QualityGate,
    config: &'a PhaseGateConfig,
}

impl<'a> RefinementLoop<'a> {
    pub fn new(gate: &'a QualityGate, config: &'a PhaseGateConfig) -> Self {
        Self { gate, config }
    }

    pub fn run(
        &self,
        transform: &dyn Transform,
        refiner: &dyn Refiner,
        input: &Value,
        ctx: &PhaseContext<'_>,
        log: &mut Vec<PhaseAttempt>,
    ) -> Result<LoopOutcome, PhaseError> {
        let retry_limit = self.config.retry_limit;
        let mut state = LoopState::Pending;
        let mut candidate: Option<Value> = None;
        let mut last_validation: Option<ValidationResult> = None;
        let mut attempts_made = 0;

        loop {
            state = match state {
                LoopState::Pending => LoopState::Attempting(1),

                LoopState::Attempting(attempt) => {
                    attempts_made = attempt;
                    let next = if attempt == 1 {
                        transform.run(input, ctx)?
                    } else {
                        let previous = candidate
                            .as_ref()
                            .expect("candidate exists after the first attempt");
                        let validation = last_validation
                            .as_ref()
                            .expect("validation exists after the first scoring");
                        tracing::debug!(
                            phase = %self.config.name,
                            attempt,
                            success_factor = validation.success_factor,
                            "refining candidate"
                        );
                        refiner.refine(previous, validation, attempt)?
                    };
                    candidate = Some(next);
                    LoopState::Scoring(attempt)
                }

                LoopState::Scoring(attempt) => {
                    let output = candidate
                        .as_ref()
                        .expect("candidate exists when scoring");
                    let validation = self.gate.score(self.config, output);
                    let passed = QualityGate::passed(&validation, self.config.threshold);
                    tracing::debug!(
                        phase = %self.config.name,
                        attempt,
                        success_factor = validation.success_factor,
                        passed,
                        "phase attempt scored"
                    );
                    log.push(PhaseAttempt {
                        phase: self.config.name.clone(),
                        attempt,
                        validation: validation.clone(),
                        passed,
                    });
                    last_validation = Some(validation);

                    if passed {
                        LoopState::Passed
                    } else if attempt < retry_limit {
                        LoopState::Attempting(attempt + 1)
                    } else {
                        LoopState::ExhaustedRetries
                    }
                }

                LoopState::Passed => {
                    return Ok(LoopOutcome {
                        status: PhaseStatus::Passed,
                        output: candidate.expect("candidate exists at terminal state"),
                        attempts: attempts_made,
                    });
                }

                LoopState::ExhaustedRetries => {
                    tracing::warn!(
                        phase = %self.config.name,
                        retry_limit,
                        "phase exhausted retries; keeping best-effort output"
                    );
                    return Ok(LoopOutcome {
                        status: PhaseStatus::ExhaustedRetries,
                        output: candidate.expect("candidate exists at terminal state"),
                        attempts: attempts_made,
                    });
                }
            };
        }
    }
}
