//! Phase pipeline: ordered, quality-gated phases for one artifact.
//!
//! Each phase's output feeds the next phase's input, and each phase is
//! independently wrapped in a refinement loop with its own gate
//! configuration. Whether a phase that exhausts its retries halts the
//! artifact or lets later phases run on the best-effort output is an
//! explicit configuration decision, never an implicit default.

use crate::errors::PhaseError;
use crate::gate::{PhaseGateConfig, QualityGate};
use crate::refine::{PhaseAttempt, PhaseContext, PhaseStatus, RefinementLoop, Refiner, Transform};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What the pipeline does with remaining phases after one phase exhausts
/// its retries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Stop the artifact at the failing phase.
    #[default]
    #[serde(rename = "halt")]
    Halt,
    /// Run remaining phases on the best-effort output; the artifact is
    /// still recorded as failed.
    #[serde(rename = "continue")]
    ContinueBestEffort,
}

/// Overall pipeline status for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    /// Every phase reached `Passed`.
    Passed,
    /// At least one phase exhausted its retries.
    Failed,
}

/// Result of running the full pipeline for one artifact.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub status: PipelineStatus,
    /// Every attempt made, across all phases, in execution order.
    pub attempts: Vec<PhaseAttempt>,
    /// Output of the last phase that ran.
    pub output: Value,
    /// First phase that exhausted its retries, if any.
    pub failed_phase: Option<String>,
}

/// One named phase: gate configuration plus its transform and refiner.
pub struct PipelinePhase {
    pub gate: PhaseGateConfig,
    pub transform: Box<dyn Transform>,
    pub refiner: Box<dyn Refiner>,
}

impl PipelinePhase {
    pub fn new(
        gate: PhaseGateConfig,
        transform: Box<dyn Transform>,
        refiner: Box<dyn Refiner>,
    ) -> Self {
        Self {
            gate,
            transform,
            refiner,
        }
    }
}

/// Executes an ordered list of quality-gated phases for one artifact.
pub struct PhasePipeline {
    phases: Vec<PipelinePhase>,
    gate: QualityGate,
    policy: FailurePolicy,
}

impl PhasePipeline {
    pub fn new(phases: Vec<PipelinePhase>, gate: QualityGate, policy: FailurePolicy) -> Self {
        Self {
            phases,
            gate,
            policy,
        }
    }

    pub fn phase_names(&self) -> Vec<&str> {
        self.phases.iter().map(|p| p.gate.name.as_str()).collect()
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run every phase in order, feeding each phase's output forward.
    ///
    /// A transform or refine error aborts the artifact and propagates to
    /// the caller, which records the artifact as failed.
    pub fn run(&self, input: Value, ctx: &PhaseContext<'_>) -> Result<PipelineOutcome, PhaseError> {
        let mut attempts = Vec::new();
        let mut current = input;
        let mut status = PipelineStatus::Passed;
        let mut failed_phase = None;

        for phase in &self.phases {
            tracing::info!(phase = %phase.gate.name, artifact = %ctx.artifact_path.display(), "phase started");
            let outcome = RefinementLoop::new(&self.gate, &phase.gate).run(
                phase.transform.as_ref(),
                phase.refiner.as_ref(),
                &current,
                ctx,
                &mut attempts,
            )?;
            current = outcome.output;

            if outcome.status == PhaseStatus::ExhaustedRetries {
                status = PipelineStatus::Failed;
                if failed_phase.is_none() {
                    failed_phase = Some(phase.gate.name.clone());
                }
                if self.policy == FailurePolicy::Halt {
                    tracing::warn!(
                        phase = %phase.gate.name,
                        artifact = %ctx.artifact_path.display(),
                        "halting artifact after exhausted retries"
                    );
                    break;
                }
            }
        }

        Ok(PipelineOutcome {
            status,
            attempts,
            output: current,
            failed_phase,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{CriterionOutcome, ValidationResult};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn passthrough_refiner() -> Box<dyn Refiner> {
        Box::new(
            |candidate: &Value, _: &ValidationResult, _: u32| -> Result<Value, PhaseError> {
                Ok(candidate.clone())
            },
        )
    }

    /// Transform that tags its phase name onto the value and counts calls.
    fn tagging_transform(name: &'static str, calls: Arc<AtomicU32>) -> Box<dyn Transform> {
        Box::new(
            move |input: &Value, _: &PhaseContext<'_>| -> Result<Value, PhaseError> {
                calls.fetch_add(1, Ordering::SeqCst);
                let mut chain: Vec<String> = input
                    .get("chain")
                    .and_then(Value::as_array)
                    .map(|a| {
                        a.iter()
                            .filter_map(|v| v.as_str().map(String::from))
                            .collect()
                    })
                    .unwrap_or_default();
                chain.push(name.to_string());
                Ok(json!({"chain": chain}))
            },
        )
    }

    /// Gate failing only the phase named in `failing`.
    fn gate_failing_phase(failing: &'static str) -> QualityGate {
        QualityGate::new(Box::new(move |phase: &str, _: &str, _: &Value| {
            if phase == failing {
                CriterionOutcome::with_issue(0.0, "quality: below threshold")
            } else {
                CriterionOutcome::score(100.0)
            }
        }))
    }

    fn phase(name: &str, retry_limit: u32, calls: Arc<AtomicU32>) -> PipelinePhase {
        let mut gate = PhaseGateConfig::new(name, vec![("quality".to_string(), 1.0)]);
        gate.retry_limit = retry_limit;
        let name: &'static str = Box::leak(name.to_string().into_boxed_str());
        PipelinePhase::new(gate, tagging_transform(name, calls), passthrough_refiner())
    }

    fn run_pipeline(
        pipeline: &PhasePipeline,
    ) -> PipelineOutcome {
        let artifact = std::path::PathBuf::from("/src/a.js");
        let target = std::path::PathBuf::from("/target");
        let ctx = PhaseContext {
            artifact_path: &artifact,
            source_content: "",
            category: "common",
            dependencies: &[],
            target_root: &target,
        };
        pipeline.run(json!({}), &ctx).unwrap()
    }

    #[test]
    fn test_all_phases_pass_and_chain_output() {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = PhasePipeline::new(
            vec![
                phase("analysis", 3, calls.clone()),
                phase("conversion", 3, calls.clone()),
                phase("storage", 3, calls.clone()),
            ],
            gate_failing_phase("none"),
            FailurePolicy::Halt,
        );

        let outcome = run_pipeline(&pipeline);

        assert_eq!(outcome.status, PipelineStatus::Passed);
        assert!(outcome.failed_phase.is_none());
        assert_eq!(outcome.attempts.len(), 3);
        // Each phase saw the previous phase's output.
        assert_eq!(
            outcome.output["chain"],
            json!(["analysis", "conversion", "storage"])
        );
    }

    #[test]
    fn test_halt_policy_stops_remaining_phases() {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = PhasePipeline::new(
            vec![
                phase("analysis", 2, calls.clone()),
                phase("conversion", 3, calls.clone()),
            ],
            gate_failing_phase("analysis"),
            FailurePolicy::Halt,
        );

        let outcome = run_pipeline(&pipeline);

        assert_eq!(outcome.status, PipelineStatus::Failed);
        assert_eq!(outcome.failed_phase.as_deref(), Some("analysis"));
        // Two analysis attempts, conversion never invoked.
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_continue_policy_runs_remaining_phases() {
        let calls = Arc::new(AtomicU32::new(0));
        let pipeline = PhasePipeline::new(
            vec![
                phase("analysis", 2, calls.clone()),
                phase("conversion", 3, calls.clone()),
            ],
            gate_failing_phase("analysis"),
            FailurePolicy::ContinueBestEffort,
        );

        let outcome = run_pipeline(&pipeline);

        // Still failed overall, but conversion ran on the best effort.
        assert_eq!(outcome.status, PipelineStatus::Failed);
        assert_eq!(outcome.failed_phase.as_deref(), Some("analysis"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.output["chain"], json!(["analysis", "conversion"]));
        assert_eq!(outcome.attempts.len(), 3);
    }

    #[test]
    fn test_failure_policy_toml_names() {
        assert_eq!(
            serde_json::to_value(FailurePolicy::Halt).unwrap(),
            json!("halt")
        );
        assert_eq!(
            serde_json::to_value(FailurePolicy::ContinueBestEffort).unwrap(),
            json!("continue")
        );
    }
}
