use crate::artifact::Artifact;
use crate::classify::{ArtifactClassifier, KeywordClassifier};
use crate::config::Config;
use crate::orchestrator::{ArtifactReport, ExecutionReport};
use crate::phases;
use crate::pipeline::{PhasePipeline, PipelineStatus};
use crate::project;
use crate::refine::PhaseContext;
use crate::resolver::{DependencyResolver, ResolverConfig};
use crate::tracker::ProcessingTracker;
use crate::ui::MigrationUi;
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Drives the migration: owns the tracker and resolver, drains the
/// processing queue, runs the phase pipeline per artifact, and persists
/// tracker state after every artifact so an interrupted run resumes
/// exactly where it stopped.
pub struct Orchestrator {
    config: Config,
    resolver: DependencyResolver,
    tracker: ProcessingTracker,
    pipeline: PhasePipeline,
    classifier: Box<dyn ArtifactClassifier>,
    cancel: Arc<AtomicBool>,
    ui: Option<MigrationUi>,
}

impl Orchestrator {
    /// Build an orchestrator with the default three-phase pipeline.
    ///
    /// Settings are validated here, before any artifact is touched.
    pub fn new(config: Config) -> Result<Self> {
        let pipeline =
            phases::default_pipeline(&config.settings).context("Invalid phase configuration")?;
        Self::with_pipeline(config, pipeline)
    }

    /// Build an orchestrator around a caller-supplied pipeline.
    pub fn with_pipeline(config: Config, pipeline: PhasePipeline) -> Result<Self> {
        config.ensure_directories()?;

        let resolver = DependencyResolver::new(
            ResolverConfig::new(&config.base_dir).with_max_depth(config.settings.max_depth),
        );
        let tracker = ProcessingTracker::with_file(&config.tracker_file)
            .context("Failed to open processing tracker")?;

        Ok(Self {
            config,
            resolver,
            tracker,
            pipeline,
            classifier: Box::new(KeywordClassifier::new()),
            cancel: Arc::new(AtomicBool::new(false)),
            ui: None,
        })
    }

    pub fn set_classifier(&mut self, classifier: Box<dyn ArtifactClassifier>) {
        self.classifier = classifier;
    }

    pub fn attach_ui(&mut self, ui: MigrationUi) {
        self.ui = Some(ui);
    }

    /// Shared flag checked before each dequeue; setting it stops the run
    /// at the next artifact boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    pub fn tracker(&self) -> &ProcessingTracker {
        &self.tracker
    }

    /// Run the migration: batch when the configured source is a
    /// directory, single-root otherwise.
    pub fn run(&mut self) -> Result<ExecutionReport> {
        if self.config.is_batch() {
            let roots = project::scan_sources(&self.config.source)?;
            tracing::info!(count = roots.len(), source = %self.config.source.display(), "batch migration started");
            self.run_batch(&roots)
        } else {
            let root = self.config.source.clone();
            self.run_single(&root)
        }
    }

    /// Migrate one root artifact and everything it depends on.
    pub fn run_single(&mut self, root: &Path) -> Result<ExecutionReport> {
        self.seed(std::slice::from_ref(&root.to_path_buf()));
        self.drain()
    }

    /// Migrate a set of roots discovered by directory enumeration.
    pub fn run_batch(&mut self, roots: &[PathBuf]) -> Result<ExecutionReport> {
        self.seed(roots);
        self.drain()
    }

    /// Resolve each root's dependency closure and enqueue dependencies
    /// ahead of the root itself. Terminal ids are never re-enqueued.
    fn seed(&mut self, roots: &[PathBuf]) {
        for root in roots {
            let dependencies = self.resolver.all_dependencies_flat(root);
            self.tracker
                .enqueue(dependencies.iter().map(|p| p.display().to_string()));
            self.tracker.enqueue([root.display().to_string()]);
        }
        if let Some(ui) = &self.ui {
            ui.set_total(self.tracker.queue_len() as u64);
        }
    }

    /// Drain the queue sequentially. Tracker state is persisted after
    /// every artifact; a persistence failure aborts the run.
    fn drain(&mut self) -> Result<ExecutionReport> {
        let mut report = ExecutionReport::new();

        loop {
            if self.cancel.load(Ordering::SeqCst) {
                tracing::warn!("cancellation requested; stopping before next artifact");
                break;
            }
            let Some(id) = self.tracker.dequeue() else {
                break;
            };
            if self.tracker.is_terminal(&id) {
                tracing::debug!(artifact = %id, "skipping artifact with terminal record");
                continue;
            }

            if let Some(ui) = &self.ui {
                ui.artifact_started(&id);
            }
            let passed = self.process(&id, &mut report);
            if let Some(ui) = &self.ui {
                ui.artifact_finished(&id, passed);
            }

            self.tracker
                .persist()
                .context("Tracker persistence failed; aborting run to protect resumability")?;
        }

        // Final persist covers runs that stop before processing anything
        // (cancellation right after seeding still saves the queue).
        self.tracker
            .persist()
            .context("Tracker persistence failed; aborting run to protect resumability")?;

        if let Some(ui) = &self.ui {
            ui.finish();
        }
        report.finish(self.tracker.statistics());
        Ok(report)
    }

    /// Run the pipeline for one artifact and record the outcome. Returns
    /// whether the artifact passed; every failure path leaves a Failed
    /// record and lets the batch continue.
    fn process(&mut self, id: &str, report: &mut ExecutionReport) -> bool {
        let artifact = Artifact::new(id);

        let content = match artifact.read_content() {
            Ok(content) => content,
            Err(err) => {
                let reason = format!("Failed to read artifact: {err}");
                tracing::error!(artifact = %id, %err, "artifact unreadable");
                self.tracker.record_failed(id, &reason);
                report.record_artifact(ArtifactReport {
                    id: id.to_string(),
                    passed: false,
                    failure_reason: Some(reason),
                    attempts: Vec::new(),
                });
                return false;
            }
        };

        let graph = self.resolver.build_graph(artifact.path());
        let dependencies: Vec<String> = graph
            .flat_dependencies()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        for (source, target) in &graph.cycles {
            tracing::warn!(
                source = %source.display(),
                target = %target.display(),
                "circular dependency recorded"
            );
        }

        let category = self.classifier.categorize(&artifact.stem(), &content);
        let ctx = PhaseContext {
            artifact_path: artifact.path(),
            source_content: &content,
            category: &category,
            dependencies: &dependencies,
            target_root: &self.config.target_root,
        };

        match self.pipeline.run(Value::Null, &ctx) {
            Ok(outcome) => {
                let attempts_used = outcome
                    .attempts
                    .iter()
                    .map(|a| a.attempt)
                    .max()
                    .unwrap_or(1);
                let passed = outcome.status == PipelineStatus::Passed;

                if passed {
                    self.tracker.record_processed(
                        id,
                        json!({
                            "category": category,
                            "output": outcome.output,
                        }),
                        dependencies,
                        attempts_used,
                    );
                } else {
                    let phase = outcome.failed_phase.as_deref().unwrap_or("unknown");
                    self.tracker.record_failed(
                        id,
                        format!("Phase '{phase}' below threshold after {attempts_used} attempts"),
                    );
                }

                report.record_artifact(ArtifactReport {
                    id: id.to_string(),
                    passed,
                    failure_reason: outcome
                        .failed_phase
                        .map(|phase| format!("Phase '{phase}' exhausted retries")),
                    attempts: outcome.attempts,
                });
                passed
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!(artifact = %id, %reason, "pipeline error");
                self.tracker.record_failed(id, &reason);
                report.record_artifact(ArtifactReport {
                    id: id.to_string(),
                    passed: false,
                    failure_reason: Some(reason),
                    attempts: Vec::new(),
                });
                false
            }
        }
    }

    /// Finish a run: write the execution report next to the tracker.
    pub fn save_report(&self, report: &ExecutionReport) -> Result<PathBuf> {
        report.save(&self.config.report_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{CriterionOutcome, PhaseGateConfig, QualityGate, ValidationResult};
    use crate::pipeline::{FailurePolicy, PipelinePhase};
    use crate::refine::Refiner;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    fn write(dir: &TempDir, rel: &str, content: &str) -> PathBuf {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, content).unwrap();
        path
    }

    fn config_for(dir: &TempDir, source: &Path) -> Config {
        Config::new(
            source.to_path_buf(),
            dir.path().join("out"),
            None,
            false,
        )
        .unwrap()
    }

    fn always_failing_pipeline() -> PhasePipeline {
        let gate = QualityGate::new(Box::new(|_: &str, _: &str, _: &Value| {
            CriterionOutcome::with_issue(0.0, "quality: nope")
        }));
        let mut phase_gate = PhaseGateConfig::new("analysis", vec![("quality".to_string(), 1.0)]);
        phase_gate.retry_limit = 2;
        let transform = |_: &Value, _: &PhaseContext<'_>| -> Result<Value, crate::errors::PhaseError> {
            Ok(json!({}))
        };
        let refiner = |c: &Value, _: &ValidationResult, _: u32| -> Result<Value, crate::errors::PhaseError> {
            Ok(c.clone())
        };
        let refiner: Box<dyn Refiner> = Box::new(refiner);
        PhasePipeline::new(
            vec![PipelinePhase::new(phase_gate, Box::new(transform), refiner)],
            gate,
            FailurePolicy::Halt,
        )
    }

    #[test]
    fn test_run_single_processes_root_and_dependencies() {
        let dir = tempdir().unwrap();
        let root = write(&dir, "src/UserGrid.js", "import s from './UserStore';");
        write(&dir, "src/UserStore.js", "");

        let config = config_for(&dir, &root);
        let mut orchestrator = Orchestrator::new(config).unwrap();
        let report = orchestrator.run().unwrap();

        assert_eq!(report.artifacts.len(), 2);
        assert_eq!(report.passed_count(), 2);
        // Dependency was processed before the root.
        assert!(report.artifacts[0].id.ends_with("UserStore.js"));
        assert!(report.artifacts[1].id.ends_with("UserGrid.js"));

        let stats = orchestrator.tracker().statistics();
        assert_eq!(stats.total_processed, 2);
        assert_eq!(stats.remaining_in_queue, 0);

        // Output landed in the target layout.
        assert!(dir.path().join("out/features").is_dir());
    }

    #[test]
    fn test_unreadable_artifact_fails_and_batch_continues() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write(&dir, "src/Good.js", "");
        let gone = write(&dir, "src/Gone.js", "");

        // First run only seeds the queue (cancelled immediately), so the
        // queue including Gone.js is persisted.
        {
            let config = config_for(&dir, &src);
            let mut orchestrator = Orchestrator::new(config).unwrap();
            orchestrator.cancel_handle().store(true, Ordering::SeqCst);
            orchestrator.run().unwrap();
        }

        // The file disappears between runs; the resumed drain must fail
        // it and keep going.
        fs::remove_file(&gone).unwrap();
        let config = config_for(&dir, &src);
        let mut orchestrator = Orchestrator::new(config).unwrap();
        let report = orchestrator.run().unwrap();

        let failed: Vec<_> = report.artifacts.iter().filter(|a| !a.passed).collect();
        assert_eq!(failed.len(), 1);
        assert!(failed[0].id.ends_with("Gone.js"));
        assert!(
            failed[0]
                .failure_reason
                .as_deref()
                .unwrap()
                .contains("Failed to read artifact")
        );
        assert_eq!(report.passed_count(), 1);
    }

    #[test]
    fn test_resume_skips_completed_artifacts() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write(&dir, "src/A.js", "");
        write(&dir, "src/B.js", "");

        {
            let config = config_for(&dir, &src);
            let mut orchestrator = Orchestrator::new(config).unwrap();
            let report = orchestrator.run().unwrap();
            assert_eq!(report.artifacts.len(), 2);
        }

        // Second run restores the tracker and finds nothing to do.
        let config = config_for(&dir, &src);
        let mut orchestrator = Orchestrator::new(config).unwrap();
        let report = orchestrator.run().unwrap();
        assert!(report.artifacts.is_empty());
        assert_eq!(orchestrator.tracker().statistics().total_processed, 2);
    }

    #[test]
    fn test_failed_pipeline_records_failure() {
        let dir = tempdir().unwrap();
        let root = write(&dir, "src/Widget.js", "");

        let config = config_for(&dir, &root);
        let mut orchestrator =
            Orchestrator::with_pipeline(config, always_failing_pipeline()).unwrap();
        let report = orchestrator.run().unwrap();

        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.artifacts[0].attempts.len(), 2);
        assert!(
            report.artifacts[0]
                .failure_reason
                .as_deref()
                .unwrap()
                .contains("analysis")
        );
        assert!(orchestrator.tracker().statistics().total_failed == 1);
    }

    #[test]
    fn test_cancellation_stops_before_next_artifact() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("src");
        write(&dir, "src/A.js", "");
        write(&dir, "src/B.js", "");

        let config = config_for(&dir, &src);
        let mut orchestrator = Orchestrator::new(config).unwrap();
        orchestrator.cancel_handle().store(true, Ordering::SeqCst);
        let report = orchestrator.run().unwrap();

        assert!(report.artifacts.is_empty());
        // Queue state survives for the next run.
        assert_eq!(orchestrator.tracker().statistics().remaining_in_queue, 2);
    }

    #[test]
    fn test_outcome_independent_of_queue_order() {
        // Two artifacts with no dependencies: each one's outcome must not
        // depend on where unrelated roots sit in the queue.
        let run_in_order = |roots: Vec<&str>| {
            let dir = tempdir().unwrap();
            let a = write(&dir, "src/Alpha.js", "var a = 1;");
            let b = write(&dir, "src/Beta.js", "var b = 2;");
            let by_name = |name: &str| if name == "a" { a.clone() } else { b.clone() };

            let src = dir.path().join("src");
            let config = config_for(&dir, &src);
            let mut orchestrator = Orchestrator::new(config).unwrap();
            let roots: Vec<PathBuf> = roots.into_iter().map(by_name).collect();
            let report = orchestrator.run_batch(&roots).unwrap();

            report
                .artifacts
                .iter()
                .map(|artifact| {
                    let name = Path::new(&artifact.id)
                        .file_name()
                        .unwrap()
                        .to_string_lossy()
                        .into_owned();
                    (name, artifact.passed)
                })
                .collect::<std::collections::BTreeMap<_, _>>()
        };

        let forward = run_in_order(vec!["a", "b"]);
        let reversed = run_in_order(vec!["b", "a"]);
        assert_eq!(forward, reversed);
        assert!(forward.values().all(|passed| *passed));
    }

    #[test]
    fn test_report_saved_under_state_dir() {
        let dir = tempdir().unwrap();
        let root = write(&dir, "src/Widget.js", "");

        let config = config_for(&dir, &root);
        let mut orchestrator = Orchestrator::new(config).unwrap();
        let report = orchestrator.run().unwrap();
        let path = orchestrator.save_report(&report).unwrap();

        assert!(path.exists());
        assert!(path.starts_with(dir.path().join("out/.crucible/reports")));
    }
}
