//! Built-in phase implementations.
//!
//! The orchestration core only sees the `Transform`, `Refiner`, and
//! `CriterionEvaluator` traits; these are the default collaborators that
//! make the CLI work end-to-end without an external transformation
//! backend. Analysis extracts a blueprint, conversion renders a target
//! manifest, storage writes it into the target layout.

mod analysis;
mod conversion;
mod storage;

pub use analysis::AnalysisTransform;
pub use conversion::ConversionTransform;
pub use storage::StorageTransform;

use crate::errors::{ConfigError, PhaseError};
use crate::gate::{CriterionEvaluator, CriterionOutcome, QualityGate, ValidationResult};
use crate::pipeline::{PhasePipeline, PipelinePhase};
use crate::refine::{Refiner, Transform};
use crate::settings::{MigrationConfig, PHASE_ANALYSIS, PHASE_CONVERSION, PHASE_STORAGE};
use serde_json::Value;

/// kebab-case a component name: `UserGrid` -> `user-grid`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_breaks = true;
    for ch in name.chars() {
        if ch == '_' || ch == ' ' || ch == '-' {
            if !prev_breaks {
                out.push('-');
                prev_breaks = true;
            }
            continue;
        }
        if ch.is_uppercase() {
            if !prev_breaks {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
        prev_breaks = false;
    }
    out.trim_matches('-').to_string()
}

/// PascalCase a kebab-case name: `user-grid` -> `UserGrid`.
pub fn pascal_case(name: &str) -> String {
    name.split(['-', '_'])
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

fn is_kebab(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

fn has_key(output: &Value, key: &str) -> bool {
    output.get(key).is_some_and(|v| !v.is_null())
}

fn is_true(output: &Value, key: &str) -> bool {
    output.get(key).and_then(Value::as_bool) == Some(true)
}

fn file_kinds(output: &Value) -> Vec<String> {
    output
        .get("files")
        .and_then(Value::as_array)
        .map(|files| {
            files
                .iter()
                .filter_map(|f| f.get("kind").and_then(Value::as_str).map(String::from))
                .collect()
        })
        .unwrap_or_default()
}

fn pass() -> CriterionOutcome {
    CriterionOutcome::score(100.0)
}

fn fail(score: f64, criterion: &str, message: &str, fix: &str) -> CriterionOutcome {
    CriterionOutcome {
        score,
        issues: vec![format!("{criterion}: {message}")],
        recommendations: vec![fix.to_string()],
    }
}

/// Deterministic structural scoring of the built-in phase outputs.
#[derive(Debug, Clone, Default)]
pub struct HeuristicEvaluator;

impl CriterionEvaluator for HeuristicEvaluator {
    fn evaluate(&self, phase: &str, criterion: &str, output: &Value) -> CriterionOutcome {
        match (phase, criterion) {
            (PHASE_ANALYSIS, "model_extraction") if has_key(output, "models") => pass(),
            (PHASE_ANALYSIS, "model_extraction") => fail(
                30.0,
                criterion,
                "blueprint has no models section",
                "re-extract model references from the source",
            ),
            (PHASE_ANALYSIS, "store_extraction") if has_key(output, "stores") => pass(),
            (PHASE_ANALYSIS, "store_extraction") => fail(
                30.0,
                criterion,
                "blueprint has no stores section",
                "re-extract store references from the source",
            ),
            (PHASE_ANALYSIS, "columns_extraction") if has_key(output, "columns") => pass(),
            (PHASE_ANALYSIS, "columns_extraction") => fail(
                30.0,
                criterion,
                "blueprint has no columns section",
                "capture dataIndex fields from the grid definition",
            ),
            (PHASE_ANALYSIS, "logic_capture") if has_key(output, "handlers") => pass(),
            (PHASE_ANALYSIS, "logic_capture") => fail(
                30.0,
                criterion,
                "blueprint captures no handler functions",
                "capture the component's function members",
            ),

            (PHASE_CONVERSION, "proper_typing") if is_true(output, "strict_typing") => pass(),
            (PHASE_CONVERSION, "proper_typing") => fail(
                40.0,
                criterion,
                "manifest is not strictly typed",
                "enable strict typing in the generated code",
            ),
            (PHASE_CONVERSION, "error_handling") if is_true(output, "error_handling") => pass(),
            (PHASE_CONVERSION, "error_handling") => fail(
                40.0,
                criterion,
                "manifest declares no error handling",
                "wrap service calls with error handling",
            ),
            (PHASE_CONVERSION, "component_structure") => {
                let kinds = file_kinds(output);
                if ["component", "template", "styles"]
                    .iter()
                    .all(|k| kinds.iter().any(|have| have == k))
                {
                    pass()
                } else {
                    fail(
                        50.0,
                        criterion,
                        "component file set is incomplete",
                        "emit component, template, and styles files",
                    )
                }
            }
            (PHASE_CONVERSION, "service_design") => {
                if file_kinds(output).iter().any(|k| k == "service") {
                    pass()
                } else {
                    fail(
                        40.0,
                        criterion,
                        "no service file in the manifest",
                        "emit a dedicated data service",
                    )
                }
            }
            (PHASE_CONVERSION, "framework_standards") => {
                let feature = output
                    .get("feature_name")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if is_kebab(feature) {
                    pass()
                } else {
                    fail(
                        60.0,
                        criterion,
                        "feature name is not kebab-case",
                        "use kebab-case file and selector names",
                    )
                }
            }

            (PHASE_STORAGE, "directory_structure") => {
                let structure = output
                    .get("structure")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                if structure.starts_with("features/") {
                    pass()
                } else {
                    fail(
                        40.0,
                        criterion,
                        "output landed outside the features tree",
                        "deploy under features/<category>/<component>",
                    )
                }
            }
            (PHASE_STORAGE, "file_integrity") => {
                let count = output
                    .get("file_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                if count > 0 && is_true(output, "verified") {
                    pass()
                } else {
                    fail(
                        40.0,
                        criterion,
                        "written files failed verification",
                        "re-deploy the missing files",
                    )
                }
            }
            (PHASE_STORAGE, "naming_conventions") => {
                let all_kebab = output
                    .get("written")
                    .and_then(Value::as_array)
                    .map(|written| {
                        written
                            .iter()
                            .filter_map(Value::as_str)
                            .filter_map(|p| std::path::Path::new(p).file_stem())
                            .all(|stem| {
                                let stem = stem.to_string_lossy();
                                stem.split('.').all(is_kebab)
                            })
                    })
                    .unwrap_or(false);
                if all_kebab {
                    pass()
                } else {
                    fail(
                        60.0,
                        criterion,
                        "written file names are not kebab-case",
                        "rename files to kebab-case",
                    )
                }
            }

            _ => CriterionOutcome::with_issue(0.0, format!("{criterion}: no evaluator for this criterion")),
        }
    }
}

/// Default refiner: patch the candidate along the issues the validator
/// reported, leaving everything else untouched.
#[derive(Debug, Clone, Default)]
pub struct DefaultRefiner;

impl Refiner for DefaultRefiner {
    fn refine(
        &self,
        candidate: &Value,
        validation: &ValidationResult,
        attempt: u32,
    ) -> Result<Value, PhaseError> {
        let mut next = candidate.clone();
        let Some(object) = next.as_object_mut() else {
            return Ok(next);
        };

        for issue in &validation.issues {
            let Some((criterion, _)) = issue.split_once(':') else {
                continue;
            };
            match criterion {
                "model_extraction" => {
                    object.entry("models").or_insert_with(|| Value::Array(vec![]));
                }
                "store_extraction" => {
                    object.entry("stores").or_insert_with(|| Value::Array(vec![]));
                }
                "columns_extraction" => {
                    object.entry("columns").or_insert_with(|| Value::Array(vec![]));
                }
                "logic_capture" => {
                    object.entry("handlers").or_insert_with(|| Value::Array(vec![]));
                }
                "proper_typing" => {
                    object.insert("strict_typing".to_string(), Value::Bool(true));
                }
                "error_handling" => {
                    object.insert("error_handling".to_string(), Value::Bool(true));
                }
                "framework_standards" => {
                    if let Some(feature) = object.get("feature_name").and_then(Value::as_str) {
                        let fixed = kebab_case(feature);
                        object.insert("feature_name".to_string(), Value::String(fixed));
                    }
                }
                _ => {}
            }
        }

        object.insert("refinement_attempt".to_string(), Value::from(attempt));
        Ok(next)
    }
}

fn transform_for(phase: &str) -> Result<Box<dyn Transform>, ConfigError> {
    match phase {
        PHASE_ANALYSIS => Ok(Box::new(AnalysisTransform)),
        PHASE_CONVERSION => Ok(Box::new(ConversionTransform)),
        PHASE_STORAGE => Ok(Box::new(StorageTransform)),
        other => Err(ConfigError::UnknownPhase(other.to_string())),
    }
}

/// Assemble the default three-phase pipeline from validated settings.
pub fn default_pipeline(settings: &MigrationConfig) -> Result<PhasePipeline, ConfigError> {
    settings.validate()?;

    let mut phases = Vec::with_capacity(settings.phases.len());
    for gate in &settings.phases {
        phases.push(PipelinePhase::new(
            gate.clone(),
            transform_for(&gate.name)?,
            Box::new(DefaultRefiner),
        ));
    }

    Ok(PhasePipeline::new(
        phases,
        QualityGate::new(Box::new(HeuristicEvaluator)),
        settings.failure_policy,
    ))
}
