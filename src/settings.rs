//! Migration settings.
//!
//! All tunables (phase weights, thresholds, retry limits, resolver depth,
//! failure policy) live in one immutable `MigrationConfig` threaded into
//! the orchestrator, gate, and refinement loop constructors. Nothing
//! reads ambient global state. Settings load from an optional
//! `crucible.toml` and are validated fail-fast, before any artifact is
//! processed.

use crate::errors::ConfigError;
use crate::gate::PhaseGateConfig;
use crate::pipeline::FailurePolicy;
use crate::resolver::DEFAULT_MAX_DEPTH;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Default pass threshold for every phase.
pub const DEFAULT_THRESHOLD: f64 = 85.0;
/// Default attempt limit per phase.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Conventional phase order.
pub const PHASE_ANALYSIS: &str = "analysis";
pub const PHASE_CONVERSION: &str = "conversion";
pub const PHASE_STORAGE: &str = "storage";

/// Canonical criterion order per phase. Weights in config files are
/// reordered to this sequence so scoring order never depends on TOML key
/// order.
pub fn known_criteria(phase: &str) -> Option<&'static [&'static str]> {
    match phase {
        PHASE_ANALYSIS => Some(&[
            "model_extraction",
            "store_extraction",
            "columns_extraction",
            "logic_capture",
        ]),
        PHASE_CONVERSION => Some(&[
            "proper_typing",
            "error_handling",
            "component_structure",
            "service_design",
            "framework_standards",
        ]),
        PHASE_STORAGE => Some(&[
            "directory_structure",
            "file_integrity",
            "naming_conventions",
        ]),
        _ => None,
    }
}

fn default_phase(name: &str, weights: &[(&str, f64)]) -> PhaseGateConfig {
    PhaseGateConfig {
        name: name.to_string(),
        criteria: weights
            .iter()
            .map(|(c, w)| (c.to_string(), *w))
            .collect(),
        threshold: DEFAULT_THRESHOLD,
        retry_limit: DEFAULT_RETRY_LIMIT,
    }
}

/// Immutable run configuration.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Maximum dependency traversal depth.
    pub max_depth: usize,
    /// What happens to remaining phases after retries are exhausted.
    pub failure_policy: FailurePolicy,
    /// Gate configuration per phase, in pipeline order.
    pub phases: Vec<PhaseGateConfig>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            failure_policy: FailurePolicy::default(),
            phases: vec![
                default_phase(
                    PHASE_ANALYSIS,
                    &[
                        ("model_extraction", 0.25),
                        ("store_extraction", 0.25),
                        ("columns_extraction", 0.25),
                        ("logic_capture", 0.25),
                    ],
                ),
                default_phase(
                    PHASE_CONVERSION,
                    &[
                        ("proper_typing", 0.2),
                        ("error_handling", 0.2),
                        ("component_structure", 0.2),
                        ("service_design", 0.2),
                        ("framework_standards", 0.2),
                    ],
                ),
                default_phase(
                    PHASE_STORAGE,
                    &[
                        ("directory_structure", 0.33),
                        ("file_integrity", 0.33),
                        ("naming_conventions", 0.34),
                    ],
                ),
            ],
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    resolver: RawResolver,
    #[serde(default)]
    gate: RawGate,
    #[serde(default)]
    pipeline: RawPipeline,
    #[serde(default, rename = "phase")]
    phases: Vec<RawPhase>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawResolver {
    max_depth: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawGate {
    threshold: Option<f64>,
    retry_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPipeline {
    on_exhausted: Option<FailurePolicy>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawPhase {
    name: String,
    threshold: Option<f64>,
    retry_limit: Option<u32>,
    #[serde(default)]
    weights: BTreeMap<String, f64>,
}

impl MigrationConfig {
    /// Load settings from `path` when it exists, otherwise defaults.
    /// Always validated before returning.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) if path.exists() => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.to_path_buf(),
                        source,
                    })?;
                Self::from_toml_str(&content, path)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse settings from TOML, applying overrides on top of defaults.
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let raw: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut config = Self::default();

        if let Some(max_depth) = raw.resolver.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(policy) = raw.pipeline.on_exhausted {
            config.failure_policy = policy;
        }
        for phase in &mut config.phases {
            if let Some(threshold) = raw.gate.threshold {
                phase.threshold = threshold;
            }
            if let Some(retry_limit) = raw.gate.retry_limit {
                phase.retry_limit = retry_limit;
            }
        }

        for raw_phase in raw.phases {
            let criteria = known_criteria(&raw_phase.name)
                .ok_or_else(|| ConfigError::UnknownPhase(raw_phase.name.clone()))?;

            for criterion in raw_phase.weights.keys() {
                if !criteria.contains(&criterion.as_str()) {
                    return Err(ConfigError::UnknownCriterion {
                        phase: raw_phase.name.clone(),
                        criterion: criterion.clone(),
                    });
                }
            }

            let phase = config
                .phases
                .iter_mut()
                .find(|p| p.name == raw_phase.name)
                .expect("known phases are present in the default config");

            if let Some(threshold) = raw_phase.threshold {
                phase.threshold = threshold;
            }
            if let Some(retry_limit) = raw_phase.retry_limit {
                phase.retry_limit = retry_limit;
            }
            if !raw_phase.weights.is_empty() {
                phase.criteria = criteria
                    .iter()
                    .filter_map(|c| raw_phase.weights.get(*c).map(|w| (c.to_string(), *w)))
                    .collect();
            }
        }

        Ok(config)
    }

    /// Fail-fast validation of every phase gate and resolver setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::ZeroMaxDepth);
        }
        for phase in &self.phases {
            phase.validate()?;
        }
        Ok(())
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseGateConfig> {
        self.phases.iter().find(|p| p.name == name)
    }
}
