//! Weighted quality gate.
//!
//! A gate evaluates a fixed ordered set of named criteria for one phase
//! output, each producing a 0-100 sub-score through a pluggable
//! evaluator, and aggregates them into a weighted success factor. The
//! aggregation and threshold logic is pure: the same output and weights
//! always produce the same score.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tolerance when checking that phase weights sum to 1.0.
pub const WEIGHT_EPSILON: f64 = 1e-6;

/// Sub-score and feedback for a single criterion.
#[derive(Debug, Clone, Default)]
pub struct CriterionOutcome {
    /// 0-100; values outside the range are clamped by the gate.
    pub score: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

impl CriterionOutcome {
    pub fn score(score: f64) -> Self {
        Self {
            score,
            ..Default::default()
        }
    }

    pub fn with_issue(score: f64, issue: impl Into<String>) -> Self {
        Self {
            score,
            issues: vec![issue.into()],
            ..Default::default()
        }
    }
}

/// Pluggable per-criterion scoring. The gate owns aggregation; the
/// evaluator owns judgement.
pub trait CriterionEvaluator {
    fn evaluate(&self, phase: &str, criterion: &str, output: &Value) -> CriterionOutcome;
}

impl<F> CriterionEvaluator for F
where
    F: Fn(&str, &str, &Value) -> CriterionOutcome,
{
    fn evaluate(&self, phase: &str, criterion: &str, output: &Value) -> CriterionOutcome {
        self(phase, criterion, output)
    }
}

/// One criterion's contribution to a validation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub criterion: String,
    pub weight: f64,
    pub score: f64,
}

/// Scored outcome of one phase attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub phase: String,
    pub scores: Vec<CriterionScore>,
    /// Weighted aggregate, 0-100.
    pub success_factor: f64,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Gate configuration for one phase: ordered criterion weights, pass
/// threshold, and retry limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseGateConfig {
    pub name: String,
    /// (criterion, weight) in evaluation order; weights must sum to 1.0.
    pub criteria: Vec<(String, f64)>,
    pub threshold: f64,
    pub retry_limit: u32,
}

impl PhaseGateConfig {
    pub fn new(name: impl Into<String>, criteria: Vec<(String, f64)>) -> Self {
        Self {
            name: name.into(),
            criteria,
            threshold: crate::settings::DEFAULT_THRESHOLD,
            retry_limit: crate::settings::DEFAULT_RETRY_LIMIT,
        }
    }

    /// Startup validation: a run never begins with an invalid gate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (criterion, weight) in &self.criteria {
            if *weight < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    phase: self.name.clone(),
                    criterion: criterion.clone(),
                    weight: *weight,
                });
            }
        }

        let sum: f64 = self.criteria.iter().map(|(_, w)| w).sum();
        if (sum - 1.0).abs() > WEIGHT_EPSILON {
            return Err(ConfigError::WeightSum {
                phase: self.name.clone(),
                sum,
            });
        }

        if !(0.0..=100.0).contains(&self.threshold) {
            return Err(ConfigError::ThresholdOutOfRange {
                phase: self.name.clone(),
                value: self.threshold,
            });
        }

        if self.retry_limit == 0 {
            return Err(ConfigError::ZeroRetryLimit(self.name.clone()));
        }

        Ok(())
    }
}

/// Scores phase outputs against configured criteria.
pub struct QualityGate {
    evaluator: Box<dyn CriterionEvaluator>,
}

impl QualityGate {
    pub fn new(evaluator: Box<dyn CriterionEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Evaluate every criterion in order and aggregate the weighted
    /// success factor.
    pub fn score(&self, gate: &PhaseGateConfig, output: &Value) -> ValidationResult {
        let mut scores = Vec::with_capacity(gate.criteria.len());
        let mut issues = Vec::new();
        let mut recommendations = Vec::new();
        let mut success_factor = 0.0;

        for (criterion, weight) in &gate.criteria {
            let outcome = self.evaluator.evaluate(&gate.name, criterion, output);
            let sub_score = outcome.score.clamp(0.0, 100.0);
            success_factor += weight * sub_score;
            scores.push(CriterionScore {
                criterion: criterion.clone(),
                weight: *weight,
                score: sub_score,
            });
            issues.extend(outcome.issues);
            recommendations.extend(outcome.recommendations);
        }

        ValidationResult {
            phase: gate.name.clone(),
            scores,
            success_factor,
            issues,
            recommendations,
        }
    }

    /// Threshold comparison is inclusive: a score exactly at the
    /// threshold passes.
    pub fn passed(result: &ValidationResult, threshold: f64) -> bool {
        result.success_factor >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixed_scores(a: f64, b: f64) -> QualityGate {
        QualityGate::new(Box::new(move |_: &str, criterion: &str, _: &Value| {
            if criterion == "a" {
                CriterionOutcome::score(a)
            } else {
                CriterionOutcome::score(b)
            }
        }))
    }

    fn two_criteria() -> PhaseGateConfig {
        PhaseGateConfig::new(
            "analysis",
            vec![("a".to_string(), 0.5), ("b".to_string(), 0.5)],
        )
    }

    #[test]
    fn test_weighted_aggregate_at_threshold_boundary() {
        let gate = fixed_scores(80.0, 90.0);
        let result = gate.score(&two_criteria(), &json!({}));

        assert!((result.success_factor - 85.0).abs() < 1e-9);
        // Inclusive boundary: exactly 85 passes a threshold of 85.
        assert!(QualityGate::passed(&result, 85.0));
        assert!(!QualityGate::passed(&result, 85.1));
    }

    #[test]
    fn test_scores_preserve_criterion_order() {
        let gate = fixed_scores(10.0, 20.0);
        let result = gate.score(&two_criteria(), &json!({}));

        assert_eq!(result.scores.len(), 2);
        assert_eq!(result.scores[0].criterion, "a");
        assert_eq!(result.scores[1].criterion, "b");
    }

    #[test]
    fn test_sub_scores_are_clamped() {
        let gate = fixed_scores(150.0, -20.0);
        let result = gate.score(&two_criteria(), &json!({}));

        assert_eq!(result.scores[0].score, 100.0);
        assert_eq!(result.scores[1].score, 0.0);
        assert!((result.success_factor - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let gate = fixed_scores(70.0, 90.0);
        let config = two_criteria();
        let output = json!({"component": "UserGrid"});

        assert_eq!(gate.score(&config, &output), gate.score(&config, &output));
    }

    #[test]
    fn test_issues_collected_across_criteria() {
        let gate = QualityGate::new(Box::new(|_: &str, criterion: &str, _: &Value| {
            CriterionOutcome::with_issue(40.0, format!("{}: incomplete", criterion))
        }));
        let result = gate.score(&two_criteria(), &json!({}));

        assert_eq!(result.issues.len(), 2);
        assert!(result.issues[0].contains("a"));
    }

    #[test]
    fn test_validate_rejects_bad_weight_sum() {
        let config = PhaseGateConfig::new(
            "analysis",
            vec![("a".to_string(), 0.5), ("b".to_string(), 0.4)],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn test_validate_accepts_sum_within_epsilon() {
        let config = PhaseGateConfig::new(
            "storage",
            vec![
                ("x".to_string(), 0.33),
                ("y".to_string(), 0.33),
                ("z".to_string(), 0.34),
            ],
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_weight() {
        let config = PhaseGateConfig::new(
            "analysis",
            vec![("a".to_string(), 1.5), ("b".to_string(), -0.5)],
        );
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeWeight { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_retry_limit() {
        let mut config = two_criteria();
        config.retry_limit = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroRetryLimit(_))
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_threshold() {
        let mut config = two_criteria();
        config.threshold = 120.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOutOfRange { .. })
        ));
    }
}
