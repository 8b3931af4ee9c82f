//! Audit configuration.
//!
//! Every knob has a default; `validate()` is run once when an engine is
//! built, so scoring itself never fails on configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::models::Dimension;
use crate::adapters::config::IngestConfig;
use crate::error::DqsError;

/// Tolerance for the dimension weights summing to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Validation errors for audit configuration.
#[derive(Debug, Error)]
pub enum ConfigValidationError {
    #[error("dimension weights must sum to 1.0, got {0}")]
    WeightSum(f64),
    #[error("weight for {dimension} must be a finite non-negative number, got {weight}")]
    InvalidWeight { dimension: Dimension, weight: f64 },
    #[error("{name} must be between 0.0 and 1.0, got {value}")]
    OutOfRange { name: &'static str, value: f64 },
    #[error("penalty weight {name} must be a finite non-negative number, got {value}")]
    InvalidPenalty { name: &'static str, value: f64 },
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("relation {child} -> {parent} references the same column")]
    SelfRelation { child: String, parent: String },
    #[error("risk rule '{pattern}' lists no dimensions")]
    EmptyRiskRule { pattern: String },
    #[error("staleness horizon must be at least one day")]
    ZeroStalenessHorizon,
}

impl From<ConfigValidationError> for DqsError {
    fn from(error: ConfigValidationError) -> Self {
        DqsError::config(error.to_string())
    }
}

/// Per-dimension weights for the composite score.
///
/// Dimensions missing from an override weigh zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimensionWeights(BTreeMap<Dimension, f64>);

impl Default for DimensionWeights {
    fn default() -> Self {
        let equal = 1.0 / Dimension::ALL.len() as f64;
        Self(Dimension::ALL.iter().map(|d| (*d, equal)).collect())
    }
}

impl DimensionWeights {
    /// Weights from explicit overrides.
    pub fn from_overrides(weights: impl IntoIterator<Item = (Dimension, f64)>) -> Self {
        Self(weights.into_iter().collect())
    }

    /// Weight of a dimension; 0 when not configured.
    pub fn weight(&self, dimension: Dimension) -> f64 {
        self.0.get(&dimension).copied().unwrap_or(0.0)
    }

    /// Validates non-negativity and the unit sum.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (dimension, weight) in &self.0 {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(ConfigValidationError::InvalidWeight {
                    dimension: *dimension,
                    weight: *weight,
                });
            }
        }
        let sum: f64 = Dimension::ALL.iter().map(|d| self.weight(*d)).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigValidationError::WeightSum(sum));
        }
        Ok(())
    }
}

/// Issue threshold and per-signal sub-thresholds.
///
/// A dimension is breached when its score is below `issue_score`; a column
/// is named in the issue when its signal exceeds the matching sub-threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IssueThresholds {
    pub issue_score: f64,
    pub null_ratio: f64,
    /// Columns below this unique ratio are named
    pub unique_ratio_min: f64,
    pub duplicate_row_ratio: f64,
    pub casing_variant_ratio: f64,
    pub negative_ratio: f64,
    pub future_ratio: f64,
    pub invalid_ratio: f64,
    pub stale_ratio: f64,
    pub orphan_ratio: f64,
    pub discrepancy_ratio: f64,
}

impl Default for IssueThresholds {
    fn default() -> Self {
        Self {
            issue_score: 0.9,
            null_ratio: 0.01,
            unique_ratio_min: 1.0,
            duplicate_row_ratio: 0.0,
            casing_variant_ratio: 0.0,
            negative_ratio: 0.0,
            future_ratio: 0.0,
            invalid_ratio: 0.0,
            stale_ratio: 0.05,
            orphan_ratio: 0.0,
            discrepancy_ratio: 0.0,
        }
    }
}

impl IssueThresholds {
    /// Builder method to set the dimension issue threshold.
    pub fn with_issue_score(mut self, threshold: f64) -> Self {
        if !(0.0..=1.0).contains(&threshold) {
            tracing::warn!(
                "issue_score {} clamped to valid range [0.0, 1.0]",
                threshold
            );
        }
        self.issue_score = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set the null ratio sub-threshold.
    pub fn with_null_ratio(mut self, threshold: f64) -> Self {
        if !(0.0..=1.0).contains(&threshold) {
            tracing::warn!("null_ratio {} clamped to valid range [0.0, 1.0]", threshold);
        }
        self.null_ratio = threshold.clamp(0.0, 1.0);
        self
    }

    /// Builder method to set the stale ratio sub-threshold.
    pub fn with_stale_ratio(mut self, threshold: f64) -> Self {
        if !(0.0..=1.0).contains(&threshold) {
            tracing::warn!(
                "stale_ratio {} clamped to valid range [0.0, 1.0]",
                threshold
            );
        }
        self.stale_ratio = threshold.clamp(0.0, 1.0);
        self
    }

    fn entries(&self) -> [(&'static str, f64); 11] {
        [
            ("issue_score", self.issue_score),
            ("null_ratio", self.null_ratio),
            ("unique_ratio_min", self.unique_ratio_min),
            ("duplicate_row_ratio", self.duplicate_row_ratio),
            ("casing_variant_ratio", self.casing_variant_ratio),
            ("negative_ratio", self.negative_ratio),
            ("future_ratio", self.future_ratio),
            ("invalid_ratio", self.invalid_ratio),
            ("stale_ratio", self.stale_ratio),
            ("orphan_ratio", self.orphan_ratio),
            ("discrepancy_ratio", self.discrepancy_ratio),
        ]
    }

    /// Validates that every threshold lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (name, value) in self.entries() {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

/// Weights turning column ratios into dimension penalties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PenaltyWeights {
    /// Completeness: null ratio
    pub null: f64,
    /// Uniqueness: repeated column values and duplicate rows
    pub duplicate: f64,
    /// Consistency: casing variant ratio
    pub casing: f64,
    /// Validity: negative numbers
    pub negative: f64,
    /// Validity: timestamps in the future
    pub validity_future: f64,
    /// Validity: values rejected during coercion
    pub invalid: f64,
    /// Timeliness: timestamps in the future
    pub timeliness_future: f64,
    /// Timeliness: timestamps older than the staleness horizon
    pub stale: f64,
    /// Integrity: orphaned references
    pub orphan: f64,
    /// Accuracy: cross-source discrepancies
    pub discrepancy: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        Self {
            null: 1.0,
            duplicate: 1.0,
            casing: 1.0,
            negative: 1.0,
            validity_future: 1.0,
            invalid: 1.0,
            timeliness_future: 1.0,
            stale: 0.5,
            orphan: 1.0,
            discrepancy: 1.0,
        }
    }
}

impl PenaltyWeights {
    /// Validates that every weight is finite and non-negative.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let entries = [
            ("null", self.null),
            ("duplicate", self.duplicate),
            ("casing", self.casing),
            ("negative", self.negative),
            ("validity_future", self.validity_future),
            ("invalid", self.invalid),
            ("timeliness_future", self.timeliness_future),
            ("stale", self.stale),
            ("orphan", self.orphan),
            ("discrepancy", self.discrepancy),
        ];
        for (name, value) in entries {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigValidationError::InvalidPenalty { name, value });
            }
        }
        Ok(())
    }
}

/// Declared referential check: every non-null `child` value must occur in `parent`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRelation {
    pub child: String,
    pub parent: String,
}

impl ColumnRelation {
    pub fn new(child: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            child: child.into(),
            parent: parent.into(),
        }
    }
}

/// Regulatory narrative emitted when a breaching dimension affects a
/// column whose name matches `pattern` (case-insensitive).
///
/// `narrative` may use `{column}` and `{dimension}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRule {
    pub pattern: String,
    pub dimensions: Vec<Dimension>,
    pub narrative: String,
}

impl RiskRule {
    pub fn new(
        pattern: impl Into<String>,
        dimensions: Vec<Dimension>,
        narrative: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            dimensions,
            narrative: narrative.into(),
        }
    }
}

/// Common identifier-column patterns.
///
/// Not applied by default; pass them to
/// [`AuditConfig::with_identifier_patterns`] to score Uniqueness on key
/// columns only.
pub fn default_identifier_patterns() -> Vec<String> {
    ["^id$", "_id$", "^uuid$", "_uuid$", "_key$", "_number$"]
        .iter()
        .map(|p| (*p).to_string())
        .collect()
}

/// Default KYC/AML, address, and financial-reporting risk rules.
pub fn default_risk_rules() -> Vec<RiskRule> {
    vec![
        RiskRule::new(
            r"kyc|(^|_)(customer|client|account|party)_?id$",
            vec![
                Dimension::Completeness,
                Dimension::Consistency,
                Dimension::Validity,
                Dimension::Uniqueness,
            ],
            "KYC and AML regulations may be impacted by {dimension} defects in the {column} column.",
        ),
        RiskRule::new(
            r"address|postcode|postal|zip",
            vec![
                Dimension::Completeness,
                Dimension::Consistency,
                Dimension::Validity,
            ],
            "Customer due diligence may fail address verification because of {dimension} defects in the {column} column.",
        ),
        RiskRule::new(
            r"amount|balance|txn|transaction|payment",
            vec![
                Dimension::Completeness,
                Dimension::Accuracy,
                Dimension::Validity,
                Dimension::Timeliness,
            ],
            "Financial and transaction reporting obligations may be breached by {dimension} defects in the {column} column.",
        ),
    ]
}

fn default_staleness_horizon_days() -> u32 {
    180
}

/// Complete configuration of an audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    pub ingest: IngestConfig,
    pub thresholds: IssueThresholds,
    pub penalties: PenaltyWeights,
    pub weights: DimensionWeights,
    /// Timestamps older than this many days before "now" are stale
    #[serde(default = "default_staleness_horizon_days")]
    pub staleness_horizon_days: u32,
    /// Case-insensitive regexes restricting Uniqueness to matching columns;
    /// empty scores every column
    pub identifier_patterns: Vec<String>,
    pub relations: Vec<ColumnRelation>,
    pub risk_rules: Vec<RiskRule>,
    /// Fixed "now" for reproducible timeliness; wall clock when absent
    pub reference_time: Option<DateTime<Utc>>,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            ingest: IngestConfig::default(),
            thresholds: IssueThresholds::default(),
            penalties: PenaltyWeights::default(),
            weights: DimensionWeights::default(),
            staleness_horizon_days: default_staleness_horizon_days(),
            identifier_patterns: Vec::new(),
            relations: Vec::new(),
            risk_rules: default_risk_rules(),
            reference_time: None,
        }
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ingest(mut self, ingest: IngestConfig) -> Self {
        self.ingest = ingest;
        self
    }

    pub fn with_thresholds(mut self, thresholds: IssueThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_penalties(mut self, penalties: PenaltyWeights) -> Self {
        self.penalties = penalties;
        self
    }

    pub fn with_weights(mut self, weights: DimensionWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn with_staleness_horizon_days(mut self, days: u32) -> Self {
        self.staleness_horizon_days = days;
        self
    }

    pub fn with_identifier_patterns(mut self, patterns: Vec<String>) -> Self {
        self.identifier_patterns = patterns;
        self
    }

    pub fn with_relation(mut self, relation: ColumnRelation) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn with_risk_rules(mut self, rules: Vec<RiskRule>) -> Self {
        self.risk_rules = rules;
        self
    }

    pub fn with_reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.reference_time = Some(now);
        self
    }

    /// Staleness horizon as a duration.
    pub fn staleness_horizon(&self) -> chrono::Duration {
        chrono::Duration::days(i64::from(self.staleness_horizon_days))
    }

    /// Validates the configuration (regex syntax is checked when compiled).
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.weights.validate()?;
        self.thresholds.validate()?;
        self.penalties.validate()?;
        if self.staleness_horizon_days == 0 {
            return Err(ConfigValidationError::ZeroStalenessHorizon);
        }
        for relation in &self.relations {
            if relation.child == relation.parent {
                return Err(ConfigValidationError::SelfRelation {
                    child: relation.child.clone(),
                    parent: relation.parent.clone(),
                });
            }
        }
        for rule in &self.risk_rules {
            if rule.dimensions.is_empty() {
                return Err(ConfigValidationError::EmptyRiskRule {
                    pattern: rule.pattern.clone(),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AuditConfig::default();
        assert!(config.validate().is_ok());
        assert!((config.weights.weight(Dimension::Integrity) - 1.0 / 7.0).abs() < 1e-12);
        assert!((config.thresholds.issue_score - 0.9).abs() < f64::EPSILON);
        assert_eq!(config.staleness_horizon_days, 180);
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let weights = DimensionWeights::from_overrides([
            (Dimension::Completeness, 0.5),
            (Dimension::Validity, 0.4),
        ]);
        assert!(matches!(
            weights.validate(),
            Err(ConfigValidationError::WeightSum(_))
        ));
    }

    #[test]
    fn test_partial_weights_default_to_zero() {
        let weights = DimensionWeights::from_overrides([
            (Dimension::Completeness, 0.6),
            (Dimension::Validity, 0.4),
        ]);
        assert!(weights.validate().is_ok());
        assert_eq!(weights.weight(Dimension::Accuracy), 0.0);
    }

    #[test]
    fn test_negative_weight_rejected() {
        let weights = DimensionWeights::from_overrides([
            (Dimension::Completeness, 1.5),
            (Dimension::Validity, -0.5),
        ]);
        assert!(matches!(
            weights.validate(),
            Err(ConfigValidationError::InvalidWeight { .. })
        ));
    }

    #[test]
    fn test_threshold_builders_clamp() {
        let thresholds = IssueThresholds::default()
            .with_issue_score(1.4)
            .with_null_ratio(-0.2);
        assert_eq!(thresholds.issue_score, 1.0);
        assert_eq!(thresholds.null_ratio, 0.0);
        assert!(thresholds.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = AuditConfig::new()
            .with_thresholds(IssueThresholds::default().with_stale_ratio(1.5))
            .with_penalties(PenaltyWeights {
                stale: 1.0,
                ..PenaltyWeights::default()
            })
            .with_identifier_patterns(default_identifier_patterns());

        assert_eq!(config.thresholds.stale_ratio, 1.0);
        assert_eq!(config.penalties.stale, 1.0);
        assert_eq!(config.identifier_patterns.len(), 6);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_uniqueness_scope_is_unrestricted_by_default() {
        assert_eq!(AuditConfig::new(), AuditConfig::default());
        assert!(AuditConfig::default().identifier_patterns.is_empty());
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let thresholds = IssueThresholds {
            stale_ratio: 2.0,
            ..IssueThresholds::default()
        };
        assert!(matches!(
            thresholds.validate(),
            Err(ConfigValidationError::OutOfRange {
                name: "stale_ratio",
                ..
            })
        ));
    }

    #[test]
    fn test_self_relation_rejected() {
        let config = AuditConfig::default().with_relation(ColumnRelation::new("id", "id"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_error_conversion() {
        let error: DqsError = ConfigValidationError::ZeroStalenessHorizon.into();
        assert_eq!(error.kind(), "ConfigError");
    }

    #[test]
    fn test_deserialize_partial_json() {
        let config: AuditConfig = serde_json::from_str(
            r#"{
                "weights": {"Completeness": 0.5, "Validity": 0.5},
                "thresholds": {"issue_score": 0.8},
                "relations": [{"child": "customer_id", "parent": "id"}]
            }"#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.weights.weight(Dimension::Timeliness), 0.0);
        assert!((config.thresholds.issue_score - 0.8).abs() < f64::EPSILON);
        assert!((config.thresholds.null_ratio - 0.01).abs() < f64::EPSILON);
        assert_eq!(config.relations.len(), 1);
        assert_eq!(config.risk_rules.len(), 3);
    }
}
