//! Audit report data structures and their wire format.
//!
//! A report is immutable once built: fields are private and exposed through
//! getters. Serialization follows the wire format consumed by downstream
//! tooling (`status` plus a `genai_insights` object), with `source` and
//! `dimension_coverage` as additional top-level fields.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DqsError, Result};
use crate::quality::Dimension;

/// Outcome of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    /// A report was produced
    Success,
    /// Ingestion failed; see [`FailureReport`]
    Failure,
}

/// Whether a report was computed from data or is the canned demo report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportSource {
    /// Computed from an ingested frame
    Live,
    /// The fixed demo report
    Placeholder,
}

/// Issue found for one dimension.
///
/// An empty `affected_columns` list means the dimension is clean.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityIssue {
    /// One-line summary
    pub issue: String,
    /// Columns named by the issue, in frame order
    pub affected_columns: Vec<String>,
    /// Quantitative evidence
    pub description: String,
}

impl QualityIssue {
    /// Creates an issue.
    pub fn new(
        issue: impl Into<String>,
        affected_columns: Vec<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            issue: issue.into(),
            affected_columns,
            description: description.into(),
        }
    }

    /// True if the issue names at least one column.
    pub fn is_actionable(&self) -> bool {
        !self.affected_columns.is_empty()
    }
}

/// Prioritized remediation step; priority 1 is the most urgent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationAction {
    /// Short action label
    pub action: String,
    /// 1-based rank, unique within a report
    pub priority: u32,
    /// The action applied to the affected columns
    pub description: String,
}

/// Body of a successful report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenAiInsights {
    /// One entry per dimension; clean dimensions name no columns
    pub data_quality_issues: BTreeMap<Dimension, QualityIssue>,
    /// Ordered by priority
    pub remediation_actions: Vec<RemediationAction>,
    /// Narratives for sensitive columns in breaching dimensions
    pub regulatory_compliance_risks: Vec<String>,
    /// Weighted mean of the dimension scores, 2 decimals
    pub composite_dqs: f64,
    /// Score in `[0, 1]` for each of the seven dimensions
    pub dimension_scores: BTreeMap<Dimension, f64>,
}

/// Final audit report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditReport {
    status: ReportStatus,
    source: ReportSource,
    genai_insights: GenAiInsights,
    dimension_coverage: BTreeMap<Dimension, bool>,
}

impl AuditReport {
    /// Builds a live report.
    pub(crate) fn live(insights: GenAiInsights, coverage: BTreeMap<Dimension, bool>) -> Self {
        Self {
            status: ReportStatus::Success,
            source: ReportSource::Live,
            genai_insights: insights,
            dimension_coverage: coverage,
        }
    }

    /// The product's demo report, labelled as a placeholder.
    ///
    /// Its composite score is the demo's own figure and is not recomputed
    /// from the dimension scores.
    pub fn placeholder() -> Self {
        let column_list = |columns: &[&str]| columns.iter().map(|c| (*c).to_string()).collect();

        let data_quality_issues = BTreeMap::from([
            (
                Dimension::Completeness,
                QualityIssue::new(
                    "Some columns have high null ratios",
                    column_list(&["customer_id", "amount", "kyc_address"]),
                    "The columns customer_id, amount, and kyc_address have null ratios of 0.0012, 0.0005, and 0.22 respectively, indicating some missing values.",
                ),
            ),
            (
                Dimension::Accuracy,
                QualityIssue::new(
                    "No specific accuracy issues detected",
                    Vec::new(),
                    "No specific accuracy issues detected, but some data may be incorrect or inconsistent.",
                ),
            ),
            (
                Dimension::Consistency,
                QualityIssue::new(
                    "Inconsistent data formats",
                    column_list(&["currency"]),
                    "The currency column has both 'INR' and 'inr' values, indicating inconsistent data formats.",
                ),
            ),
            (
                Dimension::Validity,
                QualityIssue::new(
                    "Some values may not be valid",
                    column_list(&["amount", "txn_timestamp"]),
                    "The amount column has a negative value ratio of 0.015 and a min value of -50.0, indicating some potentially invalid values. The txn_timestamp column has a future timestamp ratio of 0.02 and a stale record ratio of 0.18.",
                ),
            ),
            (
                Dimension::Timeliness,
                QualityIssue::new(
                    "Some records may be stale or have future timestamps",
                    column_list(&["txn_timestamp"]),
                    "The txn_timestamp column has a future timestamp ratio of 0.02 and a stale record ratio of 0.18, indicating some records may not be up-to-date.",
                ),
            ),
            (
                Dimension::Uniqueness,
                QualityIssue::new(
                    "Some columns have low uniqueness ratios",
                    column_list(&["customer_id", "amount", "kyc_address"]),
                    "The columns customer_id, amount, and kyc_address have unique ratios of 0.42, 0.23, and 0.76 respectively, indicating some duplicate values.",
                ),
            ),
            (
                Dimension::Integrity,
                QualityIssue::new(
                    "No specific integrity issues detected",
                    Vec::new(),
                    "No specific integrity issues detected.",
                ),
            ),
        ]);

        let remediation_actions = vec![
            RemediationAction {
                action: "Validate and correct inconsistent data formats".to_string(),
                priority: 1,
                description: "Validate and correct inconsistent data formats in the currency column.".to_string(),
            },
            RemediationAction {
                action: "Verify and correct potentially invalid values".to_string(),
                priority: 2,
                description: "Verify and correct potentially invalid values in the amount and txn_timestamp columns.".to_string(),
            },
            RemediationAction {
                action: "Handle missing values".to_string(),
                priority: 3,
                description: "Handle missing values in the customer_id, amount, and kyc_address columns.".to_string(),
            },
        ];

        let dimension_scores = BTreeMap::from([
            (Dimension::Completeness, 0.7),
            (Dimension::Accuracy, 0.0),
            (Dimension::Consistency, 0.8),
            (Dimension::Validity, 0.75),
            (Dimension::Timeliness, 0.85),
            (Dimension::Uniqueness, 0.9),
            (Dimension::Integrity, 1.0),
        ]);

        Self {
            status: ReportStatus::Success,
            source: ReportSource::Placeholder,
            genai_insights: GenAiInsights {
                data_quality_issues,
                remediation_actions,
                regulatory_compliance_risks: vec![
                    "KYC and AML regulations may be impacted by inconsistent or invalid data in the kyc_address and customer_id columns.".to_string(),
                ],
                composite_dqs: 0.72,
                dimension_scores,
            },
            dimension_coverage: Dimension::ALL.iter().map(|d| (*d, false)).collect(),
        }
    }

    /// Success or failure.
    pub fn status(&self) -> ReportStatus {
        self.status
    }

    /// Live or placeholder.
    pub fn source(&self) -> ReportSource {
        self.source
    }

    /// True for the demo report.
    pub fn is_placeholder(&self) -> bool {
        self.source == ReportSource::Placeholder
    }

    /// The `genai_insights` body.
    pub fn insights(&self) -> &GenAiInsights {
        &self.genai_insights
    }

    /// Composite data quality score.
    pub fn composite_dqs(&self) -> f64 {
        self.genai_insights.composite_dqs
    }

    /// Per-dimension scores.
    pub fn dimension_scores(&self) -> &BTreeMap<Dimension, f64> {
        &self.genai_insights.dimension_scores
    }

    /// Per-dimension issues.
    pub fn issues(&self) -> &BTreeMap<Dimension, QualityIssue> {
        &self.genai_insights.data_quality_issues
    }

    /// Remediation actions by priority.
    pub fn remediation_actions(&self) -> &[RemediationAction] {
        &self.genai_insights.remediation_actions
    }

    /// Regulatory risk narratives.
    pub fn regulatory_compliance_risks(&self) -> &[String] {
        &self.genai_insights.regulatory_compliance_risks
    }

    /// Whether any column contributed to each dimension.
    pub fn dimension_coverage(&self) -> &BTreeMap<Dimension, bool> {
        &self.dimension_coverage
    }

    /// Serializes to a JSON value.
    ///
    /// # Errors
    /// Returns `DqsError::Serialization` if serialization fails.
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self)
            .map_err(|e| DqsError::serialization("failed to serialize audit report", e))
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `DqsError::Serialization` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DqsError::serialization("failed to serialize audit report", e))
    }
}

/// Serialized form of a failed invocation. No partial report is produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    /// Always `failure`
    pub status: ReportStatus,
    /// Stable error kind, e.g. `ShapeError`
    pub error_kind: String,
    /// Human-readable reason, credentials redacted
    pub reason: String,
}

impl FailureReport {
    /// Wraps an ingestion or configuration error.
    pub fn from_error(error: &DqsError) -> Self {
        Self {
            status: ReportStatus::Failure,
            error_kind: error.kind().to_string(),
            reason: error.to_string(),
        }
    }

    /// Serializes to pretty-printed JSON.
    ///
    /// # Errors
    /// Returns `DqsError::Serialization` if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| DqsError::serialization("failed to serialize failure report", e))
    }
}
