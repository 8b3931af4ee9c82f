//! Data structures for profiling and dimension scoring.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::frame::ColumnKind;

/// The seven quality dimensions, in canonical report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Dimension {
    /// Missing values
    Completeness,
    /// Disagreement with a reference source
    Accuracy,
    /// Uniform representation, such as casing
    Consistency,
    /// Values within their domain
    Validity,
    /// Future or stale timestamps
    Timeliness,
    /// Repeated values and duplicate rows
    Uniqueness,
    /// Referential integrity
    Integrity,
}

impl Dimension {
    /// All dimensions in canonical order.
    pub const ALL: [Self; 7] = [
        Self::Completeness,
        Self::Accuracy,
        Self::Consistency,
        Self::Validity,
        Self::Timeliness,
        Self::Uniqueness,
        Self::Integrity,
    ];

    /// Tie-break rank for remediation ordering; lower is more urgent.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::Completeness => 0,
            Self::Validity => 1,
            Self::Consistency => 2,
            Self::Timeliness => 3,
            Self::Uniqueness => 4,
            Self::Integrity => 5,
            Self::Accuracy => 6,
        }
    }

    /// Name as it appears in reports.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Completeness => "Completeness",
            Self::Accuracy => "Accuracy",
            Self::Consistency => "Consistency",
            Self::Validity => "Validity",
            Self::Timeliness => "Timeliness",
            Self::Uniqueness => "Uniqueness",
            Self::Integrity => "Integrity",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw statistics for one column.
///
/// Ratios are in `[0, 1]` and are 0 on empty columns. Type-specific fields
/// are `None` for columns of other kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStats {
    pub name: String,
    pub kind: ColumnKind,
    pub row_count: usize,
    pub null_count: usize,
    /// Nulls over row count
    pub null_ratio: f64,
    /// Distinct non-null values
    pub distinct_count: usize,
    /// Distinct non-null values over non-null values
    pub unique_ratio: f64,
    /// Negative values over non-null values (numbers only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_ratio: Option<f64>,
    /// Smallest numeric value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    /// Largest numeric value
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    /// Timestamps after the reference time over non-null values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub future_ratio: Option<f64>,
    /// Timestamps older than the staleness window over non-null values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale_ratio: Option<f64>,
    /// Case-folded value groups spelled more than one way
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_value_casing_variants: Option<usize>,
    /// Values rejected during type coercion over row count
    pub invalid_ratio: f64,
    /// Non-null values missing from the referenced column
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphan_ratio: Option<f64>,
    /// Column referenced by `orphan_ratio`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub references: Option<String>,
    /// Adapter-supplied cross-source discrepancy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discrepancy_ratio: Option<f64>,
}

impl ColumnStats {
    /// Stats for a column with no observed values.
    pub fn empty(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            row_count: 0,
            null_count: 0,
            null_ratio: 0.0,
            distinct_count: 0,
            unique_ratio: 0.0,
            negative_ratio: None,
            min: None,
            max: None,
            future_ratio: None,
            stale_ratio: None,
            distinct_value_casing_variants: None,
            invalid_ratio: 0.0,
            orphan_ratio: None,
            references: None,
            discrepancy_ratio: None,
        }
    }

    /// Count of non-null values.
    pub fn non_null_count(&self) -> usize {
        self.row_count.saturating_sub(self.null_count)
    }

    /// Casing variants over distinct values; 0 for non-string or empty columns.
    pub fn casing_variant_ratio(&self) -> f64 {
        match self.distinct_value_casing_variants {
            Some(variants) if self.distinct_count > 0 => {
                (variants as f64 / self.distinct_count as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }
}

/// Profile of a whole frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameProfile {
    /// Rows in the frame
    pub row_count: usize,
    /// Rows identical to an earlier row
    pub duplicate_row_count: usize,
    /// Duplicate rows over row count
    pub duplicate_row_ratio: f64,
    /// Per-column stats in frame column order
    pub columns: Vec<ColumnStats>,
}

impl Default for FrameProfile {
    fn default() -> Self {
        Self {
            row_count: 0,
            duplicate_row_count: 0,
            duplicate_row_ratio: 0.0,
            columns: Vec::new(),
        }
    }
}

impl FrameProfile {
    /// Looks up a column's stats by name.
    pub fn column(&self, name: &str) -> Option<&ColumnStats> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Penalty one column contributed to a dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPenalty {
    pub column: String,
    /// Weighted penalty, before clamping
    pub penalty: f64,
}

/// Outcome of scoring one dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionAssessment {
    pub dimension: Dimension,
    /// `1 - min(1, penalty)`, rounded to 4 decimals
    pub score: f64,
    /// Worst applicable penalty
    pub penalty: f64,
    /// Every evaluated column with its weighted penalty, in frame order
    pub column_penalties: Vec<ColumnPenalty>,
    /// Frame-level penalty (duplicate rows), when evaluated
    pub frame_penalty: Option<f64>,
}

impl DimensionAssessment {
    /// Builds an assessment from per-column penalties using the worst one.
    pub fn from_penalties(
        dimension: Dimension,
        column_penalties: Vec<ColumnPenalty>,
        frame_penalty: Option<f64>,
    ) -> Self {
        let penalty = column_penalties
            .iter()
            .map(|c| c.penalty)
            .chain(frame_penalty)
            .filter(|p| p.is_finite())
            .fold(0.0_f64, f64::max)
            .max(0.0);

        Self {
            dimension,
            score: round_to(1.0 - penalty.min(1.0), 4),
            penalty,
            column_penalties,
            frame_penalty,
        }
    }

    /// A dimension with no applicable columns.
    pub fn vacuous(dimension: Dimension) -> Self {
        Self::from_penalties(dimension, Vec::new(), None)
    }

    /// True if at least one column or frame-level signal was evaluated.
    pub fn covered(&self) -> bool {
        !self.column_penalties.is_empty() || self.frame_penalty.is_some()
    }

    /// Columns carrying the maximum non-zero penalty.
    pub fn worst_columns(&self) -> Vec<String> {
        if self.penalty <= 0.0 {
            return Vec::new();
        }
        self.column_penalties
            .iter()
            .filter(|c| (c.penalty - self.penalty).abs() < 1e-12)
            .map(|c| c.column.clone())
            .collect()
    }
}

/// Assessments for all seven dimensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCard {
    pub assessments: BTreeMap<Dimension, DimensionAssessment>,
}

impl ScoreCard {
    /// Builds a card, filling any missing dimension with a vacuous assessment.
    pub fn new(assessments: impl IntoIterator<Item = DimensionAssessment>) -> Self {
        let mut map: BTreeMap<Dimension, DimensionAssessment> = assessments
            .into_iter()
            .map(|a| (a.dimension, a))
            .collect();
        for dimension in Dimension::ALL {
            map.entry(dimension)
                .or_insert_with(|| DimensionAssessment::vacuous(dimension));
        }
        Self { assessments: map }
    }

    /// Assessment for a dimension.
    pub fn get(&self, dimension: Dimension) -> Option<&DimensionAssessment> {
        self.assessments.get(&dimension)
    }

    /// Score of a dimension; 1.0 if absent.
    pub fn score(&self, dimension: Dimension) -> f64 {
        self.get(dimension).map_or(1.0, |a| a.score)
    }

    /// Score per dimension.
    pub fn scores(&self) -> BTreeMap<Dimension, f64> {
        self.assessments
            .iter()
            .map(|(dimension, assessment)| (*dimension, assessment.score))
            .collect()
    }

    /// Whether each dimension had anything to evaluate.
    pub fn coverage(&self) -> BTreeMap<Dimension, bool> {
        self.assessments
            .iter()
            .map(|(dimension, assessment)| (*dimension, assessment.covered()))
            .collect()
    }
}

/// Rounds half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ratio of `part` to `whole`; 0 when `whole` is 0.
pub fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        (part as f64 / whole as f64).clamp(0.0, 1.0)
    }
}
