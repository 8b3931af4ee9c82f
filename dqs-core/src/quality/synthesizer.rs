//! Issue and remediation synthesis.
//!
//! Consumes the score card produced by the scorer together with the profile
//! it was computed from; scores are never recomputed here. Descriptions
//! quote measured ratios so every issue is traceable to statistics.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::report::{QualityIssue, RemediationAction};

use super::config::IssueThresholds;
use super::models::{ColumnStats, Dimension, DimensionAssessment, FrameProfile, ScoreCard};

/// Issues for all seven dimensions plus the ordered remediation plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Synthesis {
    pub issues: BTreeMap<Dimension, QualityIssue>,
    pub remediation: Vec<RemediationAction>,
}

/// Formats a ratio with up to four decimals, trimming trailing zeros.
pub fn format_ratio(value: f64) -> String {
    let formatted = format!("{:.4}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Joins names as "a", "a and b", or "a, b, and c".
pub fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}

fn column_phrase(columns: &[String]) -> String {
    if columns.len() == 1 {
        format!("the {} column", join_names(columns))
    } else {
        format!("the {} columns", join_names(columns))
    }
}

fn action_label(dimension: Dimension) -> &'static str {
    match dimension {
        Dimension::Completeness => "Handle missing values",
        Dimension::Consistency => "Validate and correct inconsistent data formats",
        Dimension::Validity => "Verify and correct potentially invalid values",
        Dimension::Timeliness => "Refresh stale records and correct future timestamps",
        Dimension::Uniqueness => "Deduplicate records and enforce unique identifiers",
        Dimension::Integrity => "Repair orphaned references",
        Dimension::Accuracy => "Reconcile values against the reference source",
    }
}

/// One column's sub-threshold breach with its evidence sentence.
struct Finding {
    column: String,
    evidence: String,
}

fn finding(stats: &ColumnStats, clauses: Vec<String>) -> Option<Finding> {
    if clauses.is_empty() {
        return None;
    }
    Some(Finding {
        column: stats.name.clone(),
        evidence: format!("Column '{}' has {}.", stats.name, clauses.join(" and ")),
    })
}

fn column_findings(
    dimension: Dimension,
    stats: &ColumnStats,
    thresholds: &IssueThresholds,
) -> Option<Finding> {
    let mut clauses = Vec::new();
    match dimension {
        Dimension::Completeness => {
            if stats.null_ratio > thresholds.null_ratio {
                clauses.push(format!("a null ratio of {}", format_ratio(stats.null_ratio)));
            }
        }
        Dimension::Uniqueness => {
            if stats.unique_ratio < thresholds.unique_ratio_min {
                clauses.push(format!(
                    "a unique ratio of {}",
                    format_ratio(stats.unique_ratio)
                ));
            }
        }
        Dimension::Consistency => {
            let casing = stats.casing_variant_ratio();
            if casing > thresholds.casing_variant_ratio {
                clauses.push(format!(
                    "a casing variant ratio of {} ({} of {} distinct values spelled with mixed casing)",
                    format_ratio(casing),
                    stats.distinct_value_casing_variants.unwrap_or(0),
                    stats.distinct_count
                ));
            }
        }
        Dimension::Validity => {
            if let Some(negative) = stats.negative_ratio
                && negative > thresholds.negative_ratio
            {
                let min = stats
                    .min
                    .map(|m| format!(" and a min value of {}", m))
                    .unwrap_or_default();
                clauses.push(format!(
                    "a negative value ratio of {}{}",
                    format_ratio(negative),
                    min
                ));
            }
            if let Some(future) = stats.future_ratio
                && future > thresholds.future_ratio
            {
                clauses.push(format!(
                    "a future timestamp ratio of {}",
                    format_ratio(future)
                ));
            }
            if stats.invalid_ratio > thresholds.invalid_ratio {
                clauses.push(format!(
                    "an invalid value ratio of {}",
                    format_ratio(stats.invalid_ratio)
                ));
            }
        }
        Dimension::Timeliness => {
            if let Some(future) = stats.future_ratio
                && future > thresholds.future_ratio
            {
                clauses.push(format!(
                    "a future timestamp ratio of {}",
                    format_ratio(future)
                ));
            }
            if let Some(stale) = stats.stale_ratio
                && stale > thresholds.stale_ratio
            {
                clauses.push(format!("a stale record ratio of {}", format_ratio(stale)));
            }
        }
        Dimension::Integrity => {
            if let Some(orphan) = stats.orphan_ratio
                && orphan > thresholds.orphan_ratio
            {
                let target = stats
                    .references
                    .as_deref()
                    .map(|parent| format!(" against '{}'", parent))
                    .unwrap_or_default();
                clauses.push(format!("an orphan ratio of {}{}", format_ratio(orphan), target));
            }
        }
        Dimension::Accuracy => {
            if let Some(discrepancy) = stats.discrepancy_ratio
                && discrepancy > thresholds.discrepancy_ratio
            {
                clauses.push(format!(
                    "a discrepancy ratio of {} against the reference source",
                    format_ratio(discrepancy)
                ));
            }
        }
    }
    finding(stats, clauses)
}

fn issue_summary(dimension: Dimension, duplicate_rows_only: bool) -> &'static str {
    match dimension {
        Dimension::Completeness => "Some columns have high null ratios",
        Dimension::Accuracy => "Some values disagree with the reference source",
        Dimension::Consistency => "Inconsistent data formats",
        Dimension::Validity => "Some values may not be valid",
        Dimension::Timeliness => "Some records may be stale or have future timestamps",
        Dimension::Uniqueness if duplicate_rows_only => "Duplicate records detected",
        Dimension::Uniqueness => "Some columns have low uniqueness ratios",
        Dimension::Integrity => "Some references point to missing records",
    }
}

fn neutral_issue(dimension: Dimension, score: f64) -> QualityIssue {
    let label = dimension.as_str().to_lowercase();
    QualityIssue::new(
        format!("No specific {} issues detected", label),
        Vec::new(),
        format!(
            "No specific {} issues detected (score {}).",
            label,
            format_ratio(score)
        ),
    )
}

fn breaching_issue(
    assessment: &DimensionAssessment,
    profile: &FrameProfile,
    thresholds: &IssueThresholds,
) -> QualityIssue {
    let dimension = assessment.dimension;
    let mut affected: Vec<String> = Vec::new();
    let mut evidence: Vec<String> = Vec::new();

    for penalty in &assessment.column_penalties {
        if let Some(stats) = profile.column(&penalty.column)
            && let Some(found) = column_findings(dimension, stats, thresholds)
        {
            affected.push(found.column);
            evidence.push(found.evidence);
        }
    }

    let mut duplicate_rows_only = false;
    if dimension == Dimension::Uniqueness
        && assessment.frame_penalty.is_some()
        && profile.duplicate_row_ratio > thresholds.duplicate_row_ratio
    {
        duplicate_rows_only = affected.is_empty();
        evidence.push(format!(
            "{} of {} rows duplicate an earlier row (duplicate row ratio {}).",
            profile.duplicate_row_count,
            profile.row_count,
            format_ratio(profile.duplicate_row_ratio)
        ));
        // Whole-row duplication implicates every column.
        affected = profile.columns.iter().map(|c| c.name.clone()).collect();
    }

    if affected.is_empty() {
        affected = assessment.worst_columns();
        for column in &affected {
            evidence.push(format!(
                "Column '{}' carries the highest {} penalty of {}.",
                column,
                dimension.as_str().to_lowercase(),
                format_ratio(assessment.penalty)
            ));
        }
    }
    if affected.is_empty() && assessment.frame_penalty.is_some_and(|p| p > 0.0) {
        duplicate_rows_only = true;
        affected = profile.columns.iter().map(|c| c.name.clone()).collect();
    }

    let mut description = format!(
        "{} score is {} against a threshold of {}.",
        dimension,
        format_ratio(assessment.score),
        format_ratio(thresholds.issue_score)
    );
    for sentence in evidence {
        description.push(' ');
        description.push_str(&sentence);
    }

    QualityIssue::new(
        issue_summary(dimension, duplicate_rows_only),
        affected,
        description,
    )
}

/// Builds issues for every dimension and the remediation plan.
pub fn synthesize(
    profile: &FrameProfile,
    card: &ScoreCard,
    thresholds: &IssueThresholds,
) -> Synthesis {
    let mut issues = BTreeMap::new();
    let mut breaching: Vec<&DimensionAssessment> = Vec::new();

    for (dimension, assessment) in &card.assessments {
        if assessment.score < thresholds.issue_score {
            let issue = breaching_issue(assessment, profile, thresholds);
            if issue.is_actionable() {
                breaching.push(assessment);
            }
            issues.insert(*dimension, issue);
        } else {
            issues.insert(*dimension, neutral_issue(*dimension, assessment.score));
        }
    }

    breaching.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.dimension.precedence().cmp(&b.dimension.precedence()))
    });

    let remediation = breaching
        .iter()
        .zip(1_u32..)
        .filter_map(|(assessment, priority)| {
            let issue = issues.get(&assessment.dimension)?;
            let label = action_label(assessment.dimension);
            Some(RemediationAction {
                action: label.to_string(),
                priority,
                description: format!(
                    "{} in {}.",
                    label,
                    column_phrase(&issue.affected_columns)
                ),
            })
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        "Synthesized {} breaching dimensions into {} remediation actions",
        breaching.len(),
        remediation.len()
    );

    Synthesis {
        issues,
        remediation,
    }
}
