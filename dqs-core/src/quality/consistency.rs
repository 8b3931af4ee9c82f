//! Consistency scoring.
//!
//! A string column is inconsistent when the same value is spelled with
//! different casing ("INR" and "inr"). The penalty is the share of distinct
//! values that belong to such a group.

use crate::frame::ColumnKind;

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Scores casing consistency of string columns.
pub fn assess_consistency(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter(|stats| stats.kind == ColumnKind::String && stats.non_null_count() > 0)
        .map(|stats| ColumnPenalty {
            column: stats.name.clone(),
            penalty: weights.casing * stats.casing_variant_ratio(),
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Consistency, column_penalties, None)
}
