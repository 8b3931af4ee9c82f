//! Integrity scoring over declared referential checks.

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Scores orphaned references in declared child columns.
pub fn assess_integrity(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter_map(|stats| {
            stats.orphan_ratio.map(|ratio| ColumnPenalty {
                column: stats.name.clone(),
                penalty: weights.orphan * ratio,
            })
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Integrity, column_penalties, None)
}
