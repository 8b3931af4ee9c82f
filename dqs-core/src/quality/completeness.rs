//! Completeness scoring.
//!
//! Every column of a non-empty frame is evaluated; its penalty is the
//! weighted null ratio.

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Scores completeness from null ratios.
pub fn assess_completeness(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    if profile.row_count == 0 {
        return DimensionAssessment::vacuous(Dimension::Completeness);
    }

    let column_penalties = profile
        .columns
        .iter()
        .map(|stats| ColumnPenalty {
            column: stats.name.clone(),
            penalty: weights.null * stats.null_ratio,
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Completeness, column_penalties, None)
}
