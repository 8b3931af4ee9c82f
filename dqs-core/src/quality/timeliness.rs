//! Timeliness scoring for timestamp columns.

use crate::frame::ColumnKind;

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Scores future-dated and stale timestamps.
pub fn assess_timeliness(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter(|stats| stats.kind == ColumnKind::Timestamp && stats.non_null_count() > 0)
        .map(|stats| ColumnPenalty {
            column: stats.name.clone(),
            penalty: weights.timeliness_future * stats.future_ratio.unwrap_or(0.0)
                + weights.stale * stats.stale_ratio.unwrap_or(0.0),
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Timeliness, column_penalties, None)
}
