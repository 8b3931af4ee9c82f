//! Accuracy scoring.
//!
//! Accuracy cannot be measured from a single snapshot; it is driven by
//! cross-source discrepancy ratios the adapter attached to the frame.

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

pub fn assess_accuracy(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter_map(|stats| {
            stats.discrepancy_ratio.map(|ratio| ColumnPenalty {
                column: stats.name.clone(),
                penalty: weights.discrepancy * ratio,
            })
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Accuracy, column_penalties, None)
}
