//! Validity scoring.
//!
//! Penalizes negative numbers, timestamps after "now", and raw values that
//! could not be coerced to their column's type.

use crate::frame::ColumnKind;

use super::config::PenaltyWeights;
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Scores validity of numeric and timestamp columns and of any column with
/// rejected values.
pub fn assess_validity(profile: &FrameProfile, weights: &PenaltyWeights) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter(|stats| {
            let typed = matches!(stats.kind, ColumnKind::Number | ColumnKind::Timestamp)
                && stats.non_null_count() > 0;
            typed || stats.invalid_ratio > 0.0
        })
        .map(|stats| ColumnPenalty {
            column: stats.name.clone(),
            penalty: weights.negative * stats.negative_ratio.unwrap_or(0.0)
                + weights.validity_future * stats.future_ratio.unwrap_or(0.0)
                + weights.invalid * stats.invalid_ratio,
        })
        .collect();

    DimensionAssessment::from_penalties(Dimension::Validity, column_penalties, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnSchema, FrameBuilder, Value};
    use crate::quality::profiler::{ProfileOptions, profile};
    use chrono::{Duration, Utc};

    #[test]
    fn test_negative_values_penalized() {
        let frame = FrameBuilder::new()
            .column("amount", ColumnKind::Number)
            .row(vec![Value::from(-1.0)])
            .row(vec![Value::from(1.0)])
            .row(vec![Value::from(2.0)])
            .row(vec![Value::from(3.0)])
            .build()
            .unwrap();
        let assessment = assess_validity(
            &profile(&frame, &ProfileOptions::new(Utc::now())),
            &PenaltyWeights::default(),
        );

        assert!((assessment.score - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_future_timestamps_penalized() {
        let now = Utc::now();
        let frame = FrameBuilder::new()
            .column("txn_timestamp", ColumnKind::Timestamp)
            .row(vec![Value::from(now + Duration::days(365))])
            .row(vec![Value::from(now - Duration::days(1))])
            .build()
            .unwrap();
        let assessment = assess_validity(
            &profile(&frame, &ProfileOptions::new(now)),
            &PenaltyWeights::default(),
        );

        assert!((assessment.score - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_rejected_string_column_applicable() {
        let frame = FrameBuilder::new()
            .column_schema(ColumnSchema::new("note", ColumnKind::String).with_rejected_values(1))
            .row(vec![Value::Null])
            .row(vec![Value::from("ok")])
            .build()
            .unwrap();
        let assessment = assess_validity(
            &profile(&frame, &ProfileOptions::new(Utc::now())),
            &PenaltyWeights::default(),
        );

        assert!(assessment.covered());
        assert!((assessment.score - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_plain_strings_not_applicable() {
        let frame = FrameBuilder::new()
            .column("name", ColumnKind::String)
            .row(vec![Value::from("a")])
            .build()
            .unwrap();
        let assessment = assess_validity(
            &profile(&frame, &ProfileOptions::new(Utc::now())),
            &PenaltyWeights::default(),
        );

        assert!(!assessment.covered());
    }
}
