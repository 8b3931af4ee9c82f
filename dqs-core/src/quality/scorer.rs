//! Runs the seven dimension rules over one profile.

use super::accuracy::assess_accuracy;
use super::completeness::assess_completeness;
use super::config::PenaltyWeights;
use super::consistency::assess_consistency;
use super::integrity::assess_integrity;
use super::models::{FrameProfile, ScoreCard};
use super::timeliness::assess_timeliness;
use super::uniqueness::{IdentifierPatterns, assess_uniqueness};
use super::validity::assess_validity;

/// Scores every dimension. Each rule sees only the profile, so the rules are
/// independent of each other and of evaluation order.
pub fn score_dimensions(
    profile: &FrameProfile,
    weights: &PenaltyWeights,
    identifiers: &IdentifierPatterns,
) -> ScoreCard {
    let card = ScoreCard::new([
        assess_completeness(profile, weights),
        assess_accuracy(profile, weights),
        assess_consistency(profile, weights),
        assess_validity(profile, weights),
        assess_timeliness(profile, weights),
        assess_uniqueness(profile, identifiers, weights),
        assess_integrity(profile, weights),
    ]);

    for (dimension, assessment) in &card.assessments {
        tracing::debug!(
            "{} score {:.4} (penalty {:.4}, {} columns evaluated)",
            dimension,
            assessment.score,
            assessment.penalty,
            assessment.column_penalties.len()
        );
    }

    card
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnKind, FrameBuilder, Value};
    use crate::quality::models::Dimension;
    use crate::quality::profiler::{ProfileOptions, profile};
    use chrono::Utc;

    #[test]
    fn test_all_dimensions_present() {
        let frame = FrameBuilder::new()
            .column("amount", ColumnKind::Number)
            .row(vec![Value::from(5.0)])
            .build()
            .unwrap();
        let card = score_dimensions(
            &profile(&frame, &ProfileOptions::new(Utc::now())),
            &PenaltyWeights::default(),
            &IdentifierPatterns::default(),
        );

        assert_eq!(card.assessments.len(), 7);
        for dimension in Dimension::ALL {
            assert_eq!(card.score(dimension), 1.0, "{} should be clean", dimension);
        }
        assert!(card.coverage()[&Dimension::Completeness]);
        assert!(!card.coverage()[&Dimension::Integrity]);
    }
}
