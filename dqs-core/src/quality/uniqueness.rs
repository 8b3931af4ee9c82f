//! Uniqueness scoring.
//!
//! Two signals feed this dimension: repeated values within a column
//! (`1 - unique_ratio`) and fully duplicated rows. Every column with a
//! non-null value is scored unless the configuration narrows the scope to
//! columns matching identifier name patterns.

use regex::{Regex, RegexBuilder};

use super::config::{ConfigValidationError, PenaltyWeights};
use super::models::{ColumnPenalty, Dimension, DimensionAssessment, FrameProfile};

/// Compiled column-name patterns restricting Uniqueness.
///
/// An empty set selects every column.
#[derive(Debug, Clone, Default)]
pub struct IdentifierPatterns {
    patterns: Vec<Regex>,
}

impl IdentifierPatterns {
    /// Compiles case-insensitive patterns.
    ///
    /// # Errors
    /// Returns `ConfigValidationError::InvalidPattern` for malformed regexes.
    pub fn compile(patterns: &[String]) -> Result<Self, ConfigValidationError> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigValidationError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True when no narrowing patterns are configured.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// True if the column is in scope for Uniqueness.
    pub fn selects(&self, column: &str) -> bool {
        self.is_empty() || self.patterns.iter().any(|p| p.is_match(column))
    }
}

/// Scores repeated column values and whole-row duplicates.
pub fn assess_uniqueness(
    profile: &FrameProfile,
    scope: &IdentifierPatterns,
    weights: &PenaltyWeights,
) -> DimensionAssessment {
    let column_penalties = profile
        .columns
        .iter()
        .filter(|stats| stats.non_null_count() > 0 && scope.selects(&stats.name))
        .map(|stats| ColumnPenalty {
            column: stats.name.clone(),
            penalty: weights.duplicate * (1.0 - stats.unique_ratio),
        })
        .collect();

    let frame_penalty = (profile.row_count > 0 && !profile.columns.is_empty())
        .then(|| weights.duplicate * profile.duplicate_row_ratio);

    DimensionAssessment::from_penalties(Dimension::Uniqueness, column_penalties, frame_penalty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnKind, Frame, FrameBuilder, Value};
    use crate::quality::config::default_identifier_patterns;
    use crate::quality::profiler::{ProfileOptions, profile};
    use chrono::Utc;

    fn identifiers_only() -> IdentifierPatterns {
        IdentifierPatterns::compile(&default_identifier_patterns()).unwrap()
    }

    fn assess(frame: &Frame, scope: &IdentifierPatterns) -> DimensionAssessment {
        assess_uniqueness(
            &profile(frame, &ProfileOptions::new(Utc::now())),
            scope,
            &PenaltyWeights::default(),
        )
    }

    #[test]
    fn test_identifier_patterns() {
        let patterns = identifiers_only();
        assert!(patterns.selects("id"));
        assert!(patterns.selects("Customer_ID"));
        assert!(patterns.selects("order_number"));
        assert!(patterns.selects("row_uuid"));
        assert!(!patterns.selects("identity"));
        assert!(!patterns.selects("amount"));
    }

    #[test]
    fn test_empty_scope_selects_every_column() {
        let scope = IdentifierPatterns::default();
        assert!(scope.is_empty());
        assert!(scope.selects("amount"));
        assert!(scope.selects("email"));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let result = IdentifierPatterns::compile(&["(unclosed".to_string()]);
        assert!(matches!(
            result,
            Err(ConfigValidationError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_duplicate_identifiers_penalized() {
        let frame = FrameBuilder::new()
            .column("customer_id", ColumnKind::String)
            .column("amount", ColumnKind::Number)
            .row(vec![Value::from("C1"), Value::from(1.0)])
            .row(vec![Value::from("C1"), Value::from(2.0)])
            .row(vec![Value::from("C2"), Value::from(3.0)])
            .row(vec![Value::from("C3"), Value::from(4.0)])
            .build()
            .unwrap();
        let assessment = assess(&frame, &IdentifierPatterns::default());

        // unique_ratio 0.75 on customer_id
        assert!((assessment.score - 0.75).abs() < 0.001);
        assert_eq!(assessment.column_penalties.len(), 2);
        assert_eq!(assessment.worst_columns(), vec!["customer_id".to_string()]);
        assert_eq!(assessment.frame_penalty, Some(0.0));
    }

    #[test]
    fn test_repeated_non_identifier_column_penalized() {
        let mut builder = FrameBuilder::new()
            .column("amount", ColumnKind::Number)
            .column("email", ColumnKind::String);
        for i in 0..10 {
            builder = builder.row(vec![
                Value::from(f64::from(i)),
                Value::from("ops@example.com"),
            ]);
        }
        let assessment = assess(&builder.build().unwrap(), &IdentifierPatterns::default());

        assert!((assessment.score - 0.1).abs() < 0.001);
        assert_eq!(assessment.worst_columns(), vec!["email".to_string()]);
        assert!(assessment.covered());
    }

    #[test]
    fn test_identifier_scope_ignores_other_columns() {
        let frame = FrameBuilder::new()
            .column("txn_id", ColumnKind::String)
            .column("email", ColumnKind::String)
            .row(vec![Value::from("T1"), Value::from("a@example.com")])
            .row(vec![Value::from("T2"), Value::from("a@example.com")])
            .build()
            .unwrap();
        let assessment = assess(&frame, &identifiers_only());

        assert_eq!(assessment.column_penalties.len(), 1);
        assert_eq!(assessment.column_penalties[0].column, "txn_id");
        assert_eq!(assessment.score, 1.0);
    }

    #[test]
    fn test_duplicate_rows_penalized() {
        let frame = FrameBuilder::new()
            .column("currency", ColumnKind::String)
            .column("amount", ColumnKind::Number)
            .row(vec![Value::from("INR"), Value::from(5.0)])
            .row(vec![Value::from("INR"), Value::from(5.0)])
            .row(vec![Value::from("USD"), Value::from(7.0)])
            .row(vec![Value::from("EUR"), Value::from(9.0)])
            .build()
            .unwrap();
        let assessment = assess(&frame, &identifiers_only());

        // No identifier columns, so only the frame-level signal applies.
        assert!(assessment.column_penalties.is_empty());
        assert_eq!(assessment.frame_penalty, Some(0.25));
        assert!((assessment.score - 0.75).abs() < 0.001);
        assert!(assessment.covered());
    }

    #[test]
    fn test_all_null_column_not_applicable() {
        let frame = FrameBuilder::new()
            .column("id", ColumnKind::Number)
            .column("amount", ColumnKind::Number)
            .row(vec![Value::Null, Value::from(1.0)])
            .build()
            .unwrap();
        let assessment = assess(&frame, &IdentifierPatterns::default());

        assert_eq!(assessment.column_penalties.len(), 1);
        assert_eq!(assessment.column_penalties[0].column, "amount");
        assert_eq!(assessment.score, 1.0);
    }
}
