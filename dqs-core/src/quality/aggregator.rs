//! Composite score, regulatory risks, and final report assembly.

use regex::{Regex, RegexBuilder};
use std::collections::{BTreeMap, HashSet};

use crate::report::{AuditReport, GenAiInsights, QualityIssue};

use super::config::{ConfigValidationError, DimensionWeights, RiskRule};
use super::models::{Dimension, ScoreCard, round_to};
use super::synthesizer::Synthesis;

#[derive(Debug, Clone)]
struct CompiledRiskRule {
    pattern: Regex,
    dimensions: Vec<Dimension>,
    narrative: String,
}

/// Risk rules with compiled, case-insensitive column patterns.
#[derive(Debug, Clone)]
pub struct RiskRules {
    rules: Vec<CompiledRiskRule>,
}

impl RiskRules {
    /// Compiles the configured rules in order.
    ///
    /// # Errors
    /// Returns `ConfigValidationError::InvalidPattern` for malformed regexes.
    pub fn compile(rules: &[RiskRule]) -> Result<Self, ConfigValidationError> {
        let rules = rules
            .iter()
            .map(|rule| {
                let pattern = RegexBuilder::new(&rule.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigValidationError::InvalidPattern {
                        pattern: rule.pattern.clone(),
                        message: e.to_string(),
                    })?;
                Ok(CompiledRiskRule {
                    pattern,
                    dimensions: rule.dimensions.clone(),
                    narrative: rule.narrative.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigValidationError>>()?;
        Ok(Self { rules })
    }

    /// Narratives for every (rule, breaching dimension, affected column)
    /// match, walked in rule order, then canonical dimension order, then
    /// column order. Repeated narratives are emitted once.
    pub fn evaluate(&self, issues: &BTreeMap<Dimension, QualityIssue>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut narratives = Vec::new();

        for rule in &self.rules {
            for dimension in Dimension::ALL {
                if !rule.dimensions.contains(&dimension) {
                    continue;
                }
                let Some(issue) = issues.get(&dimension) else {
                    continue;
                };
                for column in &issue.affected_columns {
                    if !rule.pattern.is_match(column) {
                        continue;
                    }
                    let narrative = rule
                        .narrative
                        .replace("{column}", column)
                        .replace("{dimension}", dimension.as_str());
                    if seen.insert(narrative.clone()) {
                        narratives.push(narrative);
                    }
                }
            }
        }

        narratives
    }
}

/// Weighted mean of dimension scores rounded to two decimals.
pub fn composite_score(scores: &BTreeMap<Dimension, f64>, weights: &DimensionWeights) -> f64 {
    let weighted: f64 = Dimension::ALL
        .iter()
        .map(|d| weights.weight(*d) * scores.get(d).copied().unwrap_or(1.0))
        .sum();
    round_to(weighted, 2).clamp(0.0, 1.0)
}

/// Assembles the final report.
pub fn aggregate(
    card: &ScoreCard,
    synthesis: Synthesis,
    risks: &RiskRules,
    weights: &DimensionWeights,
) -> AuditReport {
    let dimension_scores = card.scores();
    let composite_dqs = composite_score(&dimension_scores, weights);
    let regulatory_compliance_risks = risks.evaluate(&synthesis.issues);

    tracing::info!(
        "Composite DQS {:.2} with {} remediation actions and {} regulatory risks",
        composite_dqs,
        synthesis.remediation.len(),
        regulatory_compliance_risks.len()
    );

    AuditReport::live(
        GenAiInsights {
            data_quality_issues: synthesis.issues,
            remediation_actions: synthesis.remediation,
            regulatory_compliance_risks,
            composite_dqs,
            dimension_scores,
        },
        card.coverage(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::config::default_risk_rules;

    fn issue(columns: &[&str]) -> QualityIssue {
        QualityIssue::new(
            "issue",
            columns.iter().map(|c| c.to_string()).collect(),
            "description",
        )
    }

    #[test]
    fn test_composite_equal_weights() {
        let mut scores: BTreeMap<Dimension, f64> =
            Dimension::ALL.iter().map(|d| (*d, 1.0)).collect();
        scores.insert(Dimension::Completeness, 0.3);
        let composite = composite_score(&scores, &DimensionWeights::default());
        assert!((composite - 0.9).abs() < 0.001);
    }

    #[test]
    fn test_composite_custom_weights() {
        let scores: BTreeMap<Dimension, f64> = Dimension::ALL
            .iter()
            .map(|d| (*d, if *d == Dimension::Validity { 0.5 } else { 1.0 }))
            .collect();
        let weights = DimensionWeights::from_overrides([
            (Dimension::Validity, 0.5),
            (Dimension::Completeness, 0.5),
        ]);
        assert!((composite_score(&scores, &weights) - 0.75).abs() < 0.001);
    }

    #[test]
    fn test_risk_narratives() {
        let rules = RiskRules::compile(&default_risk_rules()).unwrap();
        let issues = BTreeMap::from([
            (Dimension::Completeness, issue(&["customer_id", "kyc_address"])),
            (Dimension::Accuracy, issue(&[])),
            (Dimension::Timeliness, issue(&["txn_timestamp"])),
        ]);

        let narratives = rules.evaluate(&issues);

        assert_eq!(narratives.len(), 4);
        assert!(narratives[0].contains("customer_id"));
        assert!(narratives[0].contains("Completeness"));
        assert!(narratives[1].contains("kyc_address"));
        assert!(narratives.iter().any(|n| n.contains("txn_timestamp")));
    }

    #[test]
    fn test_risk_narratives_deduplicated() {
        let rules = RiskRules::compile(&[
            RiskRule::new("amount", vec![Dimension::Completeness], "Reporting risk."),
            RiskRule::new("fee", vec![Dimension::Completeness], "Reporting risk."),
        ])
        .unwrap();
        let issues = BTreeMap::from([(Dimension::Completeness, issue(&["amount", "fee"]))]);

        assert_eq!(rules.evaluate(&issues), vec!["Reporting risk.".to_string()]);
    }

    #[test]
    fn test_invalid_risk_pattern() {
        let result = RiskRules::compile(&[RiskRule::new(
            "[",
            vec![Dimension::Completeness],
            "text",
        )]);
        assert!(result.is_err());
    }
}
