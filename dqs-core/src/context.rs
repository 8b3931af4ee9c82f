//! Bounded textual rendering of a report for an external assistant.
//!
//! The output is a pure function of the report and the budget. When the
//! full text exceeds `max_chars`, entries are dropped in this order:
//! remediation (lowest priority first), regulatory risks (last first),
//! clean-dimension lines (last first). A final hard cut ends with `…`.
//! Budgets are counted in characters, not bytes.

use crate::quality::{Dimension, format_ratio};
use crate::report::AuditReport;

const ELLIPSIS: char = '…';

struct IssueLine {
    text: String,
    clean: bool,
}

struct ContextParts {
    header: Vec<String>,
    issues: Vec<IssueLine>,
    remediation: Vec<String>,
    risks: Vec<String>,
}

impl ContextParts {
    fn from_report(report: &AuditReport) -> Self {
        let mut header = vec![if report.is_placeholder() {
            "Data quality audit (PLACEHOLDER demo report, not computed from data)".to_string()
        } else {
            "Data quality audit".to_string()
        }];
        header.push(format!("Composite DQS: {:.2}", report.composite_dqs()));
        header.push("Dimension scores:".to_string());
        for dimension in Dimension::ALL {
            if let Some(score) = report.dimension_scores().get(&dimension) {
                header.push(format!("- {}: {}", dimension, format_ratio(*score)));
            }
        }

        let issues = Dimension::ALL
            .iter()
            .filter_map(|dimension| {
                let issue = report.issues().get(dimension)?;
                let text = if issue.is_actionable() {
                    format!(
                        "- {}: {} [{}] {}",
                        dimension,
                        issue.issue,
                        issue.affected_columns.join(", "),
                        issue.description
                    )
                } else {
                    format!("- {}: {}", dimension, issue.issue)
                };
                Some(IssueLine {
                    text,
                    clean: !issue.is_actionable(),
                })
            })
            .collect();

        let mut actions = report.remediation_actions().to_vec();
        actions.sort_by_key(|a| a.priority);
        let remediation = actions
            .iter()
            .map(|a| format!("{}. {}: {}", a.priority, a.action, a.description))
            .collect();

        let risks = report
            .regulatory_compliance_risks()
            .iter()
            .map(|r| format!("- {}", r))
            .collect();

        Self {
            header,
            issues,
            remediation,
            risks,
        }
    }

    fn render(&self) -> String {
        let mut lines: Vec<&str> = self.header.iter().map(String::as_str).collect();
        if !self.issues.is_empty() {
            lines.push("Issues:");
            lines.extend(self.issues.iter().map(|i| i.text.as_str()));
        }
        if !self.remediation.is_empty() {
            lines.push("Remediation:");
            lines.extend(self.remediation.iter().map(String::as_str));
        }
        if !self.risks.is_empty() {
            lines.push("Regulatory risks:");
            lines.extend(self.risks.iter().map(String::as_str));
        }
        lines.join("\n")
    }

    /// Drops the next entry in truncation order; false when nothing is left.
    fn drop_one(&mut self) -> bool {
        if self.remediation.pop().is_some() || self.risks.pop().is_some() {
            return true;
        }
        if let Some(position) = self.issues.iter().rposition(|i| i.clean) {
            self.issues.remove(position);
            return true;
        }
        false
    }
}

/// Renders `report` as text of at most `max_chars` characters.
pub fn build_context(report: &AuditReport, max_chars: usize) -> String {
    let mut parts = ContextParts::from_report(report);
    let mut text = parts.render();

    while text.chars().count() > max_chars && parts.drop_one() {
        text = parts.render();
    }

    if text.chars().count() <= max_chars {
        return text;
    }
    if max_chars == 0 {
        return String::new();
    }

    tracing::debug!("Context hard-cut to {} characters", max_chars);
    let mut cut: String = text.chars().take(max_chars - 1).collect();
    cut.push(ELLIPSIS);
    cut
}
