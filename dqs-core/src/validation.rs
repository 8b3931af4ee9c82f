//! JSON Schema validation of the report wire format.
//!
//! Serialized reports are checked against an embedded schema covering both
//! the success shape (`genai_insights` with all seven dimensions) and the
//! failure shape. The schema is compiled once on first use.
//!
//! # Example
//! ```rust
//! use dqs_core::report::AuditReport;
//! use dqs_core::validation::validate_report_output;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let json = AuditReport::placeholder().to_json_value()?;
//! validate_report_output(&json)?;
//! # Ok(())
//! # }
//! ```

use jsonschema::Validator;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

use crate::report::AuditReport;

/// Report validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Validation failed with specific field errors
    #[error("Report validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Report passes the schema but violates a semantic invariant
    #[error("Inconsistent report: {reason}")]
    Inconsistent { reason: String },

    /// JSON parsing error
    #[error("JSON parsing failed: {source}")]
    JsonParsing {
        #[from]
        source: serde_json::Error,
    },
}

/// Embedded JSON Schema for the report wire format
const REPORT_SCHEMA: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Data Quality Audit Report",
  "oneOf": [
    {
      "type": "object",
      "required": ["status", "genai_insights"],
      "properties": {
        "status": { "const": "success" },
        "source": { "enum": ["live", "placeholder"] },
        "genai_insights": {
          "type": "object",
          "required": [
            "data_quality_issues",
            "remediation_actions",
            "regulatory_compliance_risks",
            "composite_dqs",
            "dimension_scores"
          ],
          "properties": {
            "data_quality_issues": {
              "type": "object",
              "required": ["Completeness", "Accuracy", "Consistency", "Validity", "Timeliness", "Uniqueness", "Integrity"],
              "additionalProperties": { "$ref": "#/$defs/issue" }
            },
            "remediation_actions": {
              "type": "array",
              "items": {
                "type": "object",
                "required": ["action", "priority", "description"],
                "properties": {
                  "action": { "type": "string", "minLength": 1 },
                  "priority": { "type": "integer", "minimum": 1 },
                  "description": { "type": "string" }
                }
              }
            },
            "regulatory_compliance_risks": {
              "type": "array",
              "items": { "type": "string" }
            },
            "composite_dqs": { "$ref": "#/$defs/score" },
            "dimension_scores": {
              "type": "object",
              "required": ["Completeness", "Accuracy", "Consistency", "Validity", "Timeliness", "Uniqueness", "Integrity"],
              "additionalProperties": { "$ref": "#/$defs/score" }
            }
          }
        },
        "dimension_coverage": {
          "type": "object",
          "additionalProperties": { "type": "boolean" }
        }
      }
    },
    {
      "type": "object",
      "required": ["status", "error_kind", "reason"],
      "properties": {
        "status": { "const": "failure" },
        "error_kind": { "type": "string", "minLength": 1 },
        "reason": { "type": "string" }
      }
    }
  ],
  "$defs": {
    "score": { "type": "number", "minimum": 0, "maximum": 1 },
    "issue": {
      "type": "object",
      "required": ["issue", "affected_columns", "description"],
      "properties": {
        "issue": { "type": "string" },
        "affected_columns": { "type": "array", "items": { "type": "string" } },
        "description": { "type": "string" }
      }
    }
  }
}"##;

/// Compiled JSON Schema instance (initialized once)
static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

fn compile_schema() -> Result<Validator, ValidationError> {
    let schema_json: Value =
        serde_json::from_str(REPORT_SCHEMA).map_err(|e| ValidationError::SchemaCompilation {
            message: format!("Failed to parse embedded schema: {}", e),
        })?;

    jsonschema::validator_for(&schema_json).map_err(|e| ValidationError::SchemaCompilation {
        message: format!("Schema compilation error: {}", e),
    })
}

fn validator() -> Result<&'static Validator, ValidationError> {
    if let Some(compiled) = COMPILED_SCHEMA.get() {
        return Ok(compiled);
    }
    let compiled = compile_schema()?;
    Ok(COMPILED_SCHEMA.get_or_init(|| compiled))
}

/// Validates a serialized report (success or failure) against the schema.
///
/// Success reports are additionally checked for contiguous priorities.
///
/// # Errors
/// Returns `ValidationError::ValidationFailed` listing every schema
/// violation, or `ValidationError::Inconsistent` for semantic defects.
pub fn validate_report_output(json_value: &Value) -> Result<(), ValidationError> {
    let schema = validator()?;

    let errors: Vec<String> = schema
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        });
    }

    if json_value.get("status").and_then(Value::as_str) == Some("success") {
        validate_priorities(json_value)?;
    }

    Ok(())
}

fn validate_priorities(json_value: &Value) -> Result<(), ValidationError> {
    let priorities: Vec<u64> = json_value
        .pointer("/genai_insights/remediation_actions")
        .and_then(Value::as_array)
        .map(|actions| {
            actions
                .iter()
                .filter_map(|a| a.get("priority").and_then(Value::as_u64))
                .collect()
        })
        .unwrap_or_default();

    let mut sorted = priorities.clone();
    sorted.sort_unstable();
    let contiguous = sorted
        .iter()
        .zip(1_u64..)
        .all(|(priority, expected)| *priority == expected);
    if !contiguous {
        return Err(ValidationError::Inconsistent {
            reason: format!(
                "remediation priorities {:?} are not contiguous from 1",
                priorities
            ),
        });
    }
    Ok(())
}

/// Parses, validates, and deserializes a success report.
///
/// # Errors
/// Returns validation errors for malformed JSON, schema violations, or a
/// failure-shaped document.
pub fn validate_and_parse_report(json_str: &str) -> Result<AuditReport, ValidationError> {
    let json_value: Value = serde_json::from_str(json_str)?;
    validate_report_output(&json_value)?;
    let report: AuditReport = serde_json::from_value(json_value)?;
    Ok(report)
}
