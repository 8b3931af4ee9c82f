//! Data quality scoring.
//!
//! This module turns a canonical frame into dimension scores, issues, and a
//! composite score:
//! - **Profiler**: raw per-column statistics
//! - **Dimension rules**: Completeness, Accuracy, Consistency, Validity,
//!   Timeliness, Uniqueness, Integrity
//! - **Synthesizer**: issues and prioritized remediation
//! - **Aggregator**: composite score and regulatory risk narratives
//!
//! Every stage after ingestion is pure and total over any valid frame.
//! Statistics expose counts and ratios only, never data values.
//!
//! # Example
//! ```rust,ignore
//! use dqs_core::quality::{AuditConfig, ProfileOptions, profile};
//!
//! let stats = profile(&frame, &ProfileOptions::new(chrono::Utc::now()));
//! println!("{} duplicate rows", stats.duplicate_row_count);
//! ```

mod accuracy;
mod aggregator;
mod completeness;
mod config;
mod consistency;
mod integrity;
mod models;
mod profiler;
mod scorer;
mod synthesizer;
mod timeliness;
mod uniqueness;
mod validity;

// Re-export public API
pub use aggregator::{RiskRules, aggregate, composite_score};
pub use config::{
    AuditConfig, ColumnRelation, ConfigValidationError, DimensionWeights, IssueThresholds,
    PenaltyWeights, RiskRule, WEIGHT_SUM_TOLERANCE, default_identifier_patterns,
    default_risk_rules,
};
pub use models::{
    ColumnPenalty, ColumnStats, Dimension, DimensionAssessment, FrameProfile, ScoreCard, ratio,
    round_to,
};
pub use profiler::{ProfileOptions, count_casing_variants, profile};
pub use scorer::score_dimensions;
pub use synthesizer::{Synthesis, format_ratio, join_names, synthesize};
pub use uniqueness::IdentifierPatterns;
