//! Core library for DQS, the data quality scoring engine.
//!
//! Ingests tabular data from delimited files, relational tables, or JSON
//! endpoints, normalizes it into a canonical [`frame::Frame`], and produces
//! a deterministic audit report: seven dimension scores, a composite score,
//! issues, prioritized remediation, and regulatory risk narratives.
//!
//! # Guarantees
//! - Same frame, configuration, and reference time always yield the same report
//! - Source data is only read, never modified
//! - Reports and logs carry counts, ratios, and column names, never cell values
//! - Connection strings are redacted in every error and log message
//!
//! # Architecture
//! - `adapters`: one loader per source kind, all converging on `Frame`
//! - `quality`: profiler, dimension rules, synthesizer, aggregator
//! - `engine`: the [`AuditEngine`] facade driving the pipeline
//! - `report` / `context`: the wire format and its bounded text rendering

pub mod adapters;
pub mod context;
pub mod engine;
pub mod error;
pub mod frame;
pub mod logging;
pub mod quality;
pub mod report;
pub mod validation;

// Re-export commonly used types
pub use adapters::{
    DatabaseType, EndpointSource, FileSource, IngestConfig, SourceDescriptor, TableSource,
};
pub use context::build_context;
pub use engine::{AuditEngine, analyze};
pub use error::{DqsError, Result};
pub use frame::{ColumnKind, ColumnSchema, Frame, FrameBuilder, SourceKind, Value};
pub use quality::{AuditConfig, Dimension};
pub use report::{
    AuditReport, FailureReport, GenAiInsights, QualityIssue, RemediationAction, ReportSource,
    ReportStatus,
};
pub use validation::{ValidationError, validate_and_parse_report, validate_report_output};
