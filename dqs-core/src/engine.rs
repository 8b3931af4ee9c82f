//! Audit engine facade.
//!
//! Orchestrates the pipeline: ingestion, profiling, dimension scoring,
//! synthesis, and aggregation. Configuration is validated and its patterns
//! compiled once in [`AuditEngine::new`]; afterwards the engine holds only
//! immutable state and can be shared across concurrent invocations.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::Result;
use crate::adapters::SourceDescriptor;
use crate::frame::Frame;
use crate::quality::{
    AuditConfig, FrameProfile, IdentifierPatterns, ProfileOptions, RiskRules, aggregate, profile,
    score_dimensions, synthesize,
};
use crate::report::AuditReport;

/// Data quality audit engine.
///
/// # Example
///
/// ```rust,no_run
/// use dqs_core::adapters::{FileSource, SourceDescriptor};
/// use dqs_core::engine::AuditEngine;
///
/// # async fn example() -> dqs_core::Result<()> {
/// let engine = AuditEngine::with_defaults()?;
/// let source = SourceDescriptor::from(FileSource::from_path("transactions.csv").await?);
/// let report = engine.analyze(&source).await?;
/// println!("Composite DQS: {:.2}", report.composite_dqs());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AuditEngine {
    config: AuditConfig,
    identifiers: IdentifierPatterns,
    risks: RiskRules,
}

impl AuditEngine {
    /// Creates an engine, validating the configuration.
    ///
    /// # Errors
    /// Returns `DqsError::Config` for invalid weights, thresholds, ingestion
    /// bounds, or regex patterns.
    pub fn new(config: AuditConfig) -> Result<Self> {
        config.validate()?;
        config.ingest.validate()?;
        let identifiers = IdentifierPatterns::compile(&config.identifier_patterns)?;
        let risks = RiskRules::compile(&config.risk_rules)?;

        tracing::debug!(
            "Audit engine ready: {} identifier patterns, {} risk rules, {} relations",
            config.identifier_patterns.len(),
            config.risk_rules.len(),
            config.relations.len()
        );

        Ok(Self {
            config,
            identifiers,
            risks,
        })
    }

    /// Creates an engine with default configuration.
    ///
    /// # Errors
    /// Only fails if the built-in defaults are invalid.
    pub fn with_defaults() -> Result<Self> {
        Self::new(AuditConfig::default())
    }

    /// Returns a reference to the engine configuration.
    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        self.config.reference_time.unwrap_or_else(Utc::now)
    }

    /// Ingests `source` and audits it. Ingestion is bounded by the
    /// configured `ingest.timeout_secs`.
    ///
    /// # Errors
    /// Propagates ingestion errors, including `DqsError::Timeout`; no
    /// partial report is produced.
    pub async fn analyze(&self, source: &SourceDescriptor) -> Result<AuditReport> {
        self.analyze_with_deadline(source, self.config.ingest.timeout())
            .await
    }

    /// Like [`AuditEngine::analyze`], aborting ingestion after `deadline`
    /// instead of the configured timeout.
    ///
    /// # Errors
    /// Returns `DqsError::Timeout` when the deadline is hit.
    pub async fn analyze_with_deadline(
        &self,
        source: &SourceDescriptor,
        deadline: Duration,
    ) -> Result<AuditReport> {
        tracing::info!("Analyzing {} (deadline {:?})", source.describe(), deadline);
        let frame = source.load_with_deadline(&self.config.ingest, deadline).await?;
        Ok(self.analyze_frame(&frame, self.now()))
    }

    /// Profiles a frame with this engine's options.
    pub fn profile_frame(&self, frame: &Frame, now: DateTime<Utc>) -> FrameProfile {
        let options = ProfileOptions::new(now)
            .with_staleness_horizon(self.config.staleness_horizon())
            .with_relations(self.config.relations.clone());
        profile(frame, &options)
    }

    /// Audits an already-loaded frame. Pure: the same frame, configuration,
    /// and `now` always produce the same report.
    pub fn analyze_frame(&self, frame: &Frame, now: DateTime<Utc>) -> AuditReport {
        tracing::debug!(
            "Scoring {} frame with {} rows and {} columns",
            frame.source_kind(),
            frame.row_count(),
            frame.column_count()
        );

        let profile = self.profile_frame(frame, now);
        let card = score_dimensions(&profile, &self.config.penalties, &self.identifiers);
        let synthesis = synthesize(&profile, &card, &self.config.thresholds);
        aggregate(&card, synthesis, &self.risks, &self.config.weights)
    }
}

/// Single-call entry point: builds an engine from `config` and analyzes
/// `source`.
///
/// # Errors
/// Returns `DqsError::Config` for invalid configuration, otherwise the
/// ingestion errors of the source.
pub async fn analyze(source: &SourceDescriptor, config: AuditConfig) -> Result<AuditReport> {
    AuditEngine::new(config)?.analyze(source).await
}
