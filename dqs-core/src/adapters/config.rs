//! Ingestion configuration shared by all adapters.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DqsError, Result};

/// Default number of rows below which type inference scans every row.
pub const DEFAULT_FULL_SCAN_THRESHOLD: usize = 10_000;
/// Default prefix size examined by type inference on larger inputs.
pub const DEFAULT_SAMPLE_PREFIX_ROWS: usize = 1_000;
/// Default row bound for relational reads.
pub const DEFAULT_MAX_ROWS: u32 = 10_000;
/// Default deadline for a single ingestion, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Default cap on remote response bodies.
pub const DEFAULT_MAX_RESPONSE_BYTES: usize = 32 * 1024 * 1024;

/// Adapter behavior: type-inference sampling, read bounds, and timeouts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Inputs with fewer rows than this are fully scanned for type inference
    pub full_scan_threshold: usize,
    /// Rows examined for type inference on larger inputs (deterministic prefix)
    pub sample_prefix_rows: usize,
    /// Maximum rows read from a relational table
    pub max_rows: u32,
    /// Deadline for one ingestion, applied to the whole adapter call by
    /// `AuditEngine::analyze`
    pub timeout_secs: u64,
    /// Maximum accepted size of a remote response body
    pub max_response_bytes: usize,
    /// Text cells treated as null in delimited input (matched after trimming)
    pub null_markers: Vec<String>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            full_scan_threshold: DEFAULT_FULL_SCAN_THRESHOLD,
            sample_prefix_rows: DEFAULT_SAMPLE_PREFIX_ROWS,
            max_rows: DEFAULT_MAX_ROWS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_response_bytes: DEFAULT_MAX_RESPONSE_BYTES,
            null_markers: vec!["NULL".to_string(), "null".to_string(), "N/A".to_string()],
        }
    }
}

impl IngestConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the full-scan threshold.
    pub fn with_full_scan_threshold(mut self, rows: usize) -> Self {
        self.full_scan_threshold = rows;
        self
    }

    /// Builder method to set the inference prefix size.
    pub fn with_sample_prefix_rows(mut self, rows: usize) -> Self {
        self.sample_prefix_rows = rows;
        self
    }

    /// Builder method to set the relational row bound.
    pub fn with_max_rows(mut self, rows: u32) -> Self {
        self.max_rows = rows;
        self
    }

    /// Builder method to set the ingestion deadline, in whole seconds of
    /// at least one.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Builder method to set the response body cap.
    pub fn with_max_response_bytes(mut self, bytes: usize) -> Self {
        self.max_response_bytes = bytes;
        self
    }

    /// Builder method to replace the null markers.
    pub fn with_null_markers(mut self, markers: Vec<String>) -> Self {
        self.null_markers = markers;
        self
    }

    /// Ingestion deadline as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of leading rows type inference examines for an input of `total` rows.
    pub fn inference_window(&self, total: usize) -> usize {
        if total < self.full_scan_threshold {
            total
        } else {
            self.sample_prefix_rows.min(total)
        }
    }

    /// True if `cell` (already trimmed) is a null marker.
    pub fn is_null_marker(&self, cell: &str) -> bool {
        cell.is_empty() || self.null_markers.iter().any(|m| m == cell)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns `DqsError::Config` for zero-sized bounds or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.full_scan_threshold == 0 {
            return Err(DqsError::config("full_scan_threshold must be greater than 0"));
        }
        if self.sample_prefix_rows == 0 {
            return Err(DqsError::config("sample_prefix_rows must be greater than 0"));
        }
        if self.max_rows == 0 {
            return Err(DqsError::config("max_rows must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(DqsError::config("timeout_secs must be greater than 0"));
        }
        if self.max_response_bytes == 0 {
            return Err(DqsError::config("max_response_bytes must be greater than 0"));
        }
        Ok(())
    }
}
