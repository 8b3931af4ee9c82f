//! Ingestion adapters.
//!
//! Every source kind converges on the same [`Frame`] contract; adding a
//! source means adding a [`SourceDescriptor`] variant and its loader.
//!
//! # Module Structure
//! - `config`: sampling, bounds, and timeout settings ([`IngestConfig`])
//! - `inference`: type inference and coercion for textual cells
//! - `file`: delimited text
//! - `table`: relational tables (SQLite, PostgreSQL)
//! - `endpoint`: remote JSON arrays

pub mod config;
pub mod endpoint;
pub mod file;
pub mod inference;
pub mod table;

use std::time::Duration;

pub use config::IngestConfig;
pub use endpoint::{EndpointSource, frame_from_json};
pub use file::FileSource;
pub use table::{DatabaseType, TableReader, TableSource, create_reader, detect_database_type};

use crate::error::{DqsError, Result, redact_database_url};
use crate::frame::{Frame, SourceKind};

/// What to ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// Delimited text
    File(FileSource),
    /// Relational table
    Table(TableSource),
    /// Remote JSON array
    Endpoint(EndpointSource),
}

impl From<FileSource> for SourceDescriptor {
    fn from(source: FileSource) -> Self {
        Self::File(source)
    }
}

impl From<TableSource> for SourceDescriptor {
    fn from(source: TableSource) -> Self {
        Self::Table(source)
    }
}

impl From<EndpointSource> for SourceDescriptor {
    fn from(source: EndpointSource) -> Self {
        Self::Endpoint(source)
    }
}

impl SourceDescriptor {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::File(_) => SourceKind::File,
            Self::Table(_) => SourceKind::Table,
            Self::Endpoint(_) => SourceKind::Endpoint,
        }
    }

    /// Log-safe description of the source.
    pub fn describe(&self) -> String {
        match self {
            Self::File(file) => format!("file ({} bytes)", file.bytes.len()),
            Self::Table(table) => format!(
                "table {} at {}",
                table.table,
                redact_database_url(&table.connection)
            ),
            Self::Endpoint(endpoint) => {
                format!("endpoint {}", redact_database_url(&endpoint.url))
            }
        }
    }

    /// Loads the source into a frame.
    ///
    /// # Errors
    /// - `DqsError::Parse` for malformed delimited input
    /// - `DqsError::Connection` / `DqsError::Schema` for table sources
    /// - `DqsError::Fetch` / `DqsError::Shape` for endpoints
    pub async fn load(&self, config: &IngestConfig) -> Result<Frame> {
        match self {
            Self::File(file) => file::load_file(file, config),
            Self::Table(table) => table::load_table(table, config).await,
            Self::Endpoint(endpoint) => endpoint::load_endpoint(endpoint, config).await,
        }
    }

    /// Loads the source, aborting once `deadline` elapses.
    ///
    /// # Errors
    /// Returns `DqsError::Timeout` when the deadline is hit, otherwise the
    /// errors of [`SourceDescriptor::load`].
    pub async fn load_with_deadline(
        &self,
        config: &IngestConfig,
        deadline: Duration,
    ) -> Result<Frame> {
        match tokio::time::timeout(deadline, self.load(config)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("Ingestion of {} aborted after {:?}", self.describe(), deadline);
                Err(DqsError::timeout(
                    format!("{} ingestion", self.kind()),
                    deadline,
                ))
            }
        }
    }
}
