//! Relational table adapter.
//!
//! # Module Structure
//! - `type_mapping`: native column types to canonical [`ColumnKind`]s
//! - `sqlite`: SQLite reader (`PRAGMA table_info` metadata)
//! - `postgres`: PostgreSQL reader (`information_schema` metadata)
//!
//! # Guarantees
//! - Reads are bounded (`LIMIT max_rows`) and never write
//! - Bounded reads are ordered, so the sampled rows are stable: by primary
//!   key when the table has one, otherwise by every projected column
//! - Identifiers are validated and quoted before they reach SQL
//! - Connection strings are redacted in every error and log line

pub mod type_mapping;

#[cfg(feature = "postgresql")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

use async_trait::async_trait;
use std::fmt;

use super::config::IngestConfig;
use crate::error::{DqsError, Result, redact_database_url};
use crate::frame::{ColumnKind, Frame};

/// A database table to audit.
#[derive(Clone, PartialEq, Eq)]
pub struct TableSource {
    /// Connection URL (`sqlite://...`, `postgres://...`)
    pub connection: String,
    /// Table identifier, optionally schema-qualified (`schema.table`)
    pub table: String,
}

impl fmt::Debug for TableSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableSource")
            .field("connection", &redact_database_url(&self.connection))
            .field("table", &self.table)
            .finish()
    }
}

impl TableSource {
    /// Creates a table source from a connection URL and table identifier.
    pub fn new(connection: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            table: table.into(),
        }
    }
}

/// Supported relational backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseType {
    /// `postgres://` or `postgresql://`
    PostgreSQL,
    /// `sqlite:`
    SQLite,
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PostgreSQL => f.write_str("PostgreSQL"),
            Self::SQLite => f.write_str("SQLite"),
        }
    }
}

/// Detects the backend from the connection URL scheme.
///
/// # Errors
/// Returns `DqsError::Connection` for unrecognized schemes.
pub fn detect_database_type(connection_string: &str) -> Result<DatabaseType> {
    let lower = connection_string.to_ascii_lowercase();
    if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
        Ok(DatabaseType::PostgreSQL)
    } else if lower.starts_with("sqlite:") {
        Ok(DatabaseType::SQLite)
    } else {
        Err(DqsError::connection(format!(
            "unsupported connection scheme in {}",
            redact_database_url(connection_string)
        )))
    }
}

/// A validated, optionally schema-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    /// Schema qualifier, if given
    pub schema: Option<String>,
    /// Bare table name
    pub name: String,
}

fn is_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Double-quotes an identifier, escaping embedded quotes.
pub(crate) fn quote_identifier(part: &str) -> String {
    format!("\"{}\"", part.replace('"', "\"\""))
}

impl TableName {
    /// Parses `table` or `schema.table`.
    ///
    /// # Errors
    /// Returns `DqsError::Schema` if either part is not a plain identifier.
    pub fn parse(identifier: &str) -> Result<Self> {
        let identifier = identifier.trim();
        let (schema, name) = match identifier.split_once('.') {
            Some((schema, name)) => (Some(schema), name),
            None => (None, identifier),
        };

        if !is_identifier(name) || schema.is_some_and(|s| !is_identifier(s)) {
            return Err(DqsError::schema(format!(
                "invalid table identifier '{}'",
                identifier
            )));
        }

        Ok(Self {
            schema: schema.map(str::to_string),
            name: name.to_string(),
        })
    }

    /// Quoted identifier for use in SQL.
    pub fn quoted(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{}.{}", quote_identifier(schema), quote_identifier(&self.name)),
            None => quote_identifier(&self.name),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.schema {
            Some(schema) => write!(f, "{}.{}", schema, self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// Native column as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeColumn {
    pub name: String,
    /// Declared type as the catalog spells it
    pub native_type: String,
    /// Canonical kind mapped from `native_type`
    pub kind: ColumnKind,
    /// 1-based position within the primary key
    pub key_position: Option<u32>,
}

/// `ORDER BY` clause for a bounded read of `columns`.
///
/// Primary-key columns are used in key order. Without a key, rows are
/// ordered by every projected column by position, which also covers views.
pub(crate) fn order_by_clause(columns: &[NativeColumn]) -> String {
    let mut keyed: Vec<(u32, &str)> = columns
        .iter()
        .filter_map(|c| c.key_position.map(|position| (position, c.name.as_str())))
        .collect();

    if keyed.is_empty() {
        let positions = (1..=columns.len())
            .map(|position| position.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        return format!("ORDER BY {}", positions);
    }

    keyed.sort_by_key(|(position, _)| *position);
    let keys = keyed
        .iter()
        .map(|(_, name)| quote_identifier(name))
        .collect::<Vec<_>>()
        .join(", ");
    format!("ORDER BY {}", keys)
}

/// Backend-specific table reader.
///
/// Object safe, so readers are handed out as `Box<dyn TableReader>`.
#[async_trait]
pub trait TableReader: Send + Sync {
    /// Lists the table's columns in ordinal order.
    ///
    /// # Errors
    /// `DqsError::Schema` if the table is unknown or has no columns.
    async fn describe(&self, table: &TableName) -> Result<Vec<NativeColumn>>;

    /// Reads at most `limit` rows of the described columns into a frame,
    /// ordered by primary key (or by every column when there is none).
    async fn read(&self, table: &TableName, columns: &[NativeColumn], limit: u32) -> Result<Frame>;

    /// Backend handled by this reader.
    fn database_type(&self) -> DatabaseType;

    /// Releases the underlying connection.
    async fn close(&self);
}

/// Opens a reader for the connection string's backend.
///
/// # Errors
/// Returns `DqsError::Connection` if the scheme is unsupported, the backend
/// is not compiled in, or the database is unreachable.
pub async fn create_reader(
    connection_string: &str,
    config: &IngestConfig,
) -> Result<Box<dyn TableReader>> {
    match detect_database_type(connection_string)? {
        #[cfg(feature = "postgresql")]
        DatabaseType::PostgreSQL => Ok(Box::new(
            postgres::PostgresReader::connect(connection_string, config).await?,
        )),
        #[cfg(not(feature = "postgresql"))]
        DatabaseType::PostgreSQL => Err(DqsError::connection(
            "PostgreSQL support not compiled in (enable the postgresql feature)",
        )),
        #[cfg(feature = "sqlite")]
        DatabaseType::SQLite => Ok(Box::new(
            sqlite::SqliteReader::connect(connection_string, config).await?,
        )),
        #[cfg(not(feature = "sqlite"))]
        DatabaseType::SQLite => Err(DqsError::connection(
            "SQLite support not compiled in (enable the sqlite feature)",
        )),
    }
}

/// Reads a bounded snapshot of a table into a frame.
pub(crate) async fn load_table(source: &TableSource, config: &IngestConfig) -> Result<Frame> {
    let table = TableName::parse(&source.table)?;
    let reader = create_reader(&source.connection, config).await?;

    tracing::debug!(
        "Reading up to {} rows from {} table {}",
        config.max_rows,
        reader.database_type(),
        table
    );

    let result = match reader.describe(&table).await {
        Ok(columns) => reader.read(&table, &columns, config.max_rows).await,
        Err(e) => Err(e),
    };
    reader.close().await;
    result
}
