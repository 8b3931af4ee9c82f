//! SQLite table reader.
//!
//! Databases are opened read-only over a single connection. SQLite is
//! dynamically typed, so each cell is decoded by trying the storage classes
//! that can represent the column's canonical kind; cells that fit none are
//! nulled and counted as rejected.
//!
//! Bounded reads order by the primary key reported in `PRAGMA table_info`
//! (for `INTEGER PRIMARY KEY` tables this is the rowid), or by every column
//! when the table has no key.

use async_trait::async_trait;
use base64::Engine;
use chrono::DateTime;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool, ValueRef};
use std::str::FromStr;

use super::type_mapping::map_sqlite_type;
use super::{
    DatabaseType, NativeColumn, TableName, TableReader, order_by_clause, quote_identifier,
};
use crate::adapters::config::IngestConfig;
use crate::adapters::inference::{coerce_text, parse_number, parse_timestamp};
use crate::error::{DqsError, Result, redact_database_url};
use crate::frame::{ColumnKind, ColumnSchema, Frame, SourceKind, Value};

/// Read-only SQLite reader.
pub struct SqliteReader {
    pool: SqlitePool,
}

impl std::fmt::Debug for SqliteReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteReader").finish_non_exhaustive()
    }
}

impl SqliteReader {
    /// Opens a read-only connection.
    ///
    /// # Connection String Formats
    /// - `sqlite:///path/to/database.db` - Absolute file path
    /// - `sqlite://relative/path.db` - Relative file path
    ///
    /// # Errors
    /// Returns `DqsError::Connection` if the string is malformed or the
    /// database cannot be opened.
    pub async fn connect(connection_string: &str, config: &IngestConfig) -> Result<Self> {
        let redacted = redact_database_url(connection_string);
        let options = SqliteConnectOptions::from_str(connection_string)
            .map_err(|e| {
                DqsError::connection_failed(format!("invalid SQLite URL {}", redacted), e)
            })?
            .read_only(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.timeout())
            .connect_with(options)
            .await
            .map_err(|e| DqsError::connection_failed(format!("cannot open {}", redacted), e))?;

        Ok(Self { pool })
    }
}

/// Decodes one cell; `None` means a non-null cell that does not fit `kind`.
fn extract_cell(row: &SqliteRow, index: usize, kind: ColumnKind) -> Option<Value> {
    let raw = row.try_get_raw(index).ok()?;
    if raw.is_null() {
        return Some(Value::Null);
    }

    match kind {
        ColumnKind::Number => row
            .try_get::<i64, _>(index)
            .ok()
            .map(|n| n as f64)
            .or_else(|| row.try_get::<f64, _>(index).ok())
            .or_else(|| {
                row.try_get::<String, _>(index)
                    .ok()
                    .and_then(|s| parse_number(&s))
            })
            .filter(|n| n.is_finite())
            .map(Value::Number),
        ColumnKind::Timestamp => row
            .try_get::<String, _>(index)
            .ok()
            .and_then(|s| parse_timestamp(&s))
            .or_else(|| {
                row.try_get::<i64, _>(index)
                    .ok()
                    .and_then(|secs| DateTime::from_timestamp(secs, 0))
            })
            .map(Value::Timestamp),
        ColumnKind::Boolean => row
            .try_get::<i64, _>(index)
            .ok()
            .map(|n| Value::Boolean(n != 0))
            .or_else(|| {
                row.try_get::<String, _>(index)
                    .ok()
                    .and_then(|s| coerce_text(&s, ColumnKind::Boolean))
            }),
        ColumnKind::String => row
            .try_get::<String, _>(index)
            .ok()
            .or_else(|| row.try_get::<i64, _>(index).ok().map(|n| n.to_string()))
            .or_else(|| row.try_get::<f64, _>(index).ok().map(|n| n.to_string()))
            .or_else(|| {
                row.try_get::<Vec<u8>, _>(index).ok().map(|bytes| {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
                    format!("base64:{}", encoded)
                })
            })
            .map(Value::String),
    }
}

#[async_trait]
impl TableReader for SqliteReader {
    async fn describe(&self, table: &TableName) -> Result<Vec<NativeColumn>> {
        let query = match &table.schema {
            Some(schema) => format!(
                "PRAGMA {}.table_info({})",
                quote_identifier(schema),
                quote_identifier(&table.name)
            ),
            None => format!("PRAGMA table_info({})", quote_identifier(&table.name)),
        };

        let rows = sqlx::query(&query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DqsError::schema(format!("cannot describe table {}: {}", table, e)))?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row
                .try_get("name")
                .map_err(|e| DqsError::schema(format!("unreadable column name: {}", e)))?;
            let native_type: String = row.try_get("type").unwrap_or_default();
            let kind = map_sqlite_type(&native_type);
            // `pk` is 0 for non-key columns, otherwise the 1-based key position
            let pk: i64 = row.try_get("pk").unwrap_or_default();
            let key_position = u32::try_from(pk).ok().filter(|position| *position > 0);
            columns.push(NativeColumn {
                name,
                native_type,
                kind,
                key_position,
            });
        }

        if columns.is_empty() {
            return Err(DqsError::schema(format!(
                "table {} does not exist or has no columns",
                table
            )));
        }

        Ok(columns)
    }

    async fn read(&self, table: &TableName, columns: &[NativeColumn], limit: u32) -> Result<Frame> {
        let projection = columns
            .iter()
            .map(|c| quote_identifier(&c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT {} FROM {} {} LIMIT ?",
            projection,
            table.quoted(),
            order_by_clause(columns)
        );

        let rows = sqlx::query(&query)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DqsError::connection_failed(format!("failed to read table {}", table), e))?;

        let mut rejected = vec![0_usize; columns.len()];
        let values: Vec<Vec<Value>> = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(rejected.iter_mut())
                    .enumerate()
                    .map(|(index, (column, rejected))| {
                        extract_cell(row, index, column.kind).unwrap_or_else(|| {
                            *rejected += 1;
                            Value::Null
                        })
                    })
                    .collect()
            })
            .collect();

        let schemas = columns
            .iter()
            .zip(&rejected)
            .map(|(column, rejected)| {
                ColumnSchema::new(column.name.clone(), column.kind).with_rejected_values(*rejected)
            })
            .collect();

        tracing::debug!("Read {} rows from SQLite table {}", values.len(), table);

        Frame::new(schemas, values, SourceKind::Table)
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
