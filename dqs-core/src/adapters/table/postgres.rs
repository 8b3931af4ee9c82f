//! PostgreSQL table reader.
//!
//! Every session is forced read-only, UTC, and carries a statement timeout.
//! Values are cast server-side to one SQL type per canonical kind so that
//! decoding never depends on the native type.
//!
//! Bounded reads order by the primary key found in `pg_index`, or by every
//! projected column when the relation has none (views included).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{Executor, PgPool, Row};

use super::type_mapping::map_postgres_type;
use super::{
    DatabaseType, NativeColumn, TableName, TableReader, order_by_clause, quote_identifier,
};
use crate::adapters::config::IngestConfig;
use crate::error::{DqsError, Result, redact_database_url};
use crate::frame::{ColumnKind, ColumnSchema, Frame, SourceKind, Value};

const DEFAULT_SCHEMA: &str = "public";

/// Read-only PostgreSQL reader over a single pooled connection.
pub struct PostgresReader {
    pool: PgPool,
}

impl std::fmt::Debug for PostgresReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresReader").finish_non_exhaustive()
    }
}

impl PostgresReader {
    /// Connects and configures the session.
    ///
    /// # Errors
    /// Returns `DqsError::Connection` if the server is unreachable or
    /// rejects the credentials.
    pub async fn connect(connection_string: &str, config: &IngestConfig) -> Result<Self> {
        let statement_timeout_secs = config.timeout_secs;

        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.timeout())
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    conn.execute(
                        format!("SET statement_timeout = '{}s'", statement_timeout_secs).as_str(),
                    )
                    .await?;
                    conn.execute("SET default_transaction_read_only = on")
                        .await?;
                    conn.execute("SET timezone = 'UTC'").await?;
                    Ok(())
                })
            })
            .connect(connection_string)
            .await
            .map_err(|e| {
                DqsError::connection_failed(
                    format!("cannot connect to {}", redact_database_url(connection_string)),
                    e,
                )
            })?;

        Ok(Self { pool })
    }
}

/// Projection expression casting a column to its kind's wire type.
fn projection(column: &NativeColumn) -> String {
    let quoted = quote_identifier(&column.name);
    match column.kind {
        ColumnKind::Number if column.native_type.eq_ignore_ascii_case("money") => {
            format!("{}::numeric::double precision", quoted)
        }
        ColumnKind::Number => format!("{}::double precision", quoted),
        ColumnKind::Boolean => format!("{}::boolean", quoted),
        ColumnKind::Timestamp => format!("{}::timestamptz", quoted),
        ColumnKind::String if column.native_type.eq_ignore_ascii_case("bytea") => {
            format!("'base64:' || encode({}, 'base64')", quoted)
        }
        ColumnKind::String => format!("{}::text", quoted),
    }
}

fn extract_cell(row: &PgRow, index: usize, kind: ColumnKind) -> Option<Value> {
    let value = match kind {
        ColumnKind::Number => row
            .try_get::<Option<f64>, _>(index)
            .ok()?
            .map(|n| if n.is_finite() { Some(Value::Number(n)) } else { None }),
        ColumnKind::Boolean => row
            .try_get::<Option<bool>, _>(index)
            .ok()?
            .map(|b| Some(Value::Boolean(b))),
        ColumnKind::Timestamp => row
            .try_get::<Option<DateTime<Utc>>, _>(index)
            .ok()?
            .map(|ts| Some(Value::Timestamp(ts))),
        ColumnKind::String => row
            .try_get::<Option<String>, _>(index)
            .ok()?
            .map(|s| Some(Value::String(s))),
    };
    match value {
        None => Some(Value::Null),
        Some(decoded) => decoded,
    }
}

impl PostgresReader {
    /// Primary-key column names in key order; empty when there is no key.
    async fn primary_key(&self, qualified: &TableName) -> Result<Vec<String>> {
        let rows = sqlx::query(
            "SELECT a.attname::text AS column_name \
             FROM pg_index i \
             JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey) \
             WHERE i.indrelid = to_regclass($1) AND i.indisprimary \
             ORDER BY array_position(i.indkey::int2[], a.attnum)",
        )
        .bind(qualified.quoted())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            DqsError::connection_failed(format!("cannot read primary key of {}", qualified), e)
        })?;

        rows.iter()
            .map(|row| {
                row.try_get::<String, _>("column_name")
                    .map_err(|e| DqsError::schema(format!("unreadable key column: {}", e)))
            })
            .collect()
    }
}

#[async_trait]
impl TableReader for PostgresReader {
    async fn describe(&self, table: &TableName) -> Result<Vec<NativeColumn>> {
        let schema = table.schema.as_deref().unwrap_or(DEFAULT_SCHEMA);

        let rows = sqlx::query(
            "SELECT column_name::text AS column_name, data_type::text AS data_type \
             FROM information_schema.columns \
             WHERE table_schema = $1 AND table_name = $2 \
             ORDER BY ordinal_position",
        )
        .bind(schema)
        .bind(&table.name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DqsError::connection_failed(format!("cannot describe table {}", table), e))?;

        let key = self
            .primary_key(&TableName {
                schema: Some(schema.to_string()),
                name: table.name.clone(),
            })
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in &rows {
            let name: String = row
                .try_get("column_name")
                .map_err(|e| DqsError::schema(format!("unreadable column name: {}", e)))?;
            let native_type: String = row
                .try_get("data_type")
                .map_err(|e| DqsError::schema(format!("unreadable column type: {}", e)))?;
            let kind = map_postgres_type(&native_type);
            let key_position = key
                .iter()
                .position(|k| *k == name)
                .and_then(|index| u32::try_from(index + 1).ok());
            columns.push(NativeColumn {
                name,
                native_type,
                kind,
                key_position,
            });
        }

        if columns.is_empty() {
            return Err(DqsError::schema(format!(
                "table {}.{} does not exist or is not visible",
                schema, table.name
            )));
        }

        Ok(columns)
    }

    async fn read(&self, table: &TableName, columns: &[NativeColumn], limit: u32) -> Result<Frame> {
        let select_list = columns
            .iter()
            .map(projection)
            .collect::<Vec<_>>()
            .join(", ");
        let qualified = TableName {
            schema: Some(
                table
                    .schema
                    .clone()
                    .unwrap_or_else(|| DEFAULT_SCHEMA.to_string()),
            ),
            name: table.name.clone(),
        };
        let query = format!(
            "SELECT {} FROM {} {} LIMIT $1",
            select_list,
            qualified.quoted(),
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

        tracing::debug!("Read {} rows from PostgreSQL table {}", values.len(), table);

        Frame::new(schemas, values, SourceKind::Table)
    }

    fn database_type(&self) -> DatabaseType {
        DatabaseType::PostgreSQL
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, native_type: &str) -> NativeColumn {
        NativeColumn {
            name: name.to_string(),
            native_type: native_type.to_string(),
            kind: map_postgres_type(native_type),
            key_position: None,
        }
    }

    #[test]
    fn test_projection_casts_by_kind() {
        assert_eq!(
            projection(&column("amount", "numeric")),
            "\"amount\"::double precision"
        );
        assert_eq!(
            projection(&column("fee", "money")),
            "\"fee\"::numeric::double precision"
        );
        assert_eq!(
            projection(&column("created", "date")),
            "\"created\"::timestamptz"
        );
        assert_eq!(projection(&column("id", "uuid")), "\"id\"::text");
        assert_eq!(
            projection(&column("blob", "bytea")),
            "'base64:' || encode(\"blob\", 'base64')"
        );
    }
}
