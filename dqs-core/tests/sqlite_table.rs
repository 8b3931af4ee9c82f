//! SQLite table ingestion tests.
//!
//! This test suite covers:
//! - Native type mapping to canonical kinds
//! - Auditing a table end to end
//! - Unknown tables, invalid identifiers, and row bounds
//! - Stable ordering of bounded reads
//! - Read-only access

#![cfg(feature = "sqlite")]

use chrono::{TimeZone, Utc};
use dqs_core::{
    AuditConfig, AuditEngine, ColumnKind, Dimension, IngestConfig, SourceDescriptor, TableSource,
    Value,
};
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
use tempfile::TempDir;

/// Creates an empty on-disk database, returning a writable pool and its URL.
async fn open_database(dir: &TempDir) -> (SqlitePool, String) {
    let path = dir.path().join("ledger.db");
    let url = format!("sqlite://{}", path.display());

    // Rollback journal keeps the file openable by a read-only connection.
    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);
    let pool = SqlitePool::connect_with(options).await.unwrap();
    (pool, url)
}

/// Creates an on-disk database with a populated `transactions` table.
async fn create_database() -> (TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let (pool, url) = open_database(&dir).await;
    sqlx::query(
        "CREATE TABLE transactions (
            txn_id INTEGER PRIMARY KEY,
            customer_id TEXT,
            currency VARCHAR(3),
            amount REAL,
            flagged BOOLEAN,
            txn_timestamp DATETIME,
            payload BLOB
        )",
    )
    .execute(&pool)
    .await
    .unwrap();

    let rows = [
        (1, Some("CUST-1"), "INR", 120.5, 0, "2025-05-01T10:00:00Z"),
        (2, Some("CUST-2"), "INR", 75.0, 0, "2025-05-02T10:00:00Z"),
        (3, None, "inr", -50.0, 1, "2025-05-03T10:00:00Z"),
        (4, Some("CUST-4"), "INR", 300.0, 0, "2026-05-03T10:00:00Z"),
        (5, Some("CUST-5"), "USD", 12.0, 0, "2025-05-04T10:00:00Z"),
    ];
    for (id, customer, currency, amount, flagged, timestamp) in rows {
        sqlx::query(
            "INSERT INTO transactions \
             (txn_id, customer_id, currency, amount, flagged, txn_timestamp, payload) \
             VALUES (?, ?, ?, ?, ?, ?, X'DEADBEEF')",
        )
        .bind(id)
        .bind(customer)
        .bind(currency)
        .bind(amount)
        .bind(flagged)
        .bind(timestamp)
        .execute(&pool)
        .await
        .unwrap();
    }
    pool.close().await;

    (dir, url)
}

fn engine() -> AuditEngine {
    AuditEngine::new(
        AuditConfig::default()
            .with_reference_time(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()),
    )
    .unwrap()
}

#[tokio::test]
async fn test_sqlite_types_map_to_canonical_kinds() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url, "transactions"));
    let frame = source.load(&IngestConfig::default()).await.unwrap();

    let kinds: Vec<(String, ColumnKind)> = frame
        .columns()
        .iter()
        .map(|c| (c.name.clone(), c.kind))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("txn_id".to_string(), ColumnKind::Number),
            ("customer_id".to_string(), ColumnKind::String),
            ("currency".to_string(), ColumnKind::String),
            ("amount".to_string(), ColumnKind::Number),
            ("flagged".to_string(), ColumnKind::Boolean),
            ("txn_timestamp".to_string(), ColumnKind::Timestamp),
            ("payload".to_string(), ColumnKind::String),
        ]
    );
    assert_eq!(frame.row_count(), 5);
    assert_eq!(frame.rows()[2][1], Value::Null);
    assert_eq!(frame.rows()[0][6].as_str(), Some("base64:3q2+7w=="));
    assert!(frame.columns().iter().all(|c| c.rejected_values == 0));
}

#[tokio::test]
async fn test_sqlite_table_audit() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url, "transactions"));
    let report = engine().analyze(&source).await.unwrap();

    let scores = report.dimension_scores();
    assert!((scores[&Dimension::Completeness] - 0.8).abs() < 1e-9);
    assert!(scores[&Dimension::Consistency] < 0.9);
    assert!(scores[&Dimension::Validity] < 0.9);
    assert_eq!(
        report.issues()[&Dimension::Completeness].affected_columns,
        vec!["customer_id".to_string()]
    );
}

#[tokio::test]
async fn test_sqlite_unknown_table_is_schema_error() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url, "missing_table"));
    let error = source.load(&IngestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind(), "SchemaError");
}

#[tokio::test]
async fn test_sqlite_invalid_identifier_is_schema_error() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url, "transactions; DROP TABLE x"));
    let error = source.load(&IngestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind(), "SchemaError");
}

#[tokio::test]
async fn test_sqlite_missing_database_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite://{}", dir.path().join("absent.db").display());
    let source = SourceDescriptor::from(TableSource::new(url, "transactions"));
    let error = source.load(&IngestConfig::default()).await.unwrap_err();
    assert_eq!(error.kind(), "ConnectionError");
}

#[tokio::test]
async fn test_sqlite_row_bound() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url, "transactions"));
    let frame = source
        .load(&IngestConfig::default().with_max_rows(2))
        .await
        .unwrap();
    assert_eq!(frame.row_count(), 2);
    assert_eq!(frame.rows()[0][0], Value::Number(1.0));
    assert_eq!(frame.rows()[1][0], Value::Number(2.0));
}

#[tokio::test]
async fn test_sqlite_bounded_read_follows_primary_key() {
    let dir = tempfile::tempdir().unwrap();
    let (pool, url) = open_database(&dir).await;
    sqlx::query("CREATE TABLE accounts (code TEXT PRIMARY KEY, owner TEXT)")
        .execute(&pool)
        .await
        .unwrap();
    // Inserted against key order, so rowid order differs from key order.
    for (code, owner) in [("ACC-3", "carol"), ("ACC-1", "alice"), ("ACC-2", "bob")] {
        sqlx::query("INSERT INTO accounts (code, owner) VALUES (?, ?)")
            .bind(code)
            .bind(owner)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    let source = SourceDescriptor::from(TableSource::new(url, "accounts"));
    let frame = source
        .load(&IngestConfig::default().with_max_rows(2))
        .await
        .unwrap();
    assert_eq!(frame.rows()[0][0].as_str(), Some("ACC-1"));
    assert_eq!(frame.rows()[1][0].as_str(), Some("ACC-2"));
}

#[tokio::test]
async fn test_sqlite_keyless_bounded_read_is_ordered() {
    let dir = tempfile::tempdir().unwrap();
    let (pool, url) = open_database(&dir).await;
    sqlx::query("CREATE TABLE events (label TEXT, amount REAL)")
        .execute(&pool)
        .await
        .unwrap();
    for (label, amount) in [("settle", 3.0), ("auth", 9.0), ("refund", 1.0)] {
        sqlx::query("INSERT INTO events (label, amount) VALUES (?, ?)")
            .bind(label)
            .bind(amount)
            .execute(&pool)
            .await
            .unwrap();
    }
    pool.close().await;

    let source = SourceDescriptor::from(TableSource::new(url, "events"));
    let frame = source
        .load(&IngestConfig::default().with_max_rows(1))
        .await
        .unwrap();
    assert_eq!(frame.rows()[0][0].as_str(), Some("auth"));
}

#[tokio::test]
async fn test_sqlite_source_is_not_modified() {
    let (_dir, url) = create_database().await;
    let source = SourceDescriptor::from(TableSource::new(url.clone(), "transactions"));
    engine().analyze(&source).await.unwrap();

    let pool = SqlitePool::connect(&url).await.unwrap();
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transactions")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 5);
    pool.close().await;
}
