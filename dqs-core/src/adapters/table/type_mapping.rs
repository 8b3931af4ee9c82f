//! Native column types to canonical kinds.
//!
//! SQLite follows its type-affinity rules, with date/time and boolean
//! declarations recognized by name since SQLite stores them as text or
//! integers. PostgreSQL types come from `information_schema.columns.data_type`.

use crate::frame::ColumnKind;

/// Maps a declared SQLite column type.
///
/// ```rust
/// use dqs_core::adapters::table::type_mapping::map_sqlite_type;
/// use dqs_core::frame::ColumnKind;
///
/// assert_eq!(map_sqlite_type("VARCHAR(255)"), ColumnKind::String);
/// assert_eq!(map_sqlite_type("DATETIME"), ColumnKind::Timestamp);
/// ```
pub fn map_sqlite_type(sqlite_type: &str) -> ColumnKind {
    let declared = sqlite_type.trim().to_ascii_uppercase();

    if declared.contains("BOOL") {
        return ColumnKind::Boolean;
    }
    if declared.contains("DATE") || declared.contains("TIME") {
        return ColumnKind::Timestamp;
    }
    // Affinity order: INTEGER, TEXT, BLOB, REAL, NUMERIC
    if declared.contains("INT") {
        return ColumnKind::Number;
    }
    if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT") {
        return ColumnKind::String;
    }
    if declared.is_empty() || declared.contains("BLOB") {
        return ColumnKind::String;
    }
    ColumnKind::Number
}

/// Maps a PostgreSQL `data_type`.
pub fn map_postgres_type(data_type: &str) -> ColumnKind {
    match data_type.trim().to_ascii_lowercase().as_str() {
        "smallint" | "integer" | "bigint" | "int2" | "int4" | "int8" | "real"
        | "double precision" | "float4" | "float8" | "numeric" | "decimal" | "money" => {
            ColumnKind::Number
        }
        "boolean" | "bool" => ColumnKind::Boolean,
        "date"
        | "timestamp"
        | "timestamp without time zone"
        | "timestamp with time zone"
        | "timestamptz" => ColumnKind::Timestamp,
        _ => ColumnKind::String,
    }
}
