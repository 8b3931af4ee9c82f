//! Canonical Frame: the normalized rows-by-typed-columns model every adapter
//! produces and every scoring stage consumes.
//!
//! A frame is immutable once built. Every row carries exactly one value per
//! column (absent values are explicit [`Value::Null`]) and every non-null
//! value matches its column's [`ColumnKind`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

use crate::error::{DqsError, Result};

/// Canonical column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Free text
    String,
    /// Finite floating point number
    Number,
    /// UTC instant
    Timestamp,
    /// True/false flag
    Boolean,
}

impl ColumnKind {
    /// Lowercase name as used in logs and issue descriptions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Timestamp => "timestamp",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single nullable, typed cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    String(String),
    Number(f64),
    Timestamp(DateTime<Utc>),
    Boolean(bool),
}

/// Hashable identity of a non-null value, used for distinct and duplicate
/// counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKey<'a> {
    Str(&'a str),
    Num(u64),
    Ts(i64, u32),
    Bool(bool),
}

impl Value {
    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Kind of a non-null value.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Null => None,
            Self::String(_) => Some(ColumnKind::String),
            Self::Number(_) => Some(ColumnKind::Number),
            Self::Timestamp(_) => Some(ColumnKind::Timestamp),
            Self::Boolean(_) => Some(ColumnKind::Boolean),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Equality key; `None` for nulls. `-0.0` and `0.0` share a key.
    pub fn key(&self) -> Option<ValueKey<'_>> {
        match self {
            Self::Null => None,
            Self::String(s) => Some(ValueKey::Str(s)),
            Self::Number(n) => {
                let normalized = if *n == 0.0 { 0.0_f64 } else { *n };
                Some(ValueKey::Num(normalized.to_bits()))
            }
            Self::Timestamp(ts) => Some(ValueKey::Ts(ts.timestamp(), ts.timestamp_subsec_nanos())),
            Self::Boolean(b) => Some(ValueKey::Bool(*b)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Where a frame came from. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Table,
    Endpoint,
    Memory,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::File => "file",
            Self::Table => "table",
            Self::Endpoint => "endpoint",
            Self::Memory => "memory",
        };
        f.write_str(label)
    }
}

/// Column metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
    /// Raw values that could not be coerced to `kind` and were stored as null
    pub rejected_values: usize,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            rejected_values: 0,
        }
    }

    /// Builder method to record coercion rejects.
    pub fn with_rejected_values(mut self, rejected: usize) -> Self {
        self.rejected_values = rejected;
        self
    }
}

/// Immutable table of typed columns and rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    columns: Vec<ColumnSchema>,
    rows: Vec<Vec<Value>>,
    discrepancies: BTreeMap<String, f64>,
    source: SourceKind,
}

impl Frame {
    /// Builds a frame, checking the row-width and kind invariants.
    ///
    /// # Errors
    /// Returns `DqsError::Shape` for duplicate column names, rows with the
    /// wrong number of values, or values whose kind differs from their column.
    pub fn new(
        columns: Vec<ColumnSchema>,
        rows: Vec<Vec<Value>>,
        source: SourceKind,
    ) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(DqsError::shape(format!(
                    "duplicate column name '{}'",
                    column.name
                )));
            }
        }

        for (row_index, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(DqsError::shape(format!(
                    "row {} has {} values, expected {}",
                    row_index,
                    row.len(),
                    columns.len()
                )));
            }
            for (value, column) in row.iter().zip(&columns) {
                if let Some(kind) = value.kind()
                    && kind != column.kind
                {
                    return Err(DqsError::shape(format!(
                        "row {} holds a {} value in {} column '{}'",
                        row_index, kind, column.kind, column.name
                    )));
                }
            }
        }

        Ok(Self {
            columns,
            rows,
            discrepancies: BTreeMap::new(),
            source,
        })
    }

    /// Attaches a cross-source discrepancy ratio to a column (feeds Accuracy).
    ///
    /// Ratios outside `[0, 1]` are clamped.
    ///
    /// # Errors
    /// Returns `DqsError::Shape` if the column does not exist.
    pub fn with_discrepancy(mut self, column: &str, ratio: f64) -> Result<Self> {
        if self.column_index(column).is_none() {
            return Err(DqsError::shape(format!(
                "discrepancy signal for unknown column '{}'",
                column
            )));
        }
        let ratio = if ratio.is_nan() { 0.0 } else { ratio };
        if !(0.0..=1.0).contains(&ratio) {
            tracing::warn!(
                "Discrepancy ratio {} for column '{}' clamped to [0.0, 1.0]",
                ratio,
                column
            );
        }
        self.discrepancies
            .insert(column.to_string(), ratio.clamp(0.0, 1.0));
        Ok(self)
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn source_kind(&self) -> SourceKind {
        self.source
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// All values of the column at `index`, in row order.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> + '_ {
        self.rows.iter().filter_map(move |row| row.get(index))
    }

    /// Discrepancy ratio supplied for a column, if any.
    pub fn discrepancy(&self, column: &str) -> Option<f64> {
        self.discrepancies.get(column).copied()
    }
}

/// Incremental builder for frames assembled in code.
///
/// ```rust
/// use dqs_core::frame::{ColumnKind, FrameBuilder, Value};
///
/// let frame = FrameBuilder::new()
///     .column("customer_id", ColumnKind::String)
///     .column("amount", ColumnKind::Number)
///     .row(vec![Value::from("C-1"), Value::from(12.5)])
///     .row(vec![Value::Null, Value::from(-3.0)])
///     .build()
///     .unwrap();
/// assert_eq!(frame.row_count(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FrameBuilder {
    columns: Vec<ColumnSchema>,
    rows: Vec<Vec<Value>>,
    source: SourceKind,
}

impl Default for FrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuilder {
    pub fn new() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            source: SourceKind::Memory,
        }
    }

    pub fn with_source(mut self, source: SourceKind) -> Self {
        self.source = source;
        self
    }

    pub fn column(mut self, name: impl Into<String>, kind: ColumnKind) -> Self {
        self.columns.push(ColumnSchema::new(name, kind));
        self
    }

    pub fn column_schema(mut self, schema: ColumnSchema) -> Self {
        self.columns.push(schema);
        self
    }

    /// Appends a row. Short rows are padded with nulls at build time.
    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Appends a row given as `(column, value)` pairs; unnamed columns are null.
    pub fn record<'a, I>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Value)>,
    {
        let mut row = vec![Value::Null; self.columns.len()];
        for (name, value) in pairs {
            if let Some(index) = self.columns.iter().position(|c| c.name == name)
                && let Some(slot) = row.get_mut(index)
            {
                *slot = value;
            }
        }
        self.rows.push(row);
        self
    }

    /// Builds the frame.
    ///
    /// # Errors
    /// See [`Frame::new`]. Rows longer than the column list are rejected.
    pub fn build(self) -> Result<Frame> {
        let width = self.columns.len();
        let rows = self
            .rows
            .into_iter()
            .map(|mut row| {
                if row.len() < width {
                    row.resize(width, Value::Null);
                }
                row
            })
            .collect();
        Frame::new(self.columns, rows, self.source)
    }
}
