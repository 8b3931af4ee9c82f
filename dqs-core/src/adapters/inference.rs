//! Type inference and coercion for textual cells.
//!
//! A column is numeric if every sampled non-null cell parses as a finite
//! number, a timestamp if every sampled non-null cell parses as ISO-8601,
//! and a string otherwise. Cells outside the sample that do not fit the
//! inferred kind become nulls and are counted as rejected.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use super::config::IngestConfig;
use crate::error::Result;
use crate::frame::{ColumnKind, ColumnSchema, Frame, SourceKind, Value};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parses a finite number. Surrounding whitespace is ignored.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Parses an ISO-8601 timestamp. Offsets are honored; naive values are UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.len() < 10 {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Infers a column kind from sampled non-null cells.
///
/// A column with no non-null sample is a string column.
pub fn infer_text_kind<'a, I>(samples: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a str>,
{
    let mut all_numeric = true;
    let mut all_timestamps = true;
    let mut any = false;

    for cell in samples {
        any = true;
        if all_numeric && parse_number(cell).is_none() {
            all_numeric = false;
        }
        if all_timestamps && parse_timestamp(cell).is_none() {
            all_timestamps = false;
        }
        if !all_numeric && !all_timestamps {
            return ColumnKind::String;
        }
    }

    match (any, all_numeric, all_timestamps) {
        (false, _, _) => ColumnKind::String,
        (true, true, _) => ColumnKind::Number,
        (true, false, true) => ColumnKind::Timestamp,
        _ => ColumnKind::String,
    }
}

/// Coerces a non-null cell to `kind`; `None` means the cell is rejected.
pub fn coerce_text(raw: &str, kind: ColumnKind) -> Option<Value> {
    match kind {
        ColumnKind::String => Some(Value::String(raw.to_string())),
        ColumnKind::Number => parse_number(raw).map(Value::Number),
        ColumnKind::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        ColumnKind::Boolean => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "1" => Some(Value::Boolean(true)),
            "false" | "f" | "no" | "0" => Some(Value::Boolean(false)),
            _ => None,
        },
    }
}

/// Builds a frame from headers and textual records (`None` = null cell).
///
/// Every record must have one cell per header.
pub fn build_text_frame(
    headers: Vec<String>,
    records: Vec<Vec<Option<String>>>,
    config: &IngestConfig,
    source: SourceKind,
) -> Result<Frame> {
    let window = config.inference_window(records.len());

    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|index| {
            infer_text_kind(
                records
                    .iter()
                    .take(window)
                    .filter_map(|record| record.get(index).and_then(|cell| cell.as_deref())),
            )
        })
        .collect();

    let mut rejected = vec![0_usize; headers.len()];
    let rows: Vec<Vec<Value>> = records
        .into_iter()
        .map(|record| {
            record
                .into_iter()
                .zip(&kinds)
                .zip(rejected.iter_mut())
                .map(|((cell, kind), rejected)| match cell {
                    None => Value::Null,
                    Some(raw) => coerce_text(&raw, *kind).unwrap_or_else(|| {
                        *rejected += 1;
                        Value::Null
                    }),
                })
                .collect()
        })
        .collect();

    let columns: Vec<ColumnSchema> = headers
        .into_iter()
        .zip(&kinds)
        .zip(&rejected)
        .map(|((name, kind), rejected)| {
            if *rejected > 0 {
                tracing::debug!(
                    "Column '{}' ({}): {} values could not be coerced and were nulled",
                    name,
                    kind,
                    rejected
                );
            }
            ColumnSchema::new(name, *kind).with_rejected_values(*rejected)
        })
        .collect();

    Frame::new(columns, rows, source)
}
