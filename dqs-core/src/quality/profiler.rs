//! Column profiling.
//!
//! Turns a frame into per-column statistics. Profiling is pure: the same
//! frame and options always yield the same profile, and "now" is injected
//! rather than read from the clock.

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet, HashSet};

use crate::frame::{ColumnKind, Frame, Value, ValueKey};

use super::config::ColumnRelation;
use super::models::{ColumnStats, FrameProfile, ratio};

/// Inputs to profiling that do not come from the frame itself.
#[derive(Debug, Clone)]
pub struct ProfileOptions {
    /// Reference instant for future and stale checks
    pub now: DateTime<Utc>,
    pub staleness_horizon: Duration,
    /// Declared referential checks for Integrity
    pub relations: Vec<ColumnRelation>,
}

impl ProfileOptions {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            staleness_horizon: Duration::days(180),
            relations: Vec::new(),
        }
    }

    pub fn with_staleness_horizon(mut self, horizon: Duration) -> Self {
        self.staleness_horizon = horizon;
        self
    }

    pub fn with_relations(mut self, relations: Vec<ColumnRelation>) -> Self {
        self.relations = relations;
        self
    }
}

/// Profiles every column of `frame`.
pub fn profile(frame: &Frame, options: &ProfileOptions) -> FrameProfile {
    let row_count = frame.row_count();

    let mut columns: Vec<ColumnStats> = frame
        .columns()
        .iter()
        .enumerate()
        .map(|(index, schema)| {
            let mut stats = profile_column(frame, index, &schema.name, schema.kind, options);
            stats.invalid_ratio = ratio(schema.rejected_values, row_count);
            stats.discrepancy_ratio = frame.discrepancy(&schema.name);
            stats
        })
        .collect();

    for relation in &options.relations {
        apply_relation(frame, relation, &mut columns);
    }

    let duplicate_row_count = count_duplicate_rows(frame);

    tracing::debug!(
        "Profiled {} columns over {} rows ({} duplicate rows)",
        columns.len(),
        row_count,
        duplicate_row_count
    );

    FrameProfile {
        row_count,
        duplicate_row_count,
        duplicate_row_ratio: ratio(duplicate_row_count, row_count),
        columns,
    }
}

fn profile_column(
    frame: &Frame,
    index: usize,
    name: &str,
    kind: ColumnKind,
    options: &ProfileOptions,
) -> ColumnStats {
    let mut stats = ColumnStats::empty(name, kind);
    let values: Vec<&Value> = frame.column_values(index).collect();

    stats.row_count = values.len();
    stats.null_count = values.iter().filter(|v| v.is_null()).count();
    stats.null_ratio = ratio(stats.null_count, stats.row_count);

    let distinct: HashSet<ValueKey<'_>> = values.iter().filter_map(|v| v.key()).collect();
    stats.distinct_count = distinct.len();
    let non_null = stats.non_null_count();
    stats.unique_ratio = ratio(stats.distinct_count, non_null);

    match kind {
        ColumnKind::Number => {
            let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_f64()).collect();
            let negatives = numbers.iter().filter(|n| **n < 0.0).count();
            stats.negative_ratio = Some(ratio(negatives, numbers.len()));
            stats.min = numbers.iter().copied().reduce(f64::min);
            stats.max = numbers.iter().copied().reduce(f64::max);
        }
        ColumnKind::Timestamp => {
            let stale_before = options.now - options.staleness_horizon;
            let timestamps: Vec<DateTime<Utc>> =
                values.iter().filter_map(|v| v.as_timestamp()).collect();
            let future = timestamps.iter().filter(|ts| **ts > options.now).count();
            let stale = timestamps.iter().filter(|ts| **ts < stale_before).count();
            stats.future_ratio = Some(ratio(future, timestamps.len()));
            stats.stale_ratio = Some(ratio(stale, timestamps.len()));
        }
        ColumnKind::String => {
            stats.distinct_value_casing_variants = Some(count_casing_variants(
                values.iter().filter_map(|v| v.as_str()),
            ));
        }
        ColumnKind::Boolean => {}
    }

    stats
}

/// Counts case-folded groups spelled more than one way.
///
/// `["INR", "inr", "INR", "USD"]` has one such group.
pub fn count_casing_variants<'a>(values: impl Iterator<Item = &'a str>) -> usize {
    let mut groups: BTreeMap<String, BTreeSet<&'a str>> = BTreeMap::new();
    for value in values {
        groups.entry(value.to_lowercase()).or_default().insert(value);
    }
    groups.values().filter(|spellings| spellings.len() > 1).count()
}

fn apply_relation(frame: &Frame, relation: &ColumnRelation, columns: &mut [ColumnStats]) {
    let (Some(child_index), Some(parent_index)) = (
        frame.column_index(&relation.child),
        frame.column_index(&relation.parent),
    ) else {
        tracing::warn!(
            "Skipping referential check {} -> {}: column not present",
            relation.child,
            relation.parent
        );
        return;
    };

    let parent_keys: HashSet<ValueKey<'_>> = frame
        .column_values(parent_index)
        .filter_map(Value::key)
        .collect();

    let mut checked = 0_usize;
    let mut orphans = 0_usize;
    for key in frame.column_values(child_index).filter_map(Value::key) {
        checked += 1;
        if !parent_keys.contains(&key) {
            orphans += 1;
        }
    }

    if let Some(stats) = columns.get_mut(child_index) {
        stats.orphan_ratio = Some(ratio(orphans, checked));
        stats.references = Some(relation.parent.clone());
    }
}

fn count_duplicate_rows(frame: &Frame) -> usize {
    if frame.column_count() == 0 {
        return 0;
    }
    let mut seen: HashSet<Vec<Option<ValueKey<'_>>>> = HashSet::with_capacity(frame.row_count());
    frame
        .rows()
        .iter()
        .filter(|row| !seen.insert(row.iter().map(Value::key).collect()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{ColumnSchema, FrameBuilder};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_profile_empty_frame() {
        let frame = FrameBuilder::new()
            .column("id", ColumnKind::Number)
            .build()
            .unwrap();
        let profile = profile(&frame, &ProfileOptions::new(now()));

        assert_eq!(profile.row_count, 0);
        let id = profile.column("id").unwrap();
        assert_eq!(id.null_ratio, 0.0);
        assert_eq!(id.unique_ratio, 0.0);
        assert_eq!(id.negative_ratio, Some(0.0));
        assert_eq!(id.min, None);
    }

    #[test]
    fn test_null_and_unique_ratios() {
        let frame = FrameBuilder::new()
            .column("customer_id", ColumnKind::String)
            .row(vec![Value::from("C1")])
            .row(vec![Value::from("C1")])
            .row(vec![Value::from("C2")])
            .row(vec![Value::Null])
            .build()
            .unwrap();
        let profile = profile(&frame, &ProfileOptions::new(now()));
        let stats = profile.column("customer_id").unwrap();

        assert_eq!(stats.null_count, 1);
        assert!((stats.null_ratio - 0.25).abs() < 0.001);
        assert_eq!(stats.distinct_count, 2);
        assert!((stats.unique_ratio - 2.0 / 3.0).abs() < 0.001);
        assert_eq!(profile.duplicate_row_count, 1);
    }

    #[test]
    fn test_numeric_stats() {
        let frame = FrameBuilder::new()
            .column("amount", ColumnKind::Number)
            .row(vec![Value::from(-50.0)])
            .row(vec![Value::from(10.0)])
            .row(vec![Value::from(20.0)])
            .row(vec![Value::from(30.0)])
            .build()
            .unwrap();
        let profile = profile(&frame, &ProfileOptions::new(now()));
        let stats = profile.column("amount").unwrap();

        assert_eq!(stats.negative_ratio, Some(0.25));
        assert_eq!(stats.min, Some(-50.0));
        assert_eq!(stats.max, Some(30.0));
        assert_eq!(stats.future_ratio, None);
    }

    #[test]
    fn test_timestamp_stats() {
        let frame = FrameBuilder::new()
            .column("txn_timestamp", ColumnKind::Timestamp)
            .row(vec![Value::from(now() + Duration::days(365))])
            .row(vec![Value::from(now() - Duration::days(400))])
            .row(vec![Value::from(now() - Duration::days(1))])
            .row(vec![Value::from(now() - Duration::days(2))])
            .build()
            .unwrap();
        let profile = profile(&frame, &ProfileOptions::new(now()));
        let stats = profile.column("txn_timestamp").unwrap();

        assert_eq!(stats.future_ratio, Some(0.25));
        assert_eq!(stats.stale_ratio, Some(0.25));
        assert_eq!(stats.negative_ratio, None);
    }

    #[test]
    fn test_casing_variants() {
        let values = ["INR", "inr", "INR", "USD", "usd", "Usd", "EUR"];
        assert_eq!(count_casing_variants(values.iter().copied()), 2);
        assert_eq!(count_casing_variants(["a", "b"].iter().copied()), 0);
    }

    #[test]
    fn test_invalid_ratio_from_rejects() {
        let frame = FrameBuilder::new()
            .column_schema(ColumnSchema::new("amount", ColumnKind::Number).with_rejected_values(1))
            .row(vec![Value::from(1.0)])
            .row(vec![Value::Null])
            .build()
            .unwrap();
        let profile = profile(&frame, &ProfileOptions::new(now()));

        assert!((profile.column("amount").unwrap().invalid_ratio - 0.5).abs() < 0.001);
    }

    #[test]
    fn test_orphan_ratio() {
        let frame = FrameBuilder::new()
            .column("id", ColumnKind::String)
            .column("parent_id", ColumnKind::String)
            .row(vec![Value::from("a"), Value::Null])
            .row(vec![Value::from("b"), Value::from("a")])
            .row(vec![Value::from("c"), Value::from("z")])
            .build()
            .unwrap();
        let options = ProfileOptions::new(now())
            .with_relations(vec![ColumnRelation::new("parent_id", "id")]);
        let profile = profile(&frame, &options);
        let stats = profile.column("parent_id").unwrap();

        assert_eq!(stats.orphan_ratio, Some(0.5));
        assert_eq!(stats.references.as_deref(), Some("id"));
        assert_eq!(profile.column("id").unwrap().orphan_ratio, None);
    }

    #[test]
    fn test_relation_with_missing_column_is_skipped() {
        let frame = FrameBuilder::new()
            .column("id", ColumnKind::String)
            .row(vec![Value::from("a")])
            .build()
            .unwrap();
        let options = ProfileOptions::new(now())
            .with_relations(vec![ColumnRelation::new("missing", "id")]);
        let profile = profile(&frame, &options);

        assert!(profile.columns.iter().all(|c| c.orphan_ratio.is_none()));
    }
}
