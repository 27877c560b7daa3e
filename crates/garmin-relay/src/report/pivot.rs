//! Regroup `(timestamp, field, value)` rows into one field map per timestamp
//!
//! Timestamps are compared only after canonicalization to second-precision
//! UTC, so `2024-01-01T00:00:00Z` and `2024-01-01T00:00:00.000000000Z`
//! (or the same instant with a `+02:00` offset) land in the same group.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::health::MetricValue;
use crate::store::StoredPoint;

/// Canonical timestamp layout used as the grouping key
pub const CANONICAL_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// All known fields stored for one timestamp
#[derive(Debug, Clone, PartialEq)]
pub struct TimedFieldGroup {
    /// Canonical UTC timestamp
    pub timestamp: String,
    pub fields: BTreeMap<String, MetricValue>,
}

/// Result of a pivot, with counts of what was left out
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pivot {
    /// Groups in order of first appearance
    pub groups: Vec<TimedFieldGroup>,
    /// Points whose field is not on the allow-list
    pub ignored: usize,
    /// Points whose timestamp could not be parsed
    pub unparseable: usize,
}

/// Normalize a stored timestamp to [`CANONICAL_FORMAT`].
///
/// Accepts RFC 3339 with any offset and sub-second precision, naive
/// date-times (taken as UTC) and bare dates (midnight UTC). Sub-second
/// digits are truncated.
pub fn canonical_timestamp(raw: &str) -> Option<String> {
    let raw = raw.trim();

    let utc = if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        dt.with_timezone(&Utc)
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        naive.and_utc()
    } else if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        naive.and_utc()
    } else if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        date.and_time(NaiveTime::MIN).and_utc()
    } else {
        return None;
    };

    Some(utc.format(CANONICAL_FORMAT).to_string())
}

/// Group points by canonical timestamp.
///
/// Only fields named in `allowed` are kept. When a field appears twice for
/// the same timestamp the later point wins.
pub fn pivot<I>(points: I, allowed: &[String]) -> Pivot
where
    I: IntoIterator<Item = StoredPoint>,
{
    let allowed: HashSet<&str> = allowed.iter().map(String::as_str).collect();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut out = Pivot::default();

    for point in points {
        if !allowed.contains(point.field.as_str()) {
            out.ignored += 1;
            continue;
        }

        let Some(timestamp) = canonical_timestamp(&point.timestamp) else {
            tracing::warn!(
                timestamp = %point.timestamp,
                field = %point.field,
                "skipping point with unparseable timestamp"
            );
            out.unparseable += 1;
            continue;
        };

        let slot = *index.entry(timestamp.clone()).or_insert_with(|| {
            out.groups.push(TimedFieldGroup {
                timestamp,
                fields: BTreeMap::new(),
            });
            out.groups.len() - 1
        });

        out.groups[slot].fields.insert(point.field, point.value);
    }

    out
}
