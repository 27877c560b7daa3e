//! Flatten a daily record into the tag/field set written to the store

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

use super::{DailyHealthRecord, MetricValue};

/// Tag carrying the record date
pub const DATE_TAG: &str = "date";

/// One point ready for the series writer
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRecord {
    pub date: NaiveDate,
    /// Point time: the record date at midnight UTC, so a re-collected date
    /// lands on the same point.
    pub timestamp: DateTime<Utc>,
    pub tags: BTreeMap<String, String>,
    /// Present metrics only, in record order
    pub fields: Vec<(String, MetricValue)>,
}

impl FlatRecord {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, name: &str) -> Option<MetricValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

/// Flatten a record. Absent metrics are left out entirely.
pub fn flatten(record: &DailyHealthRecord) -> FlatRecord {
    let mut tags = BTreeMap::new();
    tags.insert(DATE_TAG.to_string(), record.date.format("%Y-%m-%d").to_string());

    let fields = record
        .present_fields()
        .map(|(field, value)| (field.name().to_string(), value))
        .collect();

    FlatRecord {
        date: record.date,
        timestamp: date_timestamp(record.date),
        tags,
        fields,
    }
}

/// Midnight UTC of `date`
pub fn date_timestamp(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}
