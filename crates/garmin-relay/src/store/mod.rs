//! Time-series storage for daily health points
//!
//! The collector writes one point per date and the reporter reads the points
//! back as `(timestamp, field, value)` triples. Both sides go through the
//! [`SeriesStore`] trait so the pipelines never see the database client.
//!
//! - [`InfluxStore`]: InfluxDB v2 over its HTTP API (line protocol writes,
//!   Flux queries returning annotated CSV)
//! - [`MemoryStore`]: process-local store used by dry runs and tests

mod flux_csv;
mod influx;
mod memory;

pub use influx::InfluxStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use chrono::{DateTime, Days, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::Result;
use crate::health::{FlatRecord, MetricValue};

/// A field value as returned by a store query.
///
/// The timestamp is kept exactly as the store serialized it; grouping code
/// is responsible for canonicalizing it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub timestamp: String,
    pub field: String,
    pub value: MetricValue,
}

impl StoredPoint {
    pub fn new(timestamp: impl Into<String>, field: impl Into<String>, value: MetricValue) -> Self {
        Self {
            timestamp: timestamp.into(),
            field: field.into(),
            value,
        }
    }
}

/// Half-open query window `[start, stop)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub stop: DateTime<Utc>,
}

impl TimeRange {
    /// The window covering today and the `days - 1` days before it.
    ///
    /// Points are stamped at midnight UTC of their date, so the window starts
    /// at midnight and ends just after `now`.
    /// A window reaching past the earliest representable date starts there.
    pub fn trailing_days(days: u32, now: DateTime<Utc>) -> Self {
        let back = Days::new(u64::from(days.max(1)) - 1);
        let start = now
            .date_naive()
            .checked_sub_days(back)
            .unwrap_or(NaiveDate::MIN)
            .and_time(NaiveTime::MIN)
            .and_utc();
        Self {
            start,
            stop: now + Duration::seconds(1),
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        time >= self.start && time < self.stop
    }
}

/// Write and query side of the time-series store
#[async_trait]
pub trait SeriesStore: Send + Sync {
    /// Write one point into `series`.
    ///
    /// Writing to the same series, tags and timestamp as an existing point
    /// merges into it: fields in `record` overwrite stored values, and stored
    /// fields missing from `record` are kept.
    async fn write(&self, series: &str, record: &FlatRecord) -> Result<()>;

    /// Fetch every point in `series` within `range` whose field name is in
    /// `fields`. Order is unspecified.
    async fn query(&self, series: &str, range: &TimeRange, fields: &[String])
        -> Result<Vec<StoredPoint>>;
}
