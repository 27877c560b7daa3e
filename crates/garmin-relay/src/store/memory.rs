//! In-process series store

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use super::{SeriesStore, StoredPoint, TimeRange};
use crate::error::{RelayError, Result};
use crate::health::{FlatRecord, MetricValue};

type PointKey = (String, BTreeMap<String, String>, DateTime<Utc>);

/// Series store kept in memory.
///
/// Points are keyed like InfluxDB keys them (series, tag set, timestamp).
/// Rewriting a key merges field sets the way InfluxDB does.
#[derive(Default)]
pub struct MemoryStore {
    points: Mutex<BTreeMap<PointKey, BTreeMap<String, MetricValue>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored points (not fields)
    pub fn len(&self) -> usize {
        self.points.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SeriesStore for MemoryStore {
    async fn write(&self, series: &str, record: &FlatRecord) -> Result<()> {
        if record.is_empty() {
            return Err(RelayError::store("point has no fields"));
        }

        let mut points = self
            .points
            .lock()
            .map_err(|_| RelayError::store("memory store lock poisoned"))?;

        let key = (series.to_string(), record.tags.clone(), record.timestamp);
        points
            .entry(key)
            .or_default()
            .extend(record.fields.iter().cloned());
        Ok(())
    }

    async fn query(
        &self,
        series: &str,
        range: &TimeRange,
        fields: &[String],
    ) -> Result<Vec<StoredPoint>> {
        let points = self
            .points
            .lock()
            .map_err(|_| RelayError::store("memory store lock poisoned"))?;

        let mut out = Vec::new();
        for ((name, _tags, time), values) in points.iter() {
            if name != series || !range.contains(*time) {
                continue;
            }
            // Nanosecond precision, like InfluxDB's own serialization
            let timestamp = time.to_rfc3339_opts(SecondsFormat::Nanos, true);
            for (field, value) in values {
                if fields.iter().any(|f| f == field) {
                    out.push(StoredPoint::new(timestamp.clone(), field.clone(), *value));
                }
            }
        }
        Ok(out)
    }
}
