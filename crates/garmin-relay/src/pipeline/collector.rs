//! Collector pipeline: Garmin Connect to the time-series store
//!
//! Dates are processed one at a time, newest first. Each date ends in a
//! [`DateOutcome`]; a failed date is recorded and the loop moves on.

use std::fmt;

use chrono::{Days, NaiveDate};
use serde_json::Value;

use crate::client::FitnessSource;
use crate::error::{RelayError, Result};
use crate::health::{extract_daily_record, flatten, CategoryPayloads, DailyHealthRecord};
use crate::store::SeriesStore;

/// How one date ended
#[derive(Debug, Clone, PartialEq)]
pub enum DateStatus {
    /// Point written with this many fields
    Written { fields: usize },
    /// Every metric was absent; nothing written
    Empty,
    /// Fetching or writing failed
    Failed { reason: String },
}

/// Outcome for a single date
#[derive(Debug, Clone, PartialEq)]
pub struct DateOutcome {
    pub date: NaiveDate,
    pub status: DateStatus,
    /// The extracted record, when extraction got that far
    pub record: Option<DailyHealthRecord>,
}

/// Per-date outcomes of a collector run, newest date first
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectReport {
    pub outcomes: Vec<DateOutcome>,
}

impl CollectReport {
    pub fn written(&self) -> usize {
        self.count(|s| matches!(s, DateStatus::Written { .. }))
    }

    pub fn empty(&self) -> usize {
        self.count(|s| matches!(s, DateStatus::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, DateStatus::Failed { .. }))
    }

    fn count(&self, pred: impl Fn(&DateStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

impl fmt::Display for CollectReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Written: {}, No data: {}, Failed: {}",
            self.written(),
            self.empty(),
            self.failed()
        )
    }
}

/// Runs the collector against a source and a store
pub struct Collector<'a> {
    source: &'a dyn FitnessSource,
    store: &'a dyn SeriesStore,
    series: &'a str,
}

impl<'a> Collector<'a> {
    pub fn new(source: &'a dyn FitnessSource, store: &'a dyn SeriesStore, series: &'a str) -> Self {
        Self {
            source,
            store,
            series,
        }
    }

    /// Collect `today` and the `days - 1` days before it.
    ///
    /// Only errors that make every further date pointless (no valid
    /// credentials, bad configuration) end the run early.
    pub async fn run(&self, today: NaiveDate, days: u32) -> Result<CollectReport> {
        let mut report = CollectReport::default();

        for offset in 0..u64::from(days) {
            let Some(date) = today.checked_sub_days(Days::new(offset)) else {
                tracing::warn!(%today, days, "stopping at the earliest representable date");
                break;
            };
            let outcome = self.collect_date(date).await?;

            match &outcome.status {
                DateStatus::Written { fields } => {
                    tracing::info!(%date, fields, "wrote daily health point")
                }
                DateStatus::Empty => tracing::info!(%date, "no health data for date"),
                DateStatus::Failed { reason } => {
                    tracing::warn!(%date, %reason, "failed to collect date")
                }
            }

            report.outcomes.push(outcome);
        }

        Ok(report)
    }

    /// Fetch, extract, flatten and write a single date
    pub async fn collect_date(&self, date: NaiveDate) -> Result<DateOutcome> {
        let mut failures = Vec::new();

        let steps = fetch_category("steps", self.source.steps(date).await, &mut failures)?;
        let heart_rate =
            fetch_category("heart rate", self.source.heart_rate(date).await, &mut failures)?;
        let sleep = fetch_category("sleep", self.source.sleep(date).await, &mut failures)?;
        let stress = fetch_category("stress", self.source.stress(date).await, &mut failures)?;

        if failures.len() == 4 {
            return Ok(DateOutcome {
                date,
                status: DateStatus::Failed {
                    reason: failures.join("; "),
                },
                record: None,
            });
        }

        let payloads = CategoryPayloads {
            steps,
            heart_rate,
            sleep,
            stress,
        };
        tracing::debug!(%date, ?payloads, "raw payloads");

        let record = extract_daily_record(date, &payloads);
        let flat = flatten(&record);

        if flat.is_empty() {
            return Ok(DateOutcome {
                date,
                status: DateStatus::Empty,
                record: Some(record),
            });
        }

        let status = match self.store.write(self.series, &flat).await {
            Ok(()) => DateStatus::Written {
                fields: flat.fields.len(),
            },
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => DateStatus::Failed {
                reason: format!("write failed: {}", e),
            },
        };

        Ok(DateOutcome {
            date,
            status,
            record: Some(record),
        })
    }
}

/// Turn a category fetch into an optional payload.
///
/// A failed category only blanks its own fields; fatal errors propagate.
fn fetch_category(
    name: &str,
    result: Result<Value>,
    failures: &mut Vec<String>,
) -> Result<Option<Value>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_fatal() => Err(e),
        Err(RelayError::NotFound(_)) => {
            tracing::debug!(category = name, "no data upstream");
            failures.push(format!("{}: not found", name));
            Ok(None)
        }
        Err(e) => {
            tracing::warn!(category = name, error = %e, "category fetch failed");
            failures.push(format!("{}: {}", name, e));
            Ok(None)
        }
    }
}
