//! Build a [`DailyHealthRecord`] from the raw Garmin Connect payloads
//!
//! Extraction is total: a missing or misshapen category only blanks that
//! category's fields, it never fails the record.

use chrono::NaiveDate;
use serde_json::Value;

use super::{DailyHealthRecord, SleepSummary, StressSummary};

/// Raw per-category payloads for one date, as returned by the source.
///
/// `None` means the category could not be fetched at all.
#[derive(Debug, Clone, Default)]
pub struct CategoryPayloads {
    pub steps: Option<Value>,
    pub heart_rate: Option<Value>,
    pub sleep: Option<Value>,
    pub stress: Option<Value>,
}

/// Extract a daily record from the four category payloads
pub fn extract_daily_record(date: NaiveDate, payloads: &CategoryPayloads) -> DailyHealthRecord {
    let heart_rate = payloads.heart_rate.as_ref();

    DailyHealthRecord {
        date,
        total_steps: payloads.steps.as_ref().and_then(sum_steps),
        heart_rate_max: int_field(heart_rate, "maxHeartRate"),
        heart_rate_resting: int_field(heart_rate, "restingHeartRate"),
        seven_day_avg_resting: int_field(heart_rate, "lastSevenDaysAvgRestingHeartRate"),
        sleep: parse_sleep(payloads.sleep.as_ref()),
        stress: parse_stress(payloads.stress.as_ref()),
    }
}

/// Sum `steps` over a list of step intervals.
///
/// Only a JSON array counts as step data; an empty array is a real zero.
/// Entries without a numeric `steps` contribute nothing.
// TODO: entries from several devices for the same interval are summed as-is;
// de-duplicate by device once the payload shape for multi-device days is known.
fn sum_steps(value: &Value) -> Option<i64> {
    let entries = value.as_array()?;
    Some(
        entries
            .iter()
            .filter_map(|entry| entry.get("steps").and_then(value_to_i64))
            .sum(),
    )
}

fn parse_sleep(value: Option<&Value>) -> SleepSummary {
    // Metrics live under dailySleepDTO; without it there is no sleep data.
    let dto = value.and_then(|v| v.get("dailySleepDTO"));

    SleepSummary {
        sleep_time_seconds: int_field(dto, "sleepTimeSeconds"),
        sleep_start_timestamp_gmt: int_field(dto, "sleepStartTimestampGMT"),
        sleep_end_timestamp_gmt: int_field(dto, "sleepEndTimestampGMT"),
        deep_sleep_seconds: int_field(dto, "deepSleepSeconds"),
        light_sleep_seconds: int_field(dto, "lightSleepSeconds"),
        rem_sleep_seconds: int_field(dto, "remSleepSeconds"),
        awake_sleep_seconds: int_field(dto, "awakeSleepSeconds"),
        average_respiration: float_field(dto, "averageRespirationValue"),
        lowest_respiration: float_field(dto, "lowestRespirationValue"),
        highest_respiration: float_field(dto, "highestRespirationValue"),
        average_sleep_stress: float_field(dto, "avgSleepStress"),
    }
}

fn parse_stress(value: Option<&Value>) -> StressSummary {
    StressSummary {
        max_stress_level: int_field(value, "maxStressLevel"),
        average_stress_level: int_field(value, "avgStressLevel"),
    }
}

fn int_field(obj: Option<&Value>, key: &str) -> Option<i64> {
    obj.and_then(|o| o.get(key)).and_then(value_to_i64)
}

fn float_field(obj: Option<&Value>, key: &str) -> Option<f64> {
    obj.and_then(|o| o.get(key)).and_then(|v| v.as_f64())
}

/// Integer view of a JSON number.
///
/// Whole floats such as `42.0` are accepted; a fractional value is treated as
/// absent rather than rounded.
fn value_to_i64(value: &Value) -> Option<i64> {
    if let Some(int) = value.as_i64() {
        return Some(int);
    }
    let float = value.as_f64()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(float as i64)
    } else {
        tracing::debug!(%value, "ignoring non-integer value for integer metric");
        None
    }
}
