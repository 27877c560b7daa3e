//! Daily health records and the fixed set of metric fields
//!
//! A [`DailyHealthRecord`] is what the collector builds for one calendar
//! date. Every metric is optional: a value missing upstream stays `None` all
//! the way to storage, where it is simply not written.

pub mod extract;
pub mod flatten;

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

pub use extract::{extract_daily_record, CategoryPayloads};
pub use flatten::{flatten, FlatRecord};

/// A single scalar metric value.
///
/// Integer metrics stay integers end to end; only respiration and sleep
/// stress are floats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Int(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<i64> for MetricValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for MetricValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

/// Every metric field the pipeline knows about.
///
/// The snake_case name is the field key in the time-series store; the label
/// is what the prompt shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HealthField {
    TotalSteps,
    HeartRateMax,
    HeartRateResting,
    SevenDayAvgResting,
    SleepTimeSeconds,
    SleepStartTimestampGmt,
    SleepEndTimestampGmt,
    DeepSleepSeconds,
    LightSleepSeconds,
    RemSleepSeconds,
    AwakeSleepSeconds,
    AverageRespiration,
    LowestRespiration,
    HighestRespiration,
    AverageSleepStress,
    MaxStressLevel,
    AverageStressLevel,
}

impl HealthField {
    /// All fields in record order (the order they are written).
    pub const ALL: [HealthField; 17] = [
        HealthField::TotalSteps,
        HealthField::HeartRateMax,
        HealthField::HeartRateResting,
        HealthField::SevenDayAvgResting,
        HealthField::SleepTimeSeconds,
        HealthField::SleepStartTimestampGmt,
        HealthField::SleepEndTimestampGmt,
        HealthField::DeepSleepSeconds,
        HealthField::LightSleepSeconds,
        HealthField::RemSleepSeconds,
        HealthField::AwakeSleepSeconds,
        HealthField::AverageRespiration,
        HealthField::LowestRespiration,
        HealthField::HighestRespiration,
        HealthField::AverageSleepStress,
        HealthField::MaxStressLevel,
        HealthField::AverageStressLevel,
    ];

    /// Field key in the time-series store
    pub fn name(&self) -> &'static str {
        match self {
            Self::TotalSteps => "total_steps",
            Self::HeartRateMax => "heart_rate_max",
            Self::HeartRateResting => "heart_rate_resting",
            Self::SevenDayAvgResting => "seven_day_avg_resting",
            Self::SleepTimeSeconds => "sleep_time_seconds",
            Self::SleepStartTimestampGmt => "sleep_start_timestamp_gmt",
            Self::SleepEndTimestampGmt => "sleep_end_timestamp_gmt",
            Self::DeepSleepSeconds => "deep_sleep_seconds",
            Self::LightSleepSeconds => "light_sleep_seconds",
            Self::RemSleepSeconds => "rem_sleep_seconds",
            Self::AwakeSleepSeconds => "awake_sleep_seconds",
            Self::AverageRespiration => "average_respiration",
            Self::LowestRespiration => "lowest_respiration",
            Self::HighestRespiration => "highest_respiration",
            Self::AverageSleepStress => "average_sleep_stress",
            Self::MaxStressLevel => "max_stress_level",
            Self::AverageStressLevel => "average_stress_level",
        }
    }

    /// Human label used in prompts
    pub fn label(&self) -> &'static str {
        match self {
            Self::TotalSteps => "Total Steps",
            Self::HeartRateMax => "Heart Rate Max",
            Self::HeartRateResting => "Heart Rate Resting",
            Self::SevenDayAvgResting => "Seven Day Avg Resting",
            Self::SleepTimeSeconds => "Sleep Time Seconds",
            Self::SleepStartTimestampGmt => "Sleep Start",
            Self::SleepEndTimestampGmt => "Sleep End",
            Self::DeepSleepSeconds => "Deep Sleep Seconds",
            Self::LightSleepSeconds => "Light Sleep Seconds",
            Self::RemSleepSeconds => "REM Sleep Seconds",
            Self::AwakeSleepSeconds => "Awake Sleep Seconds",
            Self::AverageRespiration => "Average Respiration",
            Self::LowestRespiration => "Lowest Respiration",
            Self::HighestRespiration => "Highest Respiration",
            Self::AverageSleepStress => "Average Sleep Stress",
            Self::MaxStressLevel => "Max Stress Level",
            Self::AverageStressLevel => "Average Stress Level",
        }
    }

    /// Whether the field is stored as a float rather than an integer
    pub fn is_float(&self) -> bool {
        matches!(
            self,
            Self::AverageRespiration
                | Self::LowestRespiration
                | Self::HighestRespiration
                | Self::AverageSleepStress
        )
    }

    /// The default allow-list: the names of every known field
    pub fn known_names() -> Vec<String> {
        Self::ALL.iter().map(|f| f.name().to_string()).collect()
    }
}

impl fmt::Display for HealthField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for HealthField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .ok_or_else(|| format!("unknown health field '{}'", s))
    }
}

/// Sleep metrics taken from the `dailySleepDTO` object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SleepSummary {
    pub sleep_time_seconds: Option<i64>,
    /// Epoch milliseconds, GMT
    pub sleep_start_timestamp_gmt: Option<i64>,
    /// Epoch milliseconds, GMT
    pub sleep_end_timestamp_gmt: Option<i64>,
    pub deep_sleep_seconds: Option<i64>,
    pub light_sleep_seconds: Option<i64>,
    pub rem_sleep_seconds: Option<i64>,
    pub awake_sleep_seconds: Option<i64>,
    pub average_respiration: Option<f64>,
    pub lowest_respiration: Option<f64>,
    pub highest_respiration: Option<f64>,
    pub average_sleep_stress: Option<f64>,
}

/// Daily stress levels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StressSummary {
    pub max_stress_level: Option<i64>,
    pub average_stress_level: Option<i64>,
}

/// All collected metrics for one calendar date
#[derive(Debug, Clone, PartialEq)]
pub struct DailyHealthRecord {
    pub date: NaiveDate,
    pub total_steps: Option<i64>,
    pub heart_rate_max: Option<i64>,
    pub heart_rate_resting: Option<i64>,
    pub seven_day_avg_resting: Option<i64>,
    pub sleep: SleepSummary,
    pub stress: StressSummary,
}

impl DailyHealthRecord {
    /// A record for `date` with every metric absent
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            total_steps: None,
            heart_rate_max: None,
            heart_rate_resting: None,
            seven_day_avg_resting: None,
            sleep: SleepSummary::default(),
            stress: StressSummary::default(),
        }
    }

    /// Look up one metric
    pub fn get(&self, field: HealthField) -> Option<MetricValue> {
        use HealthField::*;

        let int = |v: Option<i64>| v.map(MetricValue::Int);
        let float = |v: Option<f64>| v.map(MetricValue::Float);

        match field {
            TotalSteps => int(self.total_steps),
            HeartRateMax => int(self.heart_rate_max),
            HeartRateResting => int(self.heart_rate_resting),
            SevenDayAvgResting => int(self.seven_day_avg_resting),
            SleepTimeSeconds => int(self.sleep.sleep_time_seconds),
            SleepStartTimestampGmt => int(self.sleep.sleep_start_timestamp_gmt),
            SleepEndTimestampGmt => int(self.sleep.sleep_end_timestamp_gmt),
            DeepSleepSeconds => int(self.sleep.deep_sleep_seconds),
            LightSleepSeconds => int(self.sleep.light_sleep_seconds),
            RemSleepSeconds => int(self.sleep.rem_sleep_seconds),
            AwakeSleepSeconds => int(self.sleep.awake_sleep_seconds),
            AverageRespiration => float(self.sleep.average_respiration),
            LowestRespiration => float(self.sleep.lowest_respiration),
            HighestRespiration => float(self.sleep.highest_respiration),
            AverageSleepStress => float(self.sleep.average_sleep_stress),
            MaxStressLevel => int(self.stress.max_stress_level),
            AverageStressLevel => int(self.stress.average_stress_level),
        }
    }

    /// Present metrics in record order
    pub fn present_fields(&self) -> impl Iterator<Item = (HealthField, MetricValue)> + '_ {
        HealthField::ALL
            .iter()
            .filter_map(move |&field| self.get(field).map(|value| (field, value)))
    }

    /// True when no metric has a value
    pub fn is_empty(&self) -> bool {
        self.present_fields().next().is_none()
    }
}
