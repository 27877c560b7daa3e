//! Render a timestamp's metrics as an evaluation prompt

use std::collections::BTreeMap;

use super::pivot::TimedFieldGroup;
use crate::health::{HealthField, MetricValue};

/// Marker for a metric with no stored value
pub const MISSING: &str = "N/A";

/// Order metrics appear in the prompt
pub const PROMPT_ORDER: [HealthField; 17] = [
    HealthField::AverageRespiration,
    HealthField::AverageSleepStress,
    HealthField::TotalSteps,
    HealthField::SevenDayAvgResting,
    HealthField::RemSleepSeconds,
    HealthField::MaxStressLevel,
    HealthField::LowestRespiration,
    HealthField::LightSleepSeconds,
    HealthField::HighestRespiration,
    HealthField::HeartRateResting,
    HealthField::HeartRateMax,
    HealthField::DeepSleepSeconds,
    HealthField::AwakeSleepSeconds,
    HealthField::AverageStressLevel,
    HealthField::SleepTimeSeconds,
    HealthField::SleepStartTimestampGmt,
    HealthField::SleepEndTimestampGmt,
];

/// A prompt together with the data it was built from
#[derive(Debug, Clone, PartialEq)]
pub struct PromptRecord {
    pub timestamp: String,
    pub fields: BTreeMap<String, MetricValue>,
    pub prompt: String,
}

/// Build the prompt text for one timestamp
pub fn format_prompt(timestamp: &str, fields: &BTreeMap<String, MetricValue>) -> String {
    let metrics = PROMPT_ORDER
        .iter()
        .map(|field| {
            let value = fields
                .get(field.name())
                .map(render_value)
                .unwrap_or_else(|| MISSING.to_string());
            format!("{}: {}", field.label(), value)
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Please evaluate my health data for {}, {} \
         and provide recommendations for improving my health.",
        timestamp, metrics
    )
}

/// Build prompt records for pivoted groups, keeping their order
pub fn build_prompts(groups: Vec<TimedFieldGroup>) -> Vec<PromptRecord> {
    groups
        .into_iter()
        .map(|group| PromptRecord {
            prompt: format_prompt(&group.timestamp, &group.fields),
            timestamp: group.timestamp,
            fields: group.fields,
        })
        .collect()
}

/// Floats always show a decimal point so `14.0` is not mistaken for a count
fn render_value(value: &MetricValue) -> String {
    match value {
        MetricValue::Int(v) => v.to_string(),
        MetricValue::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{:.1}", v),
        MetricValue::Float(v) => v.to_string(),
    }
}
