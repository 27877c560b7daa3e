//! Collect command: Garmin Connect daily health data into InfluxDB

use chrono::{Local, NaiveDate};

use crate::client::{GarminClient, GarminSource};
use crate::config::{validate_days, Config, CredentialStore};
use crate::error::{RelayError, Result};
use crate::health::flatten;
use crate::pipeline::{CollectReport, Collector, DateStatus};
use crate::store::{InfluxStore, MemoryStore};

/// Execute the collect command
pub async fn run(
    config: &Config,
    date: Option<String>,
    days: Option<u32>,
    dry_run: bool,
) -> Result<()> {
    let days = days.unwrap_or(config.collect.days);
    validate_days("--days", days)?;
    let today = match date {
        Some(d) => parse_date(&d)?,
        None => Local::now().date_naive(),
    };

    let credentials = CredentialStore::new(config.garmin.profile.clone())?;
    let token = credentials.resolve(&config.garmin)?;
    println!("Profile: {}", credentials.profile());
    let client = GarminClient::new(&config.garmin.domain)?;
    let source = GarminSource::new(client, token);
    let series = config.influxdb.measurement.as_str();

    let report = if dry_run {
        println!("Dry run mode - nothing will be written");
        let store = MemoryStore::new();
        Collector::new(&source, &store, series).run(today, days).await?
    } else {
        config.influxdb.validate()?;
        let store = InfluxStore::new(&config.influxdb)?;
        println!(
            "Writing to {} (bucket: {}, measurement: {})",
            config.influxdb.url, config.influxdb.bucket, series
        );
        Collector::new(&source, &store, series).run(today, days).await?
    };

    print_report(&report, dry_run);
    Ok(())
}

/// Parse a YYYY-MM-DD date argument
fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| RelayError::InvalidDateFormat(s.to_string()))
}

fn print_report(report: &CollectReport, dry_run: bool) {
    println!();
    for outcome in &report.outcomes {
        match &outcome.status {
            DateStatus::Written { fields } if dry_run => {
                println!("{}  {} fields", outcome.date, fields)
            }
            DateStatus::Written { fields } => {
                println!("{}  written ({} fields)", outcome.date, fields)
            }
            DateStatus::Empty => println!("{}  no data", outcome.date),
            DateStatus::Failed { reason } => println!("{}  failed: {}", outcome.date, reason),
        }

        if dry_run {
            if let Some(record) = &outcome.record {
                for (name, value) in flatten(record).fields {
                    println!("    {:<28} {}", name, value);
                }
            }
        }
    }

    println!("\nCollect complete: {}", report);
}
