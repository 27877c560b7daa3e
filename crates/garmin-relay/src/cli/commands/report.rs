//! Report command: stored health data to evaluation prompts

use chrono::{DateTime, Local, NaiveTime, Utc};

use crate::config::{validate_days, Config};
use crate::error::{format_user_error, Result};
use crate::pipeline::{ReportSummary, Reporter};
use crate::report::InferenceClient;
use crate::store::{InfluxStore, TimeRange};

/// Execute the report command
pub async fn run(config: &Config, days: Option<u32>, dry_run: bool) -> Result<()> {
    let days = days.unwrap_or(config.report.days);
    validate_days("--days", days)?;

    config.influxdb.validate()?;
    let store = InfluxStore::new(&config.influxdb)?;
    let client = if dry_run {
        println!("Dry run mode - prompts will not be sent");
        None
    } else {
        Some(InferenceClient::new(&config.inference)?)
    };

    let range = TimeRange::trailing_days(days, end_of_local_day());
    let reporter = Reporter::new(&store, &config.influxdb.measurement, &config.report.fields);

    let summary = match reporter.run(&range, client.as_ref()).await {
        Ok(summary) => summary,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            eprintln!("Error: {}", format_user_error(&e));
            return Ok(());
        }
    };

    print_summary(&summary, dry_run);
    Ok(())
}

/// Last second of today's local calendar date, on the UTC clock that stored
/// points are stamped with
fn end_of_local_day() -> DateTime<Utc> {
    let end = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    Local::now().date_naive().and_time(end).and_utc()
}

fn print_summary(summary: &ReportSummary, dry_run: bool) {
    if summary.prompts.is_empty() {
        println!("No Garmin health data to send.");
        return;
    }

    if dry_run {
        for record in &summary.prompts {
            println!("\n{}", record.prompt);
        }
    }

    println!("\nReport complete: {}", summary);

    let Some(outcome) = &summary.dispatch else {
        return;
    };
    println!("{}", outcome);

    for (i, text) in outcome.completions().iter().enumerate() {
        let timestamp = summary.prompts.get(i).map_or("", |p| p.timestamp.as_str());
        println!("\n--- {} ---\n{}", timestamp, text.trim());
    }
}
