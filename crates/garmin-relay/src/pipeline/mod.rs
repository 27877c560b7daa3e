//! The two batch pipelines
//!
//! - [`Collector`]: Garmin Connect to the series store, one point per date
//! - [`Reporter`]: series store to evaluation prompts and the inference endpoint

pub mod collector;
pub mod reporter;

pub use collector::{CollectReport, Collector, DateOutcome, DateStatus};
pub use reporter::{ReportSummary, Reporter};
