//! Reporter pipeline: time-series store to the inference endpoint

use std::fmt;

use crate::error::Result;
use crate::report::{build_prompts, pivot, DispatchOutcome, InferenceClient, PromptRecord};
use crate::store::{SeriesStore, TimeRange};

/// What a reporter run produced
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSummary {
    /// Points returned by the store query
    pub points: usize,
    /// Points dropped because their field is not reported on
    pub ignored: usize,
    /// Points dropped because their timestamp could not be parsed
    pub unparseable: usize,
    /// One prompt per timestamp, in query order
    pub prompts: Vec<PromptRecord>,
    /// `None` when nothing was sent (dry run or no data)
    pub dispatch: Option<DispatchOutcome>,
}

impl ReportSummary {
    /// Whether the run did everything it was asked to
    pub fn is_success(&self) -> bool {
        self.dispatch.as_ref().map_or(true, DispatchOutcome::is_success)
    }
}

impl fmt::Display for ReportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Points: {}, Prompts: {}, Ignored: {}, Unparseable: {}",
            self.points,
            self.prompts.len(),
            self.ignored,
            self.unparseable
        )
    }
}

/// Runs the reporter against a store
pub struct Reporter<'a> {
    store: &'a dyn SeriesStore,
    series: &'a str,
    fields: &'a [String],
}

impl<'a> Reporter<'a> {
    pub fn new(store: &'a dyn SeriesStore, series: &'a str, fields: &'a [String]) -> Self {
        Self {
            store,
            series,
            fields,
        }
    }

    /// Query `range`, build prompts and hand them to `client`.
    ///
    /// With no client the prompts are built but not sent. A store failure is
    /// returned as an error; a failed dispatch is reported in the summary.
    pub async fn run(
        &self,
        range: &TimeRange,
        client: Option<&InferenceClient>,
    ) -> Result<ReportSummary> {
        let points = self.store.query(self.series, range, self.fields).await?;
        let count = points.len();
        tracing::info!(
            points = count,
            start = %range.start,
            stop = %range.stop,
            "queried stored health data"
        );

        let pivot = pivot(points, self.fields);
        let (ignored, unparseable) = (pivot.ignored, pivot.unparseable);
        let prompts = build_prompts(pivot.groups);
        if ignored > 0 || unparseable > 0 {
            tracing::debug!(ignored, unparseable, "points left out of prompts");
        }

        let dispatch = match client {
            Some(_) if prompts.is_empty() => {
                tracing::info!("no stored health data to send");
                None
            }
            Some(client) => {
                let texts: Vec<String> = prompts.iter().map(|p| p.prompt.clone()).collect();
                let outcome = client.dispatch(&texts).await;
                if outcome.is_success() {
                    tracing::info!(prompts = texts.len(), "prompts delivered");
                } else {
                    tracing::error!(%outcome, "prompt dispatch failed");
                }
                Some(outcome)
            }
            None => None,
        };

        Ok(ReportSummary {
            points: count,
            ignored,
            unparseable,
            prompts,
            dispatch,
        })
    }
}
