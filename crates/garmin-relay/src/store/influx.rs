//! InfluxDB v2 series store
//!
//! Writes go to `/api/v2/write` as line protocol with second precision;
//! queries go to `/api/v2/query` as Flux and come back as annotated CSV.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Response, StatusCode};
use serde_json::json;

use super::flux_csv::parse_points;
use super::{SeriesStore, StoredPoint, TimeRange};
use crate::config::InfluxConfig;
use crate::error::{RelayError, Result};
use crate::health::{FlatRecord, MetricValue};

/// InfluxDB v2 client scoped to one org and bucket
pub struct InfluxStore {
    client: Client,
    base_url: String,
    token: String,
    org: String,
    bucket: String,
}

impl InfluxStore {
    /// Create a store from configuration
    pub fn new(config: &InfluxConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RelayError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            org: config.org.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("Token {}", self.token))
            .map_err(|_| RelayError::config("InfluxDB token contains invalid characters"))?;
        headers.insert(AUTHORIZATION, auth);
        Ok(headers)
    }

    /// Map non-success statuses to errors, keeping the response body
    async fn handle_response_status(&self, response: Response) -> Result<Response> {
        let status = response.status();

        match status {
            s if s.is_success() => Ok(response),
            StatusCode::TOO_MANY_REQUESTS => Err(RelayError::RateLimited),
            _ => {
                let body = response.text().await.unwrap_or_default();
                Err(RelayError::Api {
                    status: status.as_u16(),
                    message: influx_message(&body),
                })
            }
        }
    }
}

#[async_trait]
impl SeriesStore for InfluxStore {
    async fn write(&self, series: &str, record: &FlatRecord) -> Result<()> {
        if record.is_empty() {
            return Err(RelayError::store("point has no fields"));
        }

        let body = line_protocol(series, record);
        tracing::debug!(line = %body, "writing point");

        let mut headers = self.build_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));

        let response = self
            .client
            .post(self.build_url("/api/v2/write"))
            .headers(headers)
            .query(&[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ])
            .body(body)
            .send()
            .await?;

        self.handle_response_status(response).await?;
        Ok(())
    }

    async fn query(
        &self,
        series: &str,
        range: &TimeRange,
        fields: &[String],
    ) -> Result<Vec<StoredPoint>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }

        let flux = flux_query(&self.bucket, series, range, fields);
        tracing::debug!(query = %flux, "querying points");

        let mut headers = self.build_headers()?;
        headers.insert(ACCEPT, HeaderValue::from_static("application/csv"));

        let response = self
            .client
            .post(self.build_url("/api/v2/query"))
            .headers(headers)
            .query(&[("org", self.org.as_str())])
            .json(&json!({
                "query": flux,
                "type": "flux",
                "dialect": {
                    "header": true,
                    "delimiter": ",",
                    "annotations": ["datatype"]
                }
            }))
            .send()
            .await?;

        let response = self.handle_response_status(response).await?;
        let body = response.text().await?;
        parse_points(&body)
    }
}

/// Render one point as a line protocol line with a seconds timestamp
pub(crate) fn line_protocol(series: &str, record: &FlatRecord) -> String {
    let mut line = escape(series, &[',', ' ']);

    for (key, value) in &record.tags {
        line.push(',');
        line.push_str(&escape(key, &[',', '=', ' ']));
        line.push('=');
        line.push_str(&escape(value, &[',', '=', ' ']));
    }

    let fields: Vec<String> = record
        .fields
        .iter()
        .map(|(name, value)| {
            let value = match value {
                MetricValue::Int(v) => format!("{}i", v),
                MetricValue::Float(v) => format!("{}", v),
            };
            format!("{}={}", escape(name, &[',', '=', ' ']), value)
        })
        .collect();

    line.push(' ');
    line.push_str(&fields.join(","));
    line.push(' ');
    line.push_str(&record.timestamp.timestamp().to_string());
    line
}

/// Build the Flux query for a series, window and field allow-list
pub(crate) fn flux_query(
    bucket: &str,
    series: &str,
    range: &TimeRange,
    fields: &[String],
) -> String {
    let field_filter = fields
        .iter()
        .map(|f| format!("r[\"_field\"] == \"{}\"", flux_string(f)))
        .collect::<Vec<_>>()
        .join(" or ");

    format!(
        "from(bucket: \"{bucket}\")\n  \
         |> range(start: {start}, stop: {stop})\n  \
         |> filter(fn: (r) => r[\"_measurement\"] == \"{series}\")\n  \
         |> filter(fn: (r) => {field_filter})",
        bucket = flux_string(bucket),
        start = range.start.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        stop = range.stop.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        series = flux_string(series),
        field_filter = field_filter,
    )
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn flux_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// InfluxDB error bodies are `{"code": ..., "message": ...}`; fall back to the raw body
fn influx_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.to_string())
}
