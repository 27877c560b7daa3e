//! Per-category health payloads from Garmin Connect
//!
//! The collector only needs four raw JSON documents per date. They are
//! fetched through [`FitnessSource`] so the pipeline can run against a
//! stub in tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::client::{GarminClient, OAuth2Token};
use crate::error::{RelayError, Result};

/// Source of raw daily health payloads
#[async_trait]
pub trait FitnessSource: Send + Sync {
    /// Step intervals for the day (a JSON array of `{"steps": n, ...}`)
    async fn steps(&self, date: NaiveDate) -> Result<Value>;

    /// Daily heart rate summary
    async fn heart_rate(&self, date: NaiveDate) -> Result<Value>;

    /// Sleep data; metrics sit under `dailySleepDTO`
    async fn sleep(&self, date: NaiveDate) -> Result<Value>;

    /// Daily stress summary
    async fn stress(&self, date: NaiveDate) -> Result<Value>;
}

/// [`FitnessSource`] backed by the Garmin Connect API
pub struct GarminSource {
    client: GarminClient,
    token: OAuth2Token,
    display_name: OnceCell<String>,
}

impl GarminSource {
    pub fn new(client: GarminClient, token: OAuth2Token) -> Self {
        Self {
            client,
            token,
            display_name: OnceCell::new(),
        }
    }

    /// Fetch and cache the user's display name
    async fn display_name(&self) -> Result<&str> {
        let name = self
            .display_name
            .get_or_try_init(|| async {
                let profile: Value = self
                    .client
                    .get_json(&self.token, "/userprofile-service/socialProfile")
                    .await?;

                profile
                    .get("displayName")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
                    .ok_or_else(|| RelayError::invalid_response("Could not get display name"))
            })
            .await?;
        Ok(name.as_str())
    }
}

#[async_trait]
impl FitnessSource for GarminSource {
    async fn steps(&self, date: NaiveDate) -> Result<Value> {
        let display_name = self.display_name().await?;
        let path = format!(
            "/wellness-service/wellness/dailySummaryChart/{}?date={}",
            display_name, date
        );
        self.client.get_json(&self.token, &path).await
    }

    async fn heart_rate(&self, date: NaiveDate) -> Result<Value> {
        let display_name = self.display_name().await?;
        let path = format!(
            "/wellness-service/wellness/dailyHeartRate/{}?date={}",
            display_name, date
        );
        self.client.get_json(&self.token, &path).await
    }

    async fn sleep(&self, date: NaiveDate) -> Result<Value> {
        let display_name = self.display_name().await?;
        let path = format!(
            "/wellness-service/wellness/dailySleepData/{}?date={}&nonSleepBufferMinutes=60",
            display_name, date
        );
        self.client.get_json(&self.token, &path).await
    }

    async fn stress(&self, date: NaiveDate) -> Result<Value> {
        let path = format!("/wellness-service/wellness/dailyStress/{}", date);
        self.client.get_json(&self.token, &path).await
    }
}
