//! Send prompts to the local inference endpoint
//!
//! All prompts for a run go out in one request as `{"prompt": [...]}`, the
//! batch form of the OpenAI-style `/v1/completions` API that LM Studio
//! serves. There is no retry; the outcome is returned to the caller.

use std::fmt;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;

use crate::config::InferenceConfig;
use crate::error::{RelayError, Result};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// What happened to a dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// Endpoint accepted the prompts
    Delivered { status: u16, body: String },
    /// Endpoint answered with a non-success status
    Rejected { status: u16, body: String },
    /// No HTTP response at all (connection refused, timeout, ...)
    Unreachable { error: String },
}

impl DispatchOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    /// Completion texts from an OpenAI-style response body, in choice order
    pub fn completions(&self) -> Vec<String> {
        let Self::Delivered { body, .. } = self else {
            return Vec::new();
        };

        let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
            return Vec::new();
        };

        json.get("choices")
            .and_then(|c| c.as_array())
            .map(|choices| {
                choices
                    .iter()
                    .filter_map(|choice| {
                        choice
                            .get("text")
                            .and_then(|t| t.as_str())
                            .or_else(|| {
                                choice
                                    .get("message")
                                    .and_then(|m| m.get("content"))
                                    .and_then(|t| t.as_str())
                            })
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl fmt::Display for DispatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { status, .. } => write!(f, "Data sent successfully (HTTP {})", status),
            Self::Rejected { status, body } => {
                write!(f, "Failed to send data. Status code: {}. Response: {}", status, body)
            }
            Self::Unreachable { error } => write!(f, "Failed to send data: {}", error),
        }
    }
}

/// Client for the inference endpoint
pub struct InferenceClient {
    client: Client,
    url: String,
    model: Option<String>,
    max_tokens: Option<u32>,
}

impl InferenceClient {
    pub fn new(config: &InferenceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| RelayError::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Post every prompt in one request
    pub async fn dispatch(&self, prompts: &[String]) -> DispatchOutcome {
        let request = CompletionRequest {
            prompt: prompts,
            model: self.model.as_deref(),
            max_tokens: self.max_tokens,
        };

        let response = match self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                return DispatchOutcome::Unreachable {
                    error: e.to_string(),
                }
            }
        };

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if status.is_success() {
            DispatchOutcome::Delivered {
                status: status.as_u16(),
                body,
            }
        } else {
            DispatchOutcome::Rejected {
                status: status.as_u16(),
                body,
            }
        }
    }
}
