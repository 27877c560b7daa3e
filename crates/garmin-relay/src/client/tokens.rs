use chrono::Utc;
use serde::{Deserialize, Serialize};

/// OAuth2 Bearer token for Connect API requests.
///
/// Same shape as the `oauth2_token.json` garmin-cli stores after login, so an
/// existing login can be reused as-is.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OAuth2Token {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default)]
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token_expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires_at: i64,
}

impl OAuth2Token {
    /// Wrap a raw access token supplied through configuration.
    ///
    /// Its lifetime is unknown, so it is never considered expired locally;
    /// the API rejects it with 401 once it is.
    pub fn from_access_token(access_token: impl Into<String>) -> Self {
        Self {
            scope: String::new(),
            jti: String::new(),
            token_type: "Bearer".to_string(),
            access_token: access_token.into(),
            refresh_token: String::new(),
            expires_in: 0,
            expires_at: i64::MAX,
            refresh_token_expires_in: 0,
            refresh_token_expires_at: 0,
        }
    }

    /// Check if the access token has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now().timestamp()
    }

    /// Returns the Authorization header value.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}
