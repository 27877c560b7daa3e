use thiserror::Error;

/// Main error type for garmin-relay
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Authentication required. Log in with 'garmin auth login' or set GARMIN_ACCESS_TOKEN.")]
    NotAuthenticated,

    #[error("Rate limited. Please wait before retrying.")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid date format: {0}. Expected YYYY-MM-DD")]
    InvalidDateFormat(String),
}

pub type Result<T> = std::result::Result<T, RelayError>;

impl RelayError {
    /// Create a configuration error from a message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid response error from a message
    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Create a store error from a message
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether this error means the whole run cannot proceed, as opposed to
    /// one date or one request failing.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::NotAuthenticated | Self::Config(_) | Self::TomlParse(_)
        )
    }
}

/// Render an error as the single line shown to the user on exit.
pub fn format_user_error(err: &RelayError) -> String {
    match err {
        RelayError::Http(e) if e.is_connect() => {
            format!("could not connect to {}", e.url().map(|u| u.as_str()).unwrap_or("server"))
        }
        RelayError::Http(e) if e.is_timeout() => "request timed out".to_string(),
        other => other.to_string(),
    }
}
