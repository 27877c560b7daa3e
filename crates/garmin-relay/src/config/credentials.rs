use crate::client::OAuth2Token;
use crate::config::GarminConfig;
use crate::error::{RelayError, Result};
use std::fs;
use std::path::PathBuf;

const OAUTH2_FILENAME: &str = "oauth2_token.json";

/// Read-only access to Garmin tokens stored by a previous login.
///
/// Tokens live in `<data_dir>/garmin/<profile>/`, the layout garmin-cli
/// writes. Logging in and refreshing are not handled here.
pub struct CredentialStore {
    profile: String,
    base_dir: PathBuf,
}

impl CredentialStore {
    /// Open the credential store for the given profile
    pub fn new(profile: impl Into<String>) -> Result<Self> {
        let profile = profile.into();
        let base_dir = super::garmin_data_dir()?.join(&profile);
        Ok(Self { profile, base_dir })
    }

    /// Open a credential store under a custom base directory (for testing)
    pub fn with_dir(profile: impl Into<String>, base_dir: PathBuf) -> Self {
        let profile = profile.into();
        let base_dir = base_dir.join(&profile);
        Self { profile, base_dir }
    }

    /// Get the profile name
    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Load the OAuth2 token, if one was stored
    pub fn load_oauth2(&self) -> Result<Option<OAuth2Token>> {
        let path = self.base_dir.join(OAUTH2_FILENAME);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        let token: OAuth2Token = serde_json::from_str(&json)?;
        Ok(Some(token))
    }

    /// Resolve the token to use for this run.
    ///
    /// A token in configuration wins; otherwise the stored token must exist
    /// and not be expired.
    pub fn resolve(&self, config: &GarminConfig) -> Result<OAuth2Token> {
        if let Some(token) = config.access_token.as_deref().filter(|t| !t.is_empty()) {
            return Ok(OAuth2Token::from_access_token(token));
        }

        let token = self.load_oauth2()?.ok_or(RelayError::NotAuthenticated)?;
        if token.is_expired() {
            tracing::warn!(profile = %self.profile, "stored Garmin access token has expired");
            return Err(RelayError::NotAuthenticated);
        }
        Ok(token)
    }
}
