//! Installed-application client secrets.
//!
//! Google's developer console issues a `credentials.json` of the form
//! `{"installed": {"client_id": ..., "client_secret": ..., "auth_uri": ...,
//! "token_uri": ...}}` (or `"web"` for web clients).

use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::flow::OAuthClient;
use crate::provider::Provider;

/// Client identity read from a client-secrets file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Authorization endpoint override.
    #[serde(default)]
    pub auth_uri: Option<String>,
    /// Token endpoint override.
    #[serde(default)]
    pub token_uri: Option<String>,
}

#[derive(Deserialize)]
struct SecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parses the JSON contents of a client-secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has neither an
    /// `installed` nor a `web` section.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: SecretsFile = serde_json::from_str(json)?;
        let secrets = file.installed.or(file.web).ok_or_else(|| {
            Error::InvalidConfig("client secrets have no \"installed\" or \"web\" section".into())
        })?;

        if secrets.client_id.is_empty() {
            return Err(Error::InvalidConfig("client_id is empty".into()));
        }
        Ok(secrets)
    }

    /// Reads and parses a client-secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Builds an OAuth client for `provider`, applying any endpoint overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint override is not a valid URL or the
    /// resulting provider has no scopes.
    pub fn into_client(self, mut provider: Provider) -> Result<OAuthClient> {
        if let Some(auth_uri) = &self.auth_uri {
            provider = provider.with_auth_url(auth_uri)?;
        }
        if let Some(token_uri) = &self.token_uri {
            provider = provider.with_token_url(token_uri)?;
        }
        provider.validate()?;

        let client = OAuthClient::new(self.client_id, provider);
        Ok(match self.client_secret {
            Some(secret) if !secret.is_empty() => client.with_client_secret(secret),
            _ => client,
        })
    }
}
