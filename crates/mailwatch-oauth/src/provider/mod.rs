//! `OAuth2` provider configurations.

use crate::error::{Error, Result};
use url::Url;

/// Read-only Gmail API scope.
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// `OAuth2` provider configuration.
#[derive(Debug, Clone)]
pub struct Provider {
    /// Provider name (e.g., "Google").
    pub name: String,
    /// Authorization endpoint URL.
    pub auth_url: Url,
    /// Token endpoint URL.
    pub token_url: Url,
    /// Default scopes.
    pub default_scopes: Vec<String>,
}

impl Provider {
    /// Creates a new provider configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if URLs are invalid.
    pub fn new(
        name: impl Into<String>,
        auth_url: impl AsRef<str>,
        token_url: impl AsRef<str>,
    ) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            auth_url: Url::parse(auth_url.as_ref())?,
            token_url: Url::parse(token_url.as_ref())?,
            default_scopes: Vec::new(),
        })
    }

    /// Sets the default scopes.
    #[must_use]
    pub fn with_default_scopes(mut self, scopes: Vec<String>) -> Self {
        self.default_scopes = scopes;
        self
    }

    /// Replaces the token endpoint.
    ///
    /// Client-secret files carry their own `token_uri`; this lets them
    /// override the built-in one.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_token_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.token_url = Url::parse(url.as_ref())?;
        Ok(self)
    }

    /// Replaces the authorization endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn with_auth_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.auth_url = Url::parse(url.as_ref())?;
        Ok(self)
    }

    /// Google `OAuth2` provider configured for read-only Gmail API access.
    ///
    /// # Errors
    ///
    /// Returns an error if URL parsing fails.
    pub fn gmail_readonly() -> Result<Self> {
        Ok(Self::new(
            "Google",
            "https://accounts.google.com/o/oauth2/v2/auth",
            "https://oauth2.googleapis.com/token",
        )?
        .with_default_scopes(vec![GMAIL_READONLY_SCOPE.to_string()]))
    }

    /// Validates that required URLs are set.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.auth_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("auth_url is empty".into()));
        }
        if self.token_url.as_str().is_empty() {
            return Err(Error::InvalidConfig("token_url is empty".into()));
        }
        if self.default_scopes.is_empty() {
            return Err(Error::InvalidConfig("no scopes configured".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_gmail_provider() {
        let provider = Provider::gmail_readonly().unwrap();
        assert_eq!(provider.name, "Google");
        assert_eq!(provider.default_scopes, vec![GMAIL_READONLY_SCOPE.to_string()]);
        provider.validate().unwrap();
    }

    #[test]
    fn test_token_url_override() {
        let provider = Provider::gmail_readonly()
            .unwrap()
            .with_token_url("http://127.0.0.1:9999/token")
            .unwrap();
        assert_eq!(provider.token_url.as_str(), "http://127.0.0.1:9999/token");
    }

    #[test]
    fn test_custom_provider_requires_scopes() {
        let provider = Provider::new(
            "Custom",
            "https://auth.example.com/authorize",
            "https://auth.example.com/token",
        )
        .unwrap();
        assert!(provider.validate().is_err());

        let provider = provider.with_default_scopes(vec!["mail.read".to_string()]);
        provider.validate().unwrap();
    }

    #[test]
    fn test_invalid_url_rejected() {
        assert!(Provider::new("Broken", "not a url", "https://example.com/token").is_err());
    }
}
