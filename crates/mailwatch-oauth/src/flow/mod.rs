//! `OAuth2` client and token endpoint.
//!
//! Both grants used here, the authorization code obtained through the
//! loopback redirect and the refresh token kept in storage, are redeemed by
//! posting a form to the provider's token endpoint. [`Grant`] describes that
//! form; [`OAuthClient::redeem`] sends it.

mod code;
mod loopback;
mod pkce;

pub use code::AuthorizationCodeFlow;
pub use loopback::LoopbackRedirect;
pub use pkce::PkceChallenge;

use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::provider::Provider;
use crate::token::{ErrorResponse, Token, TokenResponse};

/// An installed application registered with a provider.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    pub(crate) client_id: String,
    pub(crate) client_secret: Option<String>,
    pub(crate) provider: Provider,
    http: Client,
}

/// What is being traded at the token endpoint.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Grant<'a> {
    /// Code returned to the loopback redirect.
    AuthorizationCode {
        code: &'a str,
        redirect_uri: &'a str,
        verifier: Option<&'a str>,
    },
    /// Long-lived refresh token.
    Refresh { refresh_token: &'a str },
}

impl<'a> Grant<'a> {
    const fn name(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::Refresh { .. } => "refresh_token",
        }
    }

    fn form(&self) -> Vec<(&'static str, &'a str)> {
        let mut form = vec![("grant_type", self.name())];
        match *self {
            Self::AuthorizationCode {
                code,
                redirect_uri,
                verifier,
            } => {
                form.push(("code", code));
                form.push(("redirect_uri", redirect_uri));
                if let Some(verifier) = verifier {
                    form.push(("code_verifier", verifier));
                }
            }
            Self::Refresh { refresh_token } => form.push(("refresh_token", refresh_token)),
        }
        form
    }
}

impl OAuthClient {
    /// Creates a public client (no secret).
    #[must_use]
    pub fn new(client_id: impl Into<String>, provider: Provider) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            provider,
            http: Client::new(),
        }
    }

    /// Sets the client secret sent with every token request.
    #[must_use]
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Shares an existing HTTP client (connection pool) with this client.
    #[must_use]
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Trades a refresh token for a new access token.
    ///
    /// Google omits the refresh token from refresh responses, so the old one
    /// is carried over.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NoRefreshToken`] if `token` cannot be
    /// refreshed, or the endpoint's error (see
    /// [`crate::Error::is_revoked_grant`]).
    pub async fn refresh_token(&self, token: &Token) -> Result<Token> {
        let refresh_token = token.refresh_token()?;
        let renewed = self.redeem(Grant::Refresh { refresh_token }).await?;
        Ok(if renewed.refresh_token.is_some() {
            renewed
        } else {
            renewed.with_refresh_token(refresh_token)
        })
    }

    /// Posts `grant` to the token endpoint.
    pub(crate) async fn redeem(&self, grant: Grant<'_>) -> Result<Token> {
        let mut form = grant.form();
        form.push(("client_id", self.client_id.as_str()));
        if let Some(secret) = &self.client_secret {
            form.push(("client_secret", secret.as_str()));
        }

        debug!("Redeeming {} at {}", grant.name(), self.provider.token_url);
        let response = self
            .http
            .post(self.provider.token_url.clone())
            .form(&form)
            .send()
            .await?;

        if !response.status().is_success() {
            let error: ErrorResponse = response.json().await?;
            return Err(error.into_error());
        }
        let body: TokenResponse = response.json().await?;
        Ok(Token::from_response(body))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_code_grant_form() {
        let grant = Grant::AuthorizationCode {
            code: "4/abc",
            redirect_uri: "http://127.0.0.1:5000/",
            verifier: Some("v3rifier"),
        };
        assert_eq!(
            grant.form(),
            [
                ("grant_type", "authorization_code"),
                ("code", "4/abc"),
                ("redirect_uri", "http://127.0.0.1:5000/"),
                ("code_verifier", "v3rifier"),
            ]
        );
    }

    #[test]
    fn test_refresh_grant_form() {
        let grant = Grant::Refresh {
            refresh_token: "1//r",
        };
        assert_eq!(
            grant.form(),
            [("grant_type", "refresh_token"), ("refresh_token", "1//r")]
        );
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_locally() {
        let client = OAuthClient::new("id", Provider::gmail_readonly().unwrap());
        let err = client
            .refresh_token(&Token::new("stale", "Bearer"))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::Error::NoRefreshToken));
    }
}
