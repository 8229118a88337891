//! Authorization Code Flow implementation.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use tracing::info;
use url::Url;

use super::{Grant, LoopbackRedirect, OAuthClient, PkceChallenge};
use crate::error::{Error, Result};
use crate::token::Token;

/// Authorization Code Flow for `OAuth2`.
///
/// This flow is suitable for applications that can open a browser
/// and receive the authorization code via redirect.
#[derive(Debug)]
pub struct AuthorizationCodeFlow {
    client: OAuthClient,
    pkce: Option<PkceChallenge>,
}

impl AuthorizationCodeFlow {
    /// Creates a new authorization code flow.
    #[must_use]
    pub const fn new(client: OAuthClient) -> Self {
        Self { client, pkce: None }
    }

    /// Enables PKCE (recommended for installed applications).
    #[must_use]
    pub fn with_pkce(mut self) -> Self {
        self.pkce = Some(PkceChallenge::generate());
        self
    }

    /// Consent URL sending the user back to `redirect_uri` with `state`.
    fn consent_url(&self, state: &str, redirect_uri: &str) -> Url {
        let provider = &self.client.provider;
        let mut url = provider.auth_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("client_id", &self.client.client_id)
                .append_pair("response_type", "code")
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("scope", &provider.default_scopes.join(" "))
                .append_pair("state", state);

            if let Some(pkce) = &self.pkce {
                pairs
                    .append_pair("code_challenge", pkce.challenge())
                    .append_pair("code_challenge_method", pkce.method());
            }

            // Google only issues a refresh token with offline access
            if provider.name == "Google" {
                pairs
                    .append_pair("access_type", "offline")
                    .append_pair("prompt", "consent");
            }
        }
        url
    }

    /// Runs the interactive consent round trip through a loopback listener.
    ///
    /// `open` receives the consent URL and is expected to show it to the user
    /// (typically by launching a browser). The listener's redirect URI is
    /// used for both the request and the code exchange.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Timeout`] if the user does not finish within
    /// `timeout`, [`Error::AccessDenied`] if consent is refused, and any
    /// error from the code exchange.
    pub async fn authorize_with<F>(
        &self,
        listener: LoopbackRedirect,
        timeout: Duration,
        open: F,
    ) -> Result<Token>
    where
        F: FnOnce(&Url),
    {
        let redirect_uri = listener.redirect_uri().to_string();
        let state = random_state();

        let url = self.consent_url(&state, &redirect_uri);

        info!("Waiting for authorization on {redirect_uri}");
        open(&url);

        let code = tokio::time::timeout(timeout, listener.wait_for_code(&state))
            .await
            .map_err(|_| Error::Timeout(timeout.as_secs()))??;

        self.client
            .redeem(Grant::AuthorizationCode {
                code: &code,
                redirect_uri: &redirect_uri,
                verifier: self.pkce.as_ref().map(PkceChallenge::verifier),
            })
            .await
    }
}

fn random_state() -> String {
    let bytes: [u8; 16] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}
