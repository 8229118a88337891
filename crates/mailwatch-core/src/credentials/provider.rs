//! Producing and renewing per-account credentials.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailwatch_oauth::{AuthorizationCodeFlow, LoopbackRedirect, OAuthClient, Token};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use super::store::CredentialStore;
use super::{CredentialError, CredentialResult};
use crate::account::AccountName;

/// How long the user has to finish the consent screen.
pub const DEFAULT_CONSENT_TIMEOUT: Duration = Duration::from_secs(300);

/// Source of credentials for accounts.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Returns a usable credential for `account`.
    ///
    /// The first call for an account may involve the user (browser consent);
    /// later calls are silent as long as the stored grant is honored.
    async fn obtain(&self, account: &AccountName) -> CredentialResult<Token>;

    /// Renews `token` without user interaction and persists the result.
    async fn refresh(&self, account: &AccountName, token: &Token) -> CredentialResult<Token>;
}

/// [`CredentialProvider`] backed by the `OAuth2` installed-app flow.
pub struct OAuthCredentialProvider {
    client: OAuthClient,
    store: Arc<dyn CredentialStore>,
    consent_timeout: Duration,
    consent: Mutex<()>,
}

impl OAuthCredentialProvider {
    /// Creates a provider that persists tokens in `store`.
    #[must_use]
    pub fn new(client: OAuthClient, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            store,
            consent_timeout: DEFAULT_CONSENT_TIMEOUT,
            consent: Mutex::new(()),
        }
    }

    /// Sets how long to wait for the browser redirect.
    #[must_use]
    pub const fn with_consent_timeout(mut self, timeout: Duration) -> Self {
        self.consent_timeout = timeout;
        self
    }

    async fn authorize(&self, account: &AccountName) -> CredentialResult<Token> {
        // One consent screen at a time; each flow owns its own listener.
        let _guard = self.consent.lock().await;

        info!("Authorizing account {account} in the browser");
        let listener = LoopbackRedirect::bind().await?;
        let flow = AuthorizationCodeFlow::new(self.client.clone()).with_pkce();
        let token = flow
            .authorize_with(listener, self.consent_timeout, open_in_browser)
            .await?;

        self.store.save(account, &token)?;
        info!("Account {account} authorized");
        Ok(token)
    }
}

#[async_trait]
impl CredentialProvider for OAuthCredentialProvider {
    async fn obtain(&self, account: &AccountName) -> CredentialResult<Token> {
        match self.store.load(account) {
            Ok(Some(token)) if token.is_valid() => {
                debug!("Using stored token for account {account}");
                return Ok(token);
            }
            Ok(Some(token)) if token.can_refresh() => match self.refresh(account, &token).await {
                Ok(token) => return Ok(token),
                Err(e @ CredentialError::Revoked(_)) => {
                    warn!("Stored grant for {account} is no longer valid: {e}");
                }
                Err(e) => return Err(e),
            },
            Ok(_) => {}
            Err(e) => warn!("Ignoring unreadable stored token for {account}: {e}"),
        }

        self.authorize(account).await
    }

    async fn refresh(&self, account: &AccountName, token: &Token) -> CredentialResult<Token> {
        debug!("Refreshing token for account {account}");
        let renewed = self.client.refresh_token(token).await?;
        self.store.save(account, &renewed)?;
        Ok(renewed)
    }
}

fn open_in_browser(url: &Url) {
    if let Err(e) = opener::open(url.as_str()) {
        warn!("Could not open a browser: {e}");
    }
    info!("If the browser did not open, visit: {url}");
}

/// The live credential of one account, shared by its client.
///
/// Renewals are serialized through an async mutex, so concurrent requests
/// that all observe an expired or rejected token trigger a single refresh.
pub struct SharedCredential {
    account: AccountName,
    token: Mutex<Token>,
    provider: Arc<dyn CredentialProvider>,
}

impl SharedCredential {
    /// Wraps an initial token.
    #[must_use]
    pub fn new(account: AccountName, token: Token, provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            account,
            token: Mutex::new(token),
            provider,
        }
    }

    /// Account this credential belongs to.
    #[must_use]
    pub const fn account(&self) -> &AccountName {
        &self.account
    }

    /// Returns a token to use now, refreshing first if it has expired.
    ///
    /// # Errors
    ///
    /// Returns an error if an expired token cannot be renewed.
    pub async fn current(&self) -> CredentialResult<Token> {
        let mut token = self.token.lock().await;
        if token.is_expired() && token.can_refresh() {
            *token = self.provider.refresh(&self.account, &token).await?;
        }
        Ok(token.clone())
    }

    /// Renews the credential after the provider rejected `rejected`.
    ///
    /// If another request already replaced that token, the newer one is
    /// returned without another refresh.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails.
    pub async fn renew(&self, rejected: &Token) -> CredentialResult<Token> {
        let mut token = self.token.lock().await;
        if token.access_token == rejected.access_token {
            *token = self.provider.refresh(&self.account, &token).await?;
        }
        Ok(token.clone())
    }
}

impl std::fmt::Debug for SharedCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedCredential")
            .field("account", &self.account)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{Duration as ChronoDuration, Utc};

    use super::*;

    /// Issues `fresh-N` tokens and counts refreshes.
    #[derive(Default)]
    struct CountingProvider {
        refreshes: AtomicUsize,
    }

    #[async_trait]
    impl CredentialProvider for CountingProvider {
        async fn obtain(&self, _account: &AccountName) -> CredentialResult<Token> {
            Ok(Token::new("obtained", "Bearer"))
        }

        async fn refresh(&self, _account: &AccountName, token: &Token) -> CredentialResult<Token> {
            if !token.can_refresh() {
                return Err(CredentialError::Revoked("no refresh token".into()));
            }
            let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            Ok(Token::new(format!("fresh-{n}"), "Bearer").with_refresh_token("r"))
        }
    }

    fn shared(token: Token) -> (Arc<CountingProvider>, Arc<SharedCredential>) {
        let provider = Arc::new(CountingProvider::default());
        let credential = SharedCredential::new(
            AccountName::new("work").unwrap(),
            token,
            provider.clone(),
        );
        (provider, Arc::new(credential))
    }

    #[tokio::test]
    async fn test_valid_token_is_used_as_is() {
        let (provider, credential) = shared(Token::new("live", "Bearer").with_refresh_token("r"));
        assert_eq!(credential.current().await.unwrap().access_token, "live");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed_once() {
        let expired = Token {
            expires_at: Some(Utc::now() - ChronoDuration::hours(1)),
            ..Token::new("old", "Bearer").with_refresh_token("r")
        };
        let (provider, credential) = shared(expired);

        assert_eq!(credential.current().await.unwrap().access_token, "fresh-1");
        assert_eq!(credential.current().await.unwrap().access_token, "fresh-1");
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_concurrent_renewals_collapse_into_one_refresh() {
        let rejected = Token::new("rejected", "Bearer").with_refresh_token("r");
        let (provider, credential) = shared(rejected.clone());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let credential = credential.clone();
                let rejected = rejected.clone();
                tokio::spawn(async move { credential.renew(&rejected).await.unwrap() })
            })
            .collect();
        for task in tasks {
            assert_eq!(task.await.unwrap().access_token, "fresh-1");
        }
        assert_eq!(provider.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_renew_without_refresh_token_fails() {
        let (_, credential) = shared(Token::new("rejected", "Bearer"));
        let err = credential
            .renew(&Token::new("rejected", "Bearer"))
            .await
            .unwrap_err();
        assert!(matches!(err, CredentialError::Revoked(_)));
    }
}
