//! Gmail REST v1 client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mailwatch_oauth::Token;
use reqwest::header::{AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use super::client::{ClientFactory, Header, MailClient, MessageId, RawMessage};
use super::error::MailServiceError;
use crate::account::AccountName;
use crate::credentials::{CredentialProvider, SharedCredential};

/// Mailbox root of the signed-in user.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me/";

/// Headers requested with every message fetch.
const METADATA_HEADERS: [&str; 3] = ["From", "Subject", "Date"];

/// `errors[].reason` values Google uses for quota exhaustion.
const RATE_LIMIT_REASONS: [&str; 4] = [
    "rateLimitExceeded",
    "userRateLimitExceeded",
    "quotaExceeded",
    "dailyLimitExceeded",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
    #[serde(default)]
    result_size_estimate: u64,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<HeaderEntry>,
}

#[derive(Debug, Deserialize)]
struct HeaderEntry {
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: ErrorBody,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    reason: String,
}

/// Maps a non-success response to an error.
///
/// `body` is the raw response text; Google's JSON error envelope is used
/// when present to tell quota exhaustion from permission problems.
#[must_use]
pub fn classify_status(
    status: StatusCode,
    body: &str,
    retry_after: Option<Duration>,
) -> MailServiceError {
    let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap_or_default();
    let message = if envelope.error.message.is_empty() {
        status.canonical_reason().unwrap_or("error").to_string()
    } else {
        envelope.error.message
    };
    let rate_limited = envelope
        .error
        .errors
        .iter()
        .any(|e| RATE_LIMIT_REASONS.contains(&e.reason.as_str()));

    match status {
        StatusCode::TOO_MANY_REQUESTS => MailServiceError::RateLimited { retry_after },
        StatusCode::FORBIDDEN if rate_limited => MailServiceError::RateLimited { retry_after },
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            MailServiceError::Authentication(message)
        }
        StatusCode::NOT_FOUND => MailServiceError::NotFound(message),
        s if s.is_server_error() => MailServiceError::Server {
            status: s.as_u16(),
            message,
        },
        s => MailServiceError::Decode(format!("request rejected with {}: {message}", s.as_u16())),
    }
}

fn parse_retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn transport_error(err: &reqwest::Error) -> MailServiceError {
    if err.is_decode() {
        MailServiceError::Decode(err.to_string())
    } else {
        MailServiceError::Connection(err.to_string())
    }
}

/// Gmail client for one account.
#[derive(Debug)]
pub struct GmailClient {
    http: Client,
    base: Url,
    credential: Arc<SharedCredential>,
}

impl GmailClient {
    /// Creates a client rooted at `base` (normally [`GMAIL_API_BASE`]).
    #[must_use]
    pub fn new(http: Client, base: Url, credential: Arc<SharedCredential>) -> Self {
        Self {
            http,
            base: with_trailing_slash(base),
            credential,
        }
    }

    fn messages_url(&self) -> Result<Url, MailServiceError> {
        self.base
            .join("messages")
            .map_err(|e| MailServiceError::Decode(format!("invalid API base: {e}")))
    }

    /// Sends a GET, renewing the credential once if the provider answers 401.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, MailServiceError> {
        let token = self.credential.current().await?;
        let response = self.send(&url, &token).await?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            debug!(
                "Token rejected for account {}; renewing",
                self.credential.account()
            );
            let renewed = self.credential.renew(&token).await?;
            self.send(&url, &renewed).await?
        } else {
            response
        };

        let status = response.status();
        let retry_after = parse_retry_after(&response);
        let body = response.text().await.map_err(|e| transport_error(&e))?;

        if !status.is_success() {
            return Err(classify_status(status, &body, retry_after));
        }
        serde_json::from_str(&body).map_err(|e| MailServiceError::Decode(e.to_string()))
    }

    async fn send(&self, url: &Url, token: &Token) -> Result<Response, MailServiceError> {
        debug!("GET {}", url.path());
        self.http
            .get(url.clone())
            .header(AUTHORIZATION, token.authorization_header())
            .send()
            .await
            .map_err(|e| transport_error(&e))
    }
}

#[async_trait]
impl MailClient for GmailClient {
    async fn list_recent(
        &self,
        max_count: u32,
        filter: Option<&str>,
    ) -> Result<Vec<MessageId>, MailServiceError> {
        let mut url = self.messages_url()?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("maxResults", &max_count.to_string());
            if let Some(q) = filter {
                query.append_pair("q", q);
            }
        }

        let list: ListResponse = self.get_json(url).await?;
        Ok(list
            .messages
            .into_iter()
            .map(|m| MessageId(m.id))
            .collect())
    }

    async fn get(&self, id: &MessageId) -> Result<RawMessage, MailServiceError> {
        let mut url = self.messages_url()?;
        url.path_segments_mut()
            .map_err(|()| MailServiceError::Decode("API base cannot hold a path".into()))?
            .push(id.as_str());
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("format", "metadata");
            for header in METADATA_HEADERS {
                query.append_pair("metadataHeaders", header);
            }
        }

        let message: MessageResponse = self.get_json(url).await?;
        let headers = message
            .payload
            .map(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .map(|h| Header::new(h.name, h.value))
            .collect();
        Ok(RawMessage {
            headers,
            snippet: message.snippet,
        })
    }

    async fn estimate_count(&self, filter: Option<&str>) -> Result<u64, MailServiceError> {
        let mut url = self.messages_url()?;
        if let Some(q) = filter {
            url.query_pairs_mut().append_pair("q", q);
        }

        let list: ListResponse = self.get_json(url).await?;
        Ok(list.result_size_estimate)
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Builds [`GmailClient`]s that renew tokens through a shared provider.
pub struct GmailClientFactory {
    http: Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl GmailClientFactory {
    /// Creates a factory targeting [`GMAIL_API_BASE`].
    ///
    /// # Errors
    ///
    /// Never fails for the built-in base URL; the `Result` covers custom bases
    /// set through [`Self::with_base_url`].
    pub fn new(http: Client, credentials: Arc<dyn CredentialProvider>) -> Result<Self, url::ParseError> {
        Ok(Self {
            http,
            base: Url::parse(GMAIL_API_BASE)?,
            credentials,
        })
    }

    /// Points clients at a different API root (tests, proxies).
    #[must_use]
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base = base;
        self
    }
}

impl ClientFactory for GmailClientFactory {
    fn connect(&self, account: &AccountName, token: Token) -> Arc<dyn MailClient> {
        let credential = Arc::new(SharedCredential::new(
            account.clone(),
            token,
            self.credentials.clone(),
        ));
        Arc::new(GmailClient::new(
            self.http.clone(),
            self.base.clone(),
            credential,
        ))
    }
}

impl std::fmt::Debug for GmailClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailClientFactory")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}
