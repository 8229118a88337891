//! Mail client capability.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use mailwatch_oauth::Token;

use super::error::MailServiceError;
use crate::account::AccountName;

/// Provider query selecting unread messages.
pub const UNREAD_FILTER: &str = "is:unread";

/// Provider-assigned message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    /// Creates a message ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single message header as returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name, in the provider's casing.
    pub name: String,
    /// Header value.
    pub value: String,
}

impl Header {
    /// Creates a header.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// A message as fetched by ID: headers plus the provider's snippet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    /// Headers in provider order.
    pub headers: Vec<Header>,
    /// Short plain-text preview generated by the provider.
    pub snippet: String,
}

impl RawMessage {
    /// Value of the first header whose name matches exactly (case-sensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

/// Operations against one mailbox.
///
/// Implementations hold whatever credential they need and renew it on
/// demand.
#[async_trait]
pub trait MailClient: Send + Sync {
    /// Lists up to `max_count` of the most recent message IDs, newest first,
    /// optionally restricted by a provider query such as [`UNREAD_FILTER`].
    async fn list_recent(
        &self,
        max_count: u32,
        filter: Option<&str>,
    ) -> Result<Vec<MessageId>, MailServiceError>;

    /// Fetches one message's headers and snippet.
    async fn get(&self, id: &MessageId) -> Result<RawMessage, MailServiceError>;

    /// Provider's estimate of how many messages match `filter`.
    async fn estimate_count(&self, filter: Option<&str>) -> Result<u64, MailServiceError>;
}

/// Builds client handles for freshly authorized accounts.
pub trait ClientFactory: Send + Sync {
    /// Creates a client for `account` using `token` as its initial credential.
    fn connect(&self, account: &AccountName, token: Token) -> Arc<dyn MailClient>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_is_exact() {
        let message = RawMessage {
            headers: vec![
                Header::new("subject", "lowercase"),
                Header::new("Subject", "first"),
                Header::new("Subject", "second"),
            ],
            snippet: String::new(),
        };

        assert_eq!(message.header("Subject"), Some("first"));
        assert_eq!(message.header("subject"), Some("lowercase"));
        assert_eq!(message.header("SUBJECT"), None);
    }
}
