//! Provider error classification.

use std::time::Duration;

/// Errors that can occur during mail operations.
///
/// Variants carry strings rather than source errors so that failures can be
/// cloned into events and shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MailServiceError {
    /// Network failure before a response was received.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The provider asked us to slow down.
    #[error("Rate limited by provider")]
    RateLimited {
        /// Delay requested by the provider, if any.
        retry_after: Option<Duration>,
    },

    /// Provider-side failure (5xx).
    #[error("Provider error {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Provider message.
        message: String,
    },

    /// The credential was rejected.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// The requested message does not exist (deleted between list and get).
    #[error("Not found: {0}")]
    NotFound(String),

    /// The response could not be understood.
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// No usable credential could be produced.
    #[error("Credential unavailable: {0}")]
    Credential(String),
}

impl MailServiceError {
    /// Returns true if the same call may succeed when repeated.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::RateLimited { .. } | Self::Server { .. }
        )
    }

    /// Returns true if the account needs the user's attention (re-authorization).
    #[must_use]
    pub const fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Authentication(_) | Self::Credential(_))
    }
}
