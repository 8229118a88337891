//! Credential acquisition and storage.
//!
//! Each account owns one opaque credential (an `OAuth2` [`Token`]). It is
//! persisted by a [`CredentialStore`] and produced or renewed by a
//! [`CredentialProvider`]. Clients share a [`SharedCredential`] so that
//! renewals for one account never overlap.
//!
//! [`Token`]: mailwatch_oauth::Token

mod keyring;
mod provider;
mod store;

pub use self::keyring::KeyringCredentialStore;
pub use provider::{
    CredentialProvider, DEFAULT_CONSENT_TIMEOUT, OAuthCredentialProvider, SharedCredential,
};
pub use store::{CredentialStore, FileCredentialStore};

use crate::service::MailServiceError;

/// Error type for credential operations.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Reading or writing the token file failed.
    #[error("Credential store error: {0}")]
    Store(#[from] std::io::Error),

    /// A stored credential could not be (de)serialized.
    #[error("Stored credential is malformed: {0}")]
    Format(#[from] serde_json::Error),

    /// Failed to access keyring.
    #[error("Keyring error: {0}")]
    Keyring(#[from] ::keyring::Error),

    /// The authorization server or token exchange failed.
    #[error("OAuth error: {0}")]
    OAuth(mailwatch_oauth::Error),

    /// The user declined the consent screen.
    #[error("Authorization was denied")]
    ConsentDenied,

    /// The provider no longer honors the stored grant.
    #[error("Authorization was revoked: {0}")]
    Revoked(String),

    /// The interactive flow could not complete (timeout, redirect problem).
    #[error("Interactive authorization failed: {0}")]
    Interactive(String),
}

impl From<mailwatch_oauth::Error> for CredentialError {
    fn from(err: mailwatch_oauth::Error) -> Self {
        use mailwatch_oauth::Error as OAuthError;

        match err {
            OAuthError::AccessDenied => Self::ConsentDenied,
            e if e.is_revoked_grant() => Self::Revoked(e.to_string()),
            e @ (OAuthError::Timeout(_) | OAuthError::StateMismatch) => {
                Self::Interactive(e.to_string())
            }
            e => Self::OAuth(e),
        }
    }
}

impl From<CredentialError> for MailServiceError {
    fn from(err: CredentialError) -> Self {
        Self::Credential(err.to_string())
    }
}

/// Result type for credential operations.
pub type CredentialResult<T> = std::result::Result<T, CredentialError>;
