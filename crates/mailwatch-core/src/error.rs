//! Error types for the core library.

use thiserror::Error;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Mail provider operation failed.
    #[error("Mail service error: {0}")]
    MailService(#[from] crate::service::MailServiceError),

    /// Credential acquisition or storage failed.
    #[error("Credential error: {0}")]
    Credential(#[from] crate::credentials::CredentialError),

    /// Account registration was rejected.
    #[error("Registration error: {0}")]
    Registration(#[from] crate::account::RegistrationError),

    /// The refresh monitor has shut down.
    #[error("Monitor is not running")]
    MonitorStopped,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
