//! # mailwatch-core
//!
//! Core logic of the `mailwatch` multi-account mail dashboard.
//!
//! This crate provides:
//! - Account names, validation and the in-memory registry
//! - Credential storage (token files or system keyring) and `OAuth2`
//!   acquisition
//! - The mail provider boundary, a Gmail REST client and retry with backoff
//! - Fetch tasks streaming per-message summaries
//! - Dashboard aggregates and the activity history
//! - Runtime settings
//! - The refresh monitor driving periodic passes
//! - Display-side models that drop stale results and filter by search text

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod account;
pub mod credentials;
pub mod dashboard;
pub mod display;
mod error;
pub mod event;
pub mod fetch;
pub mod generation;
pub mod monitor;
pub mod service;
pub mod settings;

pub use account::{Account, AccountName, AccountRegistry, RegistrationError};
pub use credentials::{
    CredentialError, CredentialProvider, CredentialResult, CredentialStore, FileCredentialStore,
    KeyringCredentialStore, OAuthCredentialProvider,
};
pub use dashboard::{AccountStats, ActivityPoint, DashboardSnapshot, RecentMessage};
pub use display::{DashboardView, MessageList};
pub use error::{Error, Result};
pub use event::MonitorEvent;
pub use fetch::{FETCH_COUNT, FetchTask, MessageSummary};
pub use generation::Generation;
pub use monitor::{MonitorConfig, MonitorHandle};
pub use service::{GmailClientFactory, MailClient, MailServiceError, RetryPolicy};
pub use settings::{Settings, SettingsChange, ThemeColor};
