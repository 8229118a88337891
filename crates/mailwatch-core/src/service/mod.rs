//! Mail provider boundary.
//!
//! This module defines the operations the rest of the crate needs from a
//! mailbox (`list_recent`, `get`, `estimate_count`), the Gmail REST
//! implementation of them, and the retry policy wrapped around every call.

mod client;
mod error;
pub mod gmail;
mod retry;
#[cfg(test)]
pub(crate) mod testing;

pub use client::{ClientFactory, Header, MailClient, MessageId, RawMessage, UNREAD_FILTER};
pub use error::MailServiceError;
pub use gmail::{GMAIL_API_BASE, GmailClient, GmailClientFactory};
pub use retry::RetryPolicy;
