//! Account model types.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::service::MailClient;

/// User-chosen account name; the registry's unique key.
///
/// Never empty. Compared exactly (case-sensitive, no trimming).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountName(String);

impl AccountName {
    /// Creates an account name, rejecting the empty string.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() { None } else { Some(Self(name)) }
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AccountName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountName {
    type Error = &'static str;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value).ok_or("account name must not be empty")
    }
}

impl From<AccountName> for String {
    fn from(name: AccountName) -> Self {
        name.0
    }
}

/// A registered mailbox: a name plus the client handle used to reach it.
#[derive(Clone)]
pub struct Account {
    /// Unique account name.
    pub name: AccountName,
    /// Capability to list and get messages for this mailbox.
    pub client: Arc<dyn MailClient>,
}

impl Account {
    /// Creates a new account.
    #[must_use]
    pub fn new(name: AccountName, client: Arc<dyn MailClient>) -> Self {
        Self { name, client }
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_name_rejected() {
        assert!(AccountName::new("").is_none());
    }

    #[test]
    fn test_name_is_kept_verbatim() {
        let name = AccountName::new(" Work ").unwrap();
        assert_eq!(name.as_str(), " Work ");
        assert_ne!(name, AccountName::new("work").unwrap());
    }

    #[test]
    fn test_serde_rejects_empty() {
        let name: AccountName = serde_json::from_str("\"personal\"").unwrap();
        assert_eq!(name.to_string(), "personal");
        assert!(serde_json::from_str::<AccountName>("\"\"").is_err());
    }
}
