//! In-memory account registry.

use super::model::{Account, AccountName};
use super::validation::RegistrationError;

/// Ordered, add-only mapping from account name to client handle.
///
/// Iteration follows insertion order. There is no remove or rename.
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: Vec<Account>,
}

impl AccountRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if an account with this exact name is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.accounts.iter().any(|a| a.name.as_str() == name)
    }

    /// Looks up an account by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Account> {
        self.accounts.iter().find(|a| a.name.as_str() == name)
    }

    /// Adds an account.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::DuplicateName`] if the name is taken; the
    /// registry is unchanged in that case.
    pub fn insert(&mut self, account: Account) -> Result<(), RegistrationError> {
        if self.contains(account.name.as_str()) {
            return Err(RegistrationError::DuplicateName(account.name.to_string()));
        }
        self.accounts.push(account);
        Ok(())
    }

    /// Iterates accounts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        self.accounts.iter()
    }

    /// Registered names in insertion order.
    #[must_use]
    pub fn names(&self) -> Vec<AccountName> {
        self.accounts.iter().map(|a| a.name.clone()).collect()
    }

    /// Cheap copy of every account (client handles are shared).
    #[must_use]
    pub fn snapshot(&self) -> Vec<Account> {
        self.accounts.clone()
    }

    /// Number of registered accounts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if no account is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::service::testing::MockMailClient;

    fn account(name: &str) -> Account {
        Account::new(
            AccountName::new(name).unwrap(),
            Arc::new(MockMailClient::new()),
        )
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut registry = AccountRegistry::new();
        registry.insert(account("a")).unwrap();
        registry.insert(account("b")).unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("a"));
        assert!(registry.get("b").is_some());
        assert!(registry.get("c").is_none());
    }

    #[test]
    fn test_duplicate_leaves_registry_unchanged() {
        let mut registry = AccountRegistry::new();
        registry.insert(account("a")).unwrap();

        let err = registry.insert(account("a")).unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("a".to_string()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut registry = AccountRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry.insert(account(name)).unwrap();
        }
        let names: Vec<String> = registry.names().into_iter().map(String::from).collect();
        assert_eq!(names, ["zeta", "alpha", "mid"]);
    }
}
