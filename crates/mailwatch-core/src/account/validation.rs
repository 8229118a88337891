//! Account name validation.

use super::model::AccountName;

/// Why an add-account request was turned down.
///
/// These are reported to the user as warnings; the registry is left
/// unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Account name is empty.
    #[error("Account name is empty")]
    EmptyName,
    /// An account with this name already exists or is being added.
    #[error("Account \"{0}\" already exists")]
    DuplicateName(String),
    /// Credential acquisition failed for this account.
    #[error("Could not authorize \"{name}\": {reason}")]
    Credential {
        /// Requested account name.
        name: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl RegistrationError {
    /// Get human-readable warning text.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::EmptyName | Self::DuplicateName(_) => {
                "Account name is empty or already exists.".to_string()
            }
            Self::Credential { .. } => self.to_string(),
        }
    }
}

/// Validates a requested account name against the names already taken.
///
/// # Errors
///
/// Returns [`RegistrationError::EmptyName`] for an empty name and
/// [`RegistrationError::DuplicateName`] if `is_taken` reports the name.
pub fn validate_account_name(
    name: &str,
    is_taken: impl Fn(&str) -> bool,
) -> Result<AccountName, RegistrationError> {
    let account_name = AccountName::new(name).ok_or(RegistrationError::EmptyName)?;
    if is_taken(name) {
        return Err(RegistrationError::DuplicateName(name.to_string()));
    }
    Ok(account_name)
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
    fn test_valid_name() {
        let name = validate_account_name("personal", |_| false).unwrap();
        assert_eq!(name.as_str(), "personal");
    }

    #[test]
    fn test_empty_name() {
        assert_eq!(
            validate_account_name("", |_| false).unwrap_err(),
            RegistrationError::EmptyName
        );
    }

    #[test]
    fn test_duplicate_name() {
        let err = validate_account_name("work", |n| n == "work").unwrap_err();
        assert_eq!(err, RegistrationError::DuplicateName("work".to_string()));
        assert_eq!(err.message(), "Account name is empty or already exists.");
    }

    #[test]
    fn test_duplicate_check_is_case_sensitive() {
        assert!(validate_account_name("Work", |n| n == "work").is_ok());
    }
}
