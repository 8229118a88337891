//! Secure credential storage using system keyring.
//!
//! Stores each account's token in the platform's native credential storage:
//! - Linux: Secret Service (GNOME Keyring, `KWallet`)
//! - macOS: Keychain
//! - Windows: Credential Manager

use keyring::Entry;
use mailwatch_oauth::Token;
use tracing::debug;

use super::CredentialResult;
use super::store::CredentialStore;
use crate::account::AccountName;

/// Service name used for keyring entries.
const SERVICE_NAME: &str = "mailwatch";

/// Credential type identifier for `OAuth2` tokens.
const OAUTH_TOKEN_CREDENTIAL: &str = "oauth_token";

/// Keyring-backed [`CredentialStore`].
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service: String,
}

impl Default for KeyringCredentialStore {
    fn default() -> Self {
        Self::new(SERVICE_NAME)
    }
}

impl KeyringCredentialStore {
    /// Creates a store whose entries live under `service`.
    #[must_use]
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, account: &AccountName) -> CredentialResult<Entry> {
        Ok(Entry::new(&self.service, &credential_key(account))?)
    }
}

/// Generates the keyring entry key for an account's token.
fn credential_key(account: &AccountName) -> String {
    format!("{OAUTH_TOKEN_CREDENTIAL}_{account}")
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self, account: &AccountName) -> CredentialResult<Option<Token>> {
        match self.entry(account)?.get_password() {
            Ok(token_json) => Ok(Some(serde_json::from_str(&token_json)?)),
            Err(keyring::Error::NoEntry) => {
                debug!("No OAuth2 token found for account {account}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, account: &AccountName, token: &Token) -> CredentialResult<()> {
        let token_json = serde_json::to_string(token)?;
        self.entry(account)?.set_password(&token_json)?;
        debug!("Stored OAuth2 token for account {account}");
        Ok(())
    }
}
