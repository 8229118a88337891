//! Token persistence.

use std::fmt::Write as _;
use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use mailwatch_oauth::Token;
use tracing::debug;

use super::CredentialResult;
use crate::account::AccountName;

/// Persists one credential per account.
pub trait CredentialStore: Send + Sync {
    /// Loads the stored credential, or `None` if the account has none yet.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read or holds garbage.
    fn load(&self, account: &AccountName) -> CredentialResult<Option<Token>>;

    /// Stores (or replaces) the credential for an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn save(&self, account: &AccountName, token: &Token) -> CredentialResult<()>;
}

/// Stores each account's token as a JSON file in one directory.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store rooted at `dir`. The directory is created on first save.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the token file for `account`.
    #[must_use]
    pub fn path_for(&self, account: &AccountName) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(account.as_str())))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self, account: &AccountName) -> CredentialResult<Option<Token>> {
        let path = self.path_for(account);
        match fs::read_to_string(&path) {
            Ok(json) => Ok(Some(serde_json::from_str(&json)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No stored token for account {account}");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, account: &AccountName, token: &Token) -> CredentialResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(account);
        let tmp = path.with_extension("json.tmp");

        let json = serde_json::to_vec_pretty(token)?;
        let mut file = open_private(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        fs::rename(&tmp, &path)?;

        debug!("Stored token for account {account} at {}", path.display());
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Maps an account name to a file stem.
///
/// Every account gets its own `<stem>.json` in the shared directory, and
/// account names are free text, so the stem must be path-safe and two names
/// must never share a file. ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. The mapping is injective because `%` itself is encoded.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for byte in name.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(char::from(byte));
        } else {
            let _ = write!(stem, "%{byte:02X}");
        }
    }
    stem
}
