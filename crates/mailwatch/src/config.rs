//! Start-up configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use mailwatch_core::credentials::DEFAULT_CONSENT_TIMEOUT;
use mailwatch_core::monitor::DEFAULT_MAX_CONCURRENT_FETCHES;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "MAILWATCH_CONFIG";

/// Where OAuth tokens are kept between runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    /// One JSON file per account under `token_dir`.
    #[default]
    File,
    /// The platform keyring.
    Keyring,
}

/// Contents of `config.json`. Every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Installed-app client secrets downloaded from the Google console.
    pub client_secrets_path: PathBuf,
    /// Token directory for the file backend.
    pub token_dir: PathBuf,
    /// Token storage backend.
    pub credential_backend: CredentialBackend,
    /// Accounts added at start-up, in order.
    pub accounts: Vec<String>,
    /// Upper bound on concurrent fetches.
    pub max_concurrent_fetches: usize,
    /// Seconds to wait for the browser consent redirect.
    pub consent_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            client_secrets_path: config_dir().join("credentials.json"),
            token_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("mailwatch")
                .join("tokens"),
            credential_backend: CredentialBackend::default(),
            accounts: Vec::new(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            consent_timeout_secs: DEFAULT_CONSENT_TIMEOUT.as_secs(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailwatch")
}

impl Config {
    /// How long a new account's consent screen may stay open.
    #[must_use]
    pub const fn consent_timeout(&self) -> Duration {
        Duration::from_secs(self.consent_timeout_secs)
    }

    /// Config file location: `$MAILWATCH_CONFIG`, else the platform config dir.
    #[must_use]
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map_or_else(|| config_dir().join("config.json"), PathBuf::from)
    }

    /// Loads the config at `path`. A missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}; using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config = serde_json::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(config)
    }
}
