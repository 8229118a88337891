//! `mailwatch` - watch several Gmail accounts from one terminal.
//!
//! Reads intents from stdin, one per line, and prints messages and dashboard
//! figures as the refresh monitor produces them.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod command;
mod config;
mod render;

use std::io::stdout;
use std::sync::Arc;

use anyhow::Context;
use mailwatch_core::credentials::CredentialStore;
use mailwatch_core::monitor::{self, MonitorConfig};
use mailwatch_core::{
    FileCredentialStore, GmailClientFactory, KeyringCredentialStore, MonitorHandle,
    OAuthCredentialProvider,
};
use mailwatch_oauth::{ClientSecrets, Provider};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use command::{HELP, Intent};
use config::{Config, CredentialBackend};
use render::{Terminal, desktop_notifier};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so they don't interleave with the message list.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailwatch=info,mailwatch_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting mailwatch");

    let config_path = Config::default_path();
    let config = Config::load(&config_path)?;

    let store: Arc<dyn CredentialStore> = match config.credential_backend {
        CredentialBackend::File => {
            info!("Storing tokens in {}", config.token_dir.display());
            Arc::new(FileCredentialStore::new(&config.token_dir))
        }
        CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::default()),
    };

    let http = reqwest::Client::new();
    let secrets = ClientSecrets::from_file(&config.client_secrets_path).with_context(|| {
        format!(
            "loading client secrets from {}",
            config.client_secrets_path.display()
        )
    })?;
    let oauth = secrets
        .into_client(Provider::gmail_readonly()?)?
        .with_http_client(http.clone());
    let credentials = Arc::new(
        OAuthCredentialProvider::new(oauth, store).with_consent_timeout(config.consent_timeout()),
    );
    let factory = Arc::new(GmailClientFactory::new(http, credentials.clone())?);

    let (handle, mut events, monitor_task) = monitor::spawn(
        MonitorConfig {
            max_concurrent_fetches: config.max_concurrent_fetches,
            ..MonitorConfig::default()
        },
        credentials,
        factory,
    );

    for name in &config.accounts {
        handle.add_account(name.as_str())?;
    }

    let mut terminal = Terminal::new(stdout(), desktop_notifier());
    terminal.line("type 'help' for commands")?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                terminal.handle(&event)?;
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    handle.shutdown()?;
                    break;
                };
                match Intent::parse(&line) {
                    Ok(Some(Intent::Quit)) => {
                        handle.shutdown()?;
                        break;
                    }
                    Ok(Some(intent)) => dispatch(intent, &handle, &mut terminal).await?,
                    Ok(None) => {}
                    Err(message) => terminal.line(&message)?,
                }
            }
        }
    }

    monitor_task.await?;
    info!("Stopped");
    Ok(())
}

async fn dispatch(
    intent: Intent,
    handle: &MonitorHandle,
    terminal: &mut Terminal<std::io::Stdout>,
) -> anyhow::Result<()> {
    match intent {
        Intent::Add(name) => handle.add_account(name)?,
        Intent::Search(query) => terminal.search(&query)?,
        Intent::Refresh => handle.refresh_now()?,
        Intent::Settings(change) => handle.update_settings(change)?,
        Intent::Dashboard => terminal.print_dashboard()?,
        Intent::List => {
            let accounts = handle.accounts().await?;
            let names: Vec<&str> = accounts.iter().map(|a| a.as_str()).collect();
            terminal.line(&format!("accounts: {}", names.join(", ")))?;
            terminal.print_list()?;
        }
        Intent::Help => terminal.line(HELP)?,
        Intent::Quit => handle.shutdown()?,
    }
    Ok(())
}
