//! The refresh monitor.
//!
//! One task owns the account registry, the settings and the refresh timer.
//! The UI talks to it through a [`MonitorHandle`] and listens on the event
//! receiver returned by [`spawn`]. Fetches and dashboard recomputes run as
//! separate tasks, at most `max_concurrent_fetches` at a time, and report
//! back through the same ordered event channel.

mod timer;

pub use timer::RefreshTimer;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Local;
use mailwatch_oauth::Token;
use tokio::sync::{Mutex, Semaphore, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::account::{Account, AccountName, AccountRegistry, RegistrationError, validate_account_name};
use crate::credentials::{CredentialProvider, CredentialResult};
use crate::dashboard::{self, ActivityHistory};
use crate::error::{Error, Result};
use crate::event::MonitorEvent;
use crate::fetch::FetchTask;
use crate::generation::{Generation, GenerationCursor};
use crate::service::{ClientFactory, RetryPolicy};
use crate::settings::{Settings, SettingsChange, SettingsEffect};

/// Default bound on concurrently running fetches and recomputes.
pub const DEFAULT_MAX_CONCURRENT_FETCHES: usize = 4;

/// Monitor start-up parameters.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Initial settings.
    pub settings: Settings,
    /// Upper bound on fetch tasks and dashboard recomputes running at once.
    pub max_concurrent_fetches: usize,
    /// Retry policy for every provider call.
    pub retry: RetryPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            settings: Settings::default(),
            max_concurrent_fetches: DEFAULT_MAX_CONCURRENT_FETCHES,
            retry: RetryPolicy::default(),
        }
    }
}

enum Command {
    AddAccount(String),
    UpdateSettings(SettingsChange),
    RefreshNow,
    Accounts(oneshot::Sender<Vec<AccountName>>),
    Shutdown,
}

/// Sends user intents to a running monitor. Cheap to clone.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
}

impl MonitorHandle {
    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| Error::MonitorStopped)
    }

    /// Requests a new account. The outcome arrives as
    /// [`MonitorEvent::AccountAdded`] or [`MonitorEvent::AccountRejected`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorStopped`] if the monitor has exited.
    pub fn add_account(&self, name: impl Into<String>) -> Result<()> {
        self.send(Command::AddAccount(name.into()))
    }

    /// Applies a settings change.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorStopped`] if the monitor has exited.
    pub fn update_settings(&self, change: SettingsChange) -> Result<()> {
        self.send(Command::UpdateSettings(change))
    }

    /// Starts a refresh pass now, outside the timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorStopped`] if the monitor has exited.
    pub fn refresh_now(&self) -> Result<()> {
        self.send(Command::RefreshNow)
    }

    /// Registered account names in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorStopped`] if the monitor has exited.
    pub async fn accounts(&self) -> Result<Vec<AccountName>> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Accounts(tx))?;
        rx.await.map_err(|_| Error::MonitorStopped)
    }

    /// Stops the monitor. Tasks already running finish on their own.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MonitorStopped`] if the monitor has already exited.
    pub fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown)
    }
}

/// Starts the monitor on the current tokio runtime.
///
/// Returns the handle for intents, the event stream for the display, and
/// the monitor task itself.
pub fn spawn(
    config: MonitorConfig,
    credentials: Arc<dyn CredentialProvider>,
    factory: Arc<dyn ClientFactory>,
) -> (
    MonitorHandle,
    mpsc::UnboundedReceiver<MonitorEvent>,
    JoinHandle<()>,
) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let (authorized_tx, authorized_rx) = mpsc::unbounded_channel();

    let monitor = Monitor {
        registry: AccountRegistry::new(),
        pending: HashSet::new(),
        timer: RefreshTimer::start(config.settings.refresh_period()),
        settings: config.settings,
        cursor: GenerationCursor::new(),
        permits: Arc::new(Semaphore::new(config.max_concurrent_fetches.max(1))),
        retry: config.retry,
        history: Arc::new(Mutex::new(ActivityHistory::new())),
        credentials,
        factory,
        events: event_tx,
        authorized: authorized_tx,
    };
    let task = tokio::spawn(monitor.run(command_rx, authorized_rx));

    (
        MonitorHandle {
            commands: command_tx,
        },
        event_rx,
        task,
    )
}

type Authorization = (AccountName, CredentialResult<Token>);

struct Monitor {
    registry: AccountRegistry,
    /// Names whose credential acquisition is still running.
    pending: HashSet<String>,
    settings: Settings,
    timer: RefreshTimer,
    cursor: GenerationCursor,
    permits: Arc<Semaphore>,
    retry: RetryPolicy,
    history: Arc<Mutex<ActivityHistory>>,
    credentials: Arc<dyn CredentialProvider>,
    factory: Arc<dyn ClientFactory>,
    events: mpsc::UnboundedSender<MonitorEvent>,
    authorized: mpsc::UnboundedSender<Authorization>,
}

impl Monitor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut authorized: mpsc::UnboundedReceiver<Authorization>,
    ) {
        info!(
            "Monitor started, refreshing every {} min",
            self.settings.refresh_interval_minutes
        );
        self.emit(MonitorEvent::SettingsChanged(self.settings.clone()));

        loop {
            tokio::select! {
                () = tokio::time::sleep_until(self.timer.deadline()) => {
                    self.timer.fire();
                    self.start_pass();
                }
                command = commands.recv() => match command {
                    Some(Command::Shutdown) | None => break,
                    Some(command) => self.handle(command),
                },
                Some((account, result)) = authorized.recv() => {
                    self.finish_registration(account, result);
                }
            }
        }
        info!("Monitor stopped");
    }

    fn emit(&self, event: MonitorEvent) {
        if self.events.send(event).is_err() {
            debug!("Event dropped; display has gone away");
        }
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::AddAccount(name) => self.add_account(name),
            Command::UpdateSettings(change) => self.update_settings(change),
            Command::RefreshNow => self.start_pass(),
            Command::Accounts(reply) => {
                let _ = reply.send(self.registry.names());
            }
            Command::Shutdown => {}
        }
    }

    fn add_account(&mut self, name: String) {
        let taken = |n: &str| self.registry.contains(n) || self.pending.contains(n);
        let account = match validate_account_name(&name, taken) {
            Ok(account) => account,
            Err(error) => {
                warn!("Rejected account {name:?}: {error}");
                self.emit(MonitorEvent::AccountRejected { name, error });
                return;
            }
        };

        self.pending.insert(name);
        let credentials = self.credentials.clone();
        let authorized = self.authorized.clone();
        tokio::spawn(async move {
            let result = credentials.obtain(&account).await;
            let _ = authorized.send((account, result));
        });
    }

    fn finish_registration(&mut self, account: AccountName, result: CredentialResult<Token>) {
        self.pending.remove(account.as_str());

        let token = match result {
            Ok(token) => token,
            Err(e) => {
                warn!("Could not authorize {account}: {e}");
                self.emit(MonitorEvent::AccountRejected {
                    name: account.to_string(),
                    error: RegistrationError::Credential {
                        name: account.to_string(),
                        reason: e.to_string(),
                    },
                });
                return;
            }
        };

        let entry = Account::new(account.clone(), self.factory.connect(&account, token));
        if let Err(error) = self.registry.insert(entry.clone()) {
            self.emit(MonitorEvent::AccountRejected {
                name: account.to_string(),
                error,
            });
            return;
        }
        info!("Account {account} added");
        self.emit(MonitorEvent::AccountAdded { account });

        let generation = self.cursor.current();
        self.spawn_fetch(entry, generation);
        self.spawn_dashboard(generation);
    }

    fn update_settings(&mut self, change: SettingsChange) {
        self.settings = self.settings.apply(change);
        self.emit(MonitorEvent::SettingsChanged(self.settings.clone()));

        match change.effect() {
            SettingsEffect::Reschedule(period) => {
                debug!("Refresh period now {period:?} from the next tick on");
                self.timer.set_period(period);
            }
            SettingsEffect::RefreshNow => self.start_pass(),
            SettingsEffect::Restyle | SettingsEffect::None => {}
        }
    }

    fn start_pass(&mut self) {
        let generation = self.cursor.advance();
        info!(
            "Refresh pass {generation} over {} accounts",
            self.registry.len()
        );
        self.emit(MonitorEvent::PassStarted { generation });

        for account in self.registry.iter() {
            self.spawn_fetch(account.clone(), generation);
        }
        self.spawn_dashboard(generation);
    }

    fn spawn_fetch(&self, account: Account, generation: Generation) {
        let name = account.name.clone();
        let task = FetchTask::new(account, generation, self.cursor.clone()).with_retry(self.retry);
        let permits = self.permits.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            let report = task.run(&events).await;
            let emitted = report.emitted;
            if let Some(e) = &report.error {
                warn!("Fetch for {name} {generation} failed after {emitted} messages: {e}");
            } else if report.superseded {
                debug!("Fetch for {name} {generation} superseded after {emitted} messages");
            } else {
                debug!("Fetch for {name} {generation} finished with {emitted} messages");
            }
        });
    }

    fn spawn_dashboard(&self, generation: Generation) {
        let accounts = self.registry.snapshot();
        let permits = self.permits.clone();
        let cursor = self.cursor.clone();
        let history = self.history.clone();
        let events = self.events.clone();
        let retry = self.retry;

        tokio::spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            if !cursor.is_current(generation) {
                return;
            }

            let mut snapshot = dashboard::collect(&accounts, &retry).await;
            let today = Local::now().date_naive();
            let mut history = history.lock().await;
            if snapshot.accounts.iter().all(|a| a.total.is_some()) {
                history.record(today, snapshot.total_messages);
            }
            snapshot.activity = history.series(today);
            drop(history);

            let _ = events.send(MonitorEvent::Dashboard {
                generation,
                snapshot,
            });
        });
    }
}
