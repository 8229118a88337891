//! Terminal display sink.

use std::collections::HashMap;
use std::io::{self, Write};

use mailwatch_core::{
    AccountName, DashboardSnapshot, DashboardView, MessageList, MessageSummary, MonitorEvent,
    Settings,
};
use tracing::{debug, warn};

/// Raises a desktop notification with a title and body.
pub type Notifier = Box<dyn FnMut(&str, &str) + Send>;

/// Shows a notification through the desktop's notification service.
pub fn desktop_notifier() -> Notifier {
    Box::new(|title, body| {
        if let Err(e) = notify_rust::Notification::new()
            .appname("mailwatch")
            .summary(title)
            .body(body)
            .show()
        {
            warn!("Couldn't show notification: {e}");
        }
    })
}

/// Prints monitor events and keeps the display models current.
pub struct Terminal<W: Write> {
    out: W,
    messages: MessageList,
    dashboard: DashboardView,
    settings: Settings,
    unread: HashMap<AccountName, u64>,
    notify: Notifier,
}

impl<W: Write> Terminal<W> {
    /// Creates a sink writing to `out`.
    pub fn new(out: W, notify: Notifier) -> Self {
        let settings = Settings::default();
        let mut messages = MessageList::new();
        messages.set_per_account_limit(settings.messages_per_account as usize);
        Self {
            out,
            messages,
            dashboard: DashboardView::new(),
            settings,
            unread: HashMap::new(),
            notify,
        }
    }

    /// Applies one event and prints whatever changed.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn handle(&mut self, event: &MonitorEvent) -> io::Result<()> {
        match event {
            MonitorEvent::PassStarted { generation } => {
                if self.messages.apply(event) {
                    writeln!(self.out, "-- refresh {generation} --")?;
                }
            }
            MonitorEvent::Summary { summary, .. } => {
                if self.messages.apply(event) && self.messages.newest_is_visible() {
                    print_summary(&mut self.out, summary)?;
                }
            }
            MonitorEvent::FetchFailed { account, error, .. } => {
                writeln!(self.out, "! {account}: {error}")?;
                if error.is_auth_failure() {
                    writeln!(
                        self.out,
                        "  {account} needs to be re-authorized; restart to sign in again"
                    )?;
                }
            }
            MonitorEvent::FetchFinished {
                generation,
                account,
                emitted,
            } => {
                debug!("{account} finished {generation} with {emitted} messages");
            }
            MonitorEvent::Dashboard { snapshot, .. } => {
                if self.dashboard.apply(event) {
                    self.notify_new_unread(snapshot);
                    print_totals(&mut self.out, snapshot)?;
                }
            }
            MonitorEvent::AccountAdded { account } => {
                writeln!(self.out, "+ account {account} added")?;
            }
            MonitorEvent::AccountRejected { error, .. } => {
                writeln!(self.out, "! {}", error.message())?;
            }
            MonitorEvent::SettingsChanged(settings) => {
                self.settings = settings.clone();
                self.messages
                    .set_per_account_limit(settings.messages_per_account as usize);
                print_settings(&mut self.out, settings)?;
            }
        }
        self.out.flush()
    }

    /// Changes the search text and reprints the list.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn search(&mut self, query: &str) -> io::Result<()> {
        self.messages.set_search(query);
        self.print_list()
    }

    /// Prints every message matching the current search.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn print_list(&mut self) -> io::Result<()> {
        let query = self.messages.search();
        if query.is_empty() {
            writeln!(self.out, "-- messages --")?;
        } else {
            writeln!(self.out, "-- messages matching '{query}' --")?;
        }
        for summary in self.messages.visible() {
            print_summary(&mut self.out, summary)?;
        }
        self.out.flush()
    }

    /// Prints the latest dashboard in full.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn print_dashboard(&mut self) -> io::Result<()> {
        let Some(snapshot) = self.dashboard.snapshot() else {
            writeln!(self.out, "dashboard not computed yet")?;
            return self.out.flush();
        };

        print_totals(&mut self.out, snapshot)?;
        for stats in &snapshot.accounts {
            let count = |n: Option<u64>| n.map_or_else(|| "?".to_string(), |n| n.to_string());
            write!(
                self.out,
                "  {}: {} messages, {} unread",
                stats.account,
                count(stats.total),
                count(stats.unread)
            )?;
            match &stats.error {
                Some(e) => writeln!(self.out, " ({e})")?,
                None => writeln!(self.out)?,
            }
        }
        writeln!(self.out, "recent:")?;
        for recent in &snapshot.recent {
            writeln!(self.out, "  {}: {}", recent.account, recent.subject)?;
        }
        writeln!(self.out, "activity:")?;
        for point in &snapshot.activity {
            writeln!(self.out, "  {} {}", point.day.format("%a %d"), point.total)?;
        }
        self.out.flush()
    }

    /// Writes a plain line, used for help and parse errors.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to the output fails.
    pub fn line(&mut self, text: &str) -> io::Result<()> {
        writeln!(self.out, "{text}")?;
        self.out.flush()
    }

    fn notify_new_unread(&mut self, snapshot: &DashboardSnapshot) {
        for stats in &snapshot.accounts {
            let Some(unread) = stats.unread else { continue };
            let before = self.unread.insert(stats.account.clone(), unread);
            let grew = before.is_some_and(|b| unread > b);
            if grew && self.settings.notifications_enabled {
                (self.notify)(
                    &format!("New mail in {}", stats.account),
                    &format!("{unread} unread messages"),
                );
            }
        }
    }
}

fn print_summary(out: &mut impl Write, summary: &MessageSummary) -> io::Result<()> {
    writeln!(
        out,
        "[{}] {} | {} | {}",
        summary.account, summary.sender, summary.subject, summary.date
    )?;
    if !summary.snippet.is_empty() {
        writeln!(out, "    {}", summary.snippet)?;
    }
    Ok(())
}

fn print_totals(out: &mut impl Write, snapshot: &DashboardSnapshot) -> io::Result<()> {
    let unread: u64 = snapshot.accounts.iter().filter_map(|s| s.unread).sum();
    writeln!(
        out,
        "dashboard: {} messages, {unread} unread across {} accounts",
        snapshot.total_messages,
        snapshot.accounts.len()
    )
}

fn print_settings(out: &mut impl Write, settings: &Settings) -> io::Result<()> {
    writeln!(
        out,
        "settings: every {} min, {} per account, font {}, {} mode, theme {}, notifications {}",
        settings.refresh_interval_minutes,
        settings.messages_per_account,
        settings.font_size,
        if settings.dark_mode { "dark" } else { "light" },
        settings.theme_color,
        if settings.notifications_enabled { "on" } else { "off" },
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use mailwatch_core::{AccountStats, Generation, MailServiceError, SettingsChange};

    use super::*;

    type Sent = Arc<Mutex<Vec<String>>>;

    fn terminal() -> (Terminal<Vec<u8>>, Sent) {
        let sent: Sent = Arc::default();
        let log = sent.clone();
        let notifier: Notifier = Box::new(move |title, _| log.lock().unwrap().push(title.into()));
        (Terminal::new(Vec::new(), notifier), sent)
    }

    fn output(terminal: &Terminal<Vec<u8>>) -> String {
        String::from_utf8(terminal.out.clone()).unwrap()
    }

    fn name(s: &str) -> AccountName {
        AccountName::new(s).unwrap()
    }

    fn failed(error: MailServiceError) -> MonitorEvent {
        MonitorEvent::FetchFailed {
            generation: Generation(1),
            account: name("work"),
            error,
        }
    }

    fn summary(generation: u64, subject: &str) -> MonitorEvent {
        MonitorEvent::Summary {
            generation: Generation(generation),
            summary: MessageSummary {
                account: name("work"),
                sender: "alice@example.com".into(),
                subject: subject.into(),
                date: "Mon, 1 Jan 2024".into(),
                snippet: "hello".into(),
            },
        }
    }

    fn dashboard(generation: u64, unread: u64) -> MonitorEvent {
        MonitorEvent::Dashboard {
            generation: Generation(generation),
            snapshot: DashboardSnapshot {
                total_messages: 100,
                accounts: vec![AccountStats {
                    account: name("work"),
                    total: Some(100),
                    unread: Some(unread),
                    error: None,
                }],
                recent: Vec::new(),
                activity: Vec::new(),
            },
        }
    }

    #[test]
    fn test_prints_summaries_of_the_current_pass() {
        let (mut terminal, _) = terminal();
        terminal
            .handle(&MonitorEvent::PassStarted {
                generation: Generation(2),
            })
            .unwrap();
        terminal.handle(&summary(2, "Quarterly report")).unwrap();
        terminal.handle(&summary(1, "Stale")).unwrap();

        let out = output(&terminal);
        assert!(out.contains("-- refresh #2 --"));
        assert!(out.contains("[work] alice@example.com | Quarterly report | Mon, 1 Jan 2024"));
        assert!(!out.contains("Stale"));
    }

    #[test]
    fn test_search_reprints_matching_messages() {
        let (mut terminal, _) = terminal();
        terminal.handle(&summary(0, "Invoice 42")).unwrap();
        terminal.handle(&summary(0, "Lunch")).unwrap();
        terminal.out.clear();

        terminal.search("invoice").unwrap();

        let out = output(&terminal);
        assert!(out.contains("Invoice 42"));
        assert!(!out.contains("Lunch"));
    }

    #[test]
    fn test_notifies_when_unread_grows() {
        let (mut terminal, sent) = terminal();
        terminal.handle(&dashboard(1, 3)).unwrap();
        terminal.handle(&dashboard(2, 3)).unwrap();
        assert!(sent.lock().unwrap().is_empty());

        terminal.handle(&dashboard(3, 5)).unwrap();
        assert_eq!(*sent.lock().unwrap(), ["New mail in work"]);
    }

    #[test]
    fn test_no_notification_when_disabled() {
        let (mut terminal, sent) = terminal();
        let settings = Settings::default().apply(SettingsChange::Notifications(false));
        terminal
            .handle(&MonitorEvent::SettingsChanged(settings))
            .unwrap();
        terminal.handle(&dashboard(1, 3)).unwrap();
        terminal.handle(&dashboard(2, 9)).unwrap();

        assert!(sent.lock().unwrap().is_empty());
        assert!(output(&terminal).contains("notifications off"));
    }

    #[test]
    fn test_auth_failure_asks_for_reauthorization() {
        let (mut terminal, _) = terminal();
        terminal
            .handle(&failed(MailServiceError::Connection("reset".into())))
            .unwrap();
        assert!(!output(&terminal).contains("re-authorized"));

        terminal
            .handle(&failed(MailServiceError::Authentication("401".into())))
            .unwrap();
        let out = output(&terminal);
        assert!(out.contains("! work: "));
        assert!(out.contains("work needs to be re-authorized"));
    }

    #[test]
    fn test_messages_per_account_caps_the_list() {
        let (mut terminal, _) = terminal();
        let settings = Settings::default().apply(SettingsChange::MessagesPerAccount(5));
        terminal
            .handle(&MonitorEvent::SettingsChanged(settings))
            .unwrap();
        for i in 0..7 {
            terminal.handle(&summary(0, &format!("note {i}"))).unwrap();
        }

        let out = output(&terminal);
        assert!(out.contains("note 4"));
        assert!(!out.contains("note 5"));

        terminal.out.clear();
        terminal.print_list().unwrap();
        assert_eq!(output(&terminal).matches("| note ").count(), 5);
    }

    #[test]
    fn test_dashboard_before_first_snapshot() {
        let (mut terminal, _) = terminal();
        terminal.print_dashboard().unwrap();
        assert_eq!(output(&terminal), "dashboard not computed yet\n");
    }
}
