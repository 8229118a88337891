//! Parsing of the one-line intents typed on stdin.

use mailwatch_core::{SettingsChange, ThemeColor};

/// Help text printed by `help`.
pub const HELP: &str = "\
commands:
  add <name>          register an account (opens the browser on first use)
  search [text]       filter the message list; no text clears the filter
  refresh             refresh every account now
  interval <minutes>  minutes between refreshes (1-60)
  count <n>           messages shown per account (5-50)
  font <size>         font size (8-16)
  dark on|off         dark mode
  notify on|off       desktop notifications
  theme #rrggbb       accent color
  dashboard           show the dashboard
  list                show the message list
  help                this text
  quit                exit";

/// A user intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Register an account.
    Add(String),
    /// Set the search text.
    Search(String),
    /// Refresh every account now.
    Refresh,
    /// Change a setting.
    Settings(SettingsChange),
    /// Print the dashboard.
    Dashboard,
    /// Print the message list.
    List,
    /// Print the help text.
    Help,
    /// Exit.
    Quit,
}

impl Intent {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns a message for the user when the line is not understood.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(v, r)| (v, r.trim()));

        let intent = match verb {
            "add" => Self::Add(rest.to_string()),
            "search" => Self::Search(rest.to_string()),
            "refresh" => Self::Refresh,
            "interval" => Self::Settings(SettingsChange::RefreshInterval(number(rest)?)),
            "count" => Self::Settings(SettingsChange::MessagesPerAccount(number(rest)?)),
            "font" => Self::Settings(SettingsChange::FontSize(number(rest)?)),
            "dark" => Self::Settings(SettingsChange::DarkMode(switch(rest)?)),
            "notify" => Self::Settings(SettingsChange::Notifications(switch(rest)?)),
            "theme" => Self::Settings(SettingsChange::ThemeColor(
                rest.parse::<ThemeColor>().map_err(|e| e.to_string())?,
            )),
            "dashboard" => Self::Dashboard,
            "list" => Self::List,
            "help" | "?" => Self::Help,
            "quit" | "exit" => Self::Quit,
            other => return Err(format!("unknown command '{other}' (try 'help')")),
        };
        Ok(Some(intent))
    }
}

fn number<T: std::str::FromStr>(arg: &str) -> Result<T, String> {
    arg.parse()
        .map_err(|_| format!("expected a number, got '{arg}'"))
}

fn switch(arg: &str) -> Result<bool, String> {
    match arg {
        "on" => Ok(true),
        "off" => Ok(false),
        _ => Err(format!("expected 'on' or 'off', got '{arg}'")),
    }
}
