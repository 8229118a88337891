//! Per-message projection shown in the message list.

use crate::account::AccountName;
use crate::service::RawMessage;

/// Sender shown when a message has no `From` header.
pub const UNKNOWN_SENDER: &str = "Unknown";

/// Subject shown when a message has no `Subject` header.
pub const NO_SUBJECT: &str = "No Subject";

/// What the display shows for one message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Account the message was fetched from.
    pub account: AccountName,
    /// `From` header.
    pub sender: String,
    /// `Subject` header.
    pub subject: String,
    /// `Date` header, unparsed.
    pub date: String,
    /// Provider-generated preview.
    pub snippet: String,
}

impl MessageSummary {
    /// Projects a fetched message.
    ///
    /// Header names are matched exactly; the first occurrence wins.
    #[must_use]
    pub fn from_raw(account: AccountName, message: RawMessage) -> Self {
        let field = |name: &str, default: &str| {
            message
                .header(name)
                .map_or_else(|| default.to_string(), str::to_string)
        };
        Self {
            sender: field("From", UNKNOWN_SENDER),
            subject: field("Subject", NO_SUBJECT),
            date: field("Date", ""),
            snippet: message.snippet.clone(),
            account,
        }
    }

    /// The four display lines joined by newlines.
    #[must_use]
    pub fn display_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}",
            self.sender, self.subject, self.date, self.snippet
        )
    }

    /// Case-insensitive substring match over [`Self::display_text`].
    ///
    /// The empty query matches everything.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        query.is_empty()
            || self
                .display_text()
                .to_lowercase()
                .contains(&query.to_lowercase())
    }
}
