//! Display-side state built from monitor events.
//!
//! Both views remember the newest generation they have seen and ignore
//! pass-scoped events from older ones, so results of a superseded pass can
//! never reappear after the list was cleared.

use std::collections::HashMap;

use crate::account::AccountName;
use crate::dashboard::DashboardSnapshot;
use crate::event::MonitorEvent;
use crate::fetch::MessageSummary;
use crate::generation::Generation;

/// The message list with its search filter and per-account limit.
#[derive(Debug, Clone, Default)]
pub struct MessageList {
    generation: Generation,
    messages: Vec<MessageSummary>,
    query: String,
    per_account: Option<usize>,
}

impl MessageList {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event. Returns true if the list changed.
    pub fn apply(&mut self, event: &MonitorEvent) -> bool {
        if is_stale(event, self.generation) {
            return false;
        }
        match event {
            MonitorEvent::PassStarted { generation } => {
                self.generation = *generation;
                self.messages.clear();
                true
            }
            MonitorEvent::Summary { summary, .. } => {
                self.messages.push(summary.clone());
                true
            }
            _ => false,
        }
    }

    /// Sets the search text. Matching is case-insensitive.
    pub fn set_search(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    /// Current search text.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.query
    }

    /// Shows at most `limit` messages per account, counted in arrival order
    /// before the search is applied. Hidden messages are kept.
    pub fn set_per_account_limit(&mut self, limit: usize) {
        self.per_account = Some(limit);
    }

    /// Messages within the per-account limit that match the search, in
    /// arrival order.
    pub fn visible(&self) -> impl Iterator<Item = &MessageSummary> {
        let mut seen: HashMap<&AccountName, usize> = HashMap::new();
        self.messages.iter().filter(move |&m| {
            let rank = seen.entry(&m.account).or_default();
            *rank += 1;
            self.within_limit(*rank) && m.matches(&self.query)
        })
    }

    /// Whether the most recently added message is part of [`Self::visible`].
    #[must_use]
    pub fn newest_is_visible(&self) -> bool {
        let Some(newest) = self.messages.last() else {
            return false;
        };
        let rank = self
            .messages
            .iter()
            .filter(|m| m.account == newest.account)
            .count();
        self.within_limit(rank) && newest.matches(&self.query)
    }

    /// All messages of the current pass, ignoring search and limit.
    #[must_use]
    pub fn all(&self) -> &[MessageSummary] {
        &self.messages
    }

    fn within_limit(&self, rank: usize) -> bool {
        self.per_account.is_none_or(|limit| rank <= limit)
    }
}

/// The newest dashboard snapshot.
#[derive(Debug, Clone, Default)]
pub struct DashboardView {
    generation: Generation,
    snapshot: Option<DashboardSnapshot>,
}

impl DashboardView {
    /// Creates an empty view.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies an event. Returns true if the snapshot was replaced.
    pub fn apply(&mut self, event: &MonitorEvent) -> bool {
        if is_stale(event, self.generation) {
            return false;
        }
        match event {
            MonitorEvent::Dashboard {
                generation,
                snapshot,
            } => {
                self.generation = *generation;
                self.snapshot = Some(snapshot.clone());
                true
            }
            _ => false,
        }
    }

    /// Latest snapshot, if any arrived yet.
    #[must_use]
    pub const fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }
}

/// Pass-scoped events from a generation older than `shown`.
fn is_stale(event: &MonitorEvent, shown: Generation) -> bool {
    event
        .generation()
        .is_some_and(|generation| generation.is_older_than(shown))
}
