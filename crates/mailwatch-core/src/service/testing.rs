//! In-memory [`MailClient`] for unit tests.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::client::{Header, MailClient, MessageId, RawMessage, UNREAD_FILTER};
use super::error::MailServiceError;

/// Tracks how many calls are in progress at once, possibly across clients.
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of concurrent calls observed.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Scriptable mailbox.
///
/// Messages are listed in insertion order. Failures can be scripted per
/// operation, either as a queue consumed one call at a time or as a
/// permanent error.
#[derive(Debug, Default)]
pub struct MockMailClient {
    messages: Vec<(MessageId, RawMessage)>,
    total: u64,
    unread: u64,
    get_delay: Option<Duration>,
    list_failures: Mutex<VecDeque<MailServiceError>>,
    list_error: Option<MailServiceError>,
    count_error: Option<MailServiceError>,
    get_errors: HashMap<String, MailServiceError>,
    list_calls: AtomicUsize,
    get_calls: AtomicUsize,
    count_calls: AtomicUsize,
    gauge: Arc<Gauge>,
}

impl MockMailClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `n` messages whose subjects are `"{prefix} {i}"`.
    pub fn with_messages(mut self, prefix: &str, n: usize) -> Self {
        for i in 0..n {
            let id = format!("{prefix}-{i}");
            let message = RawMessage {
                headers: vec![
                    Header::new("From", format!("sender{i}@example.com")),
                    Header::new("Subject", format!("{prefix} {i}")),
                    Header::new("Date", format!("Mon, {} Jan 2024 10:00:00 +0000", i + 1)),
                ],
                snippet: format!("snippet {i}"),
            };
            self.messages.push((MessageId(id), message));
        }
        self.total = self.messages.len() as u64;
        self
    }

    pub fn with_message(mut self, id: &str, message: RawMessage) -> Self {
        self.messages.push((MessageId::new(id), message));
        self
    }

    pub const fn with_counts(mut self, total: u64, unread: u64) -> Self {
        self.total = total;
        self.unread = unread;
        self
    }

    pub const fn with_get_delay(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    /// Fails the next `errors.len()` list calls, in order.
    pub fn failing_lists(self, errors: impl IntoIterator<Item = MailServiceError>) -> Self {
        self.list_failures.lock().unwrap().extend(errors);
        self
    }

    /// Records `get` concurrency in `gauge`.
    pub fn with_gauge(mut self, gauge: Arc<Gauge>) -> Self {
        self.gauge = gauge;
        self
    }

    pub fn failing_list(mut self, error: MailServiceError) -> Self {
        self.list_error = Some(error);
        self
    }

    pub fn failing_count(mut self, error: MailServiceError) -> Self {
        self.count_error = Some(error);
        self
    }

    pub fn failing_get(mut self, id: &str, error: MailServiceError) -> Self {
        self.get_errors.insert(id.to_string(), error);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MailClient for MockMailClient {
    async fn list_recent(
        &self,
        max_count: u32,
        _filter: Option<&str>,
    ) -> Result<Vec<MessageId>, MailServiceError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = self.list_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        if let Some(err) = &self.list_error {
            return Err(err.clone());
        }
        Ok(self
            .messages
            .iter()
            .take(max_count as usize)
            .map(|(id, _)| id.clone())
            .collect())
    }

    async fn get(&self, id: &MessageId) -> Result<RawMessage, MailServiceError> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.gauge.enter();
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        self.gauge.exit();

        if let Some(err) = self.get_errors.get(id.as_str()) {
            return Err(err.clone());
        }
        self.messages
            .iter()
            .find(|(m, _)| m == id)
            .map(|(_, message)| message.clone())
            .ok_or_else(|| MailServiceError::NotFound(id.to_string()))
    }

    async fn estimate_count(&self, filter: Option<&str>) -> Result<u64, MailServiceError> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.count_error {
            return Err(err.clone());
        }
        Ok(if filter == Some(UNREAD_FILTER) {
            self.unread
        } else {
            self.total
        })
    }
}
