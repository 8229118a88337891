//! Fetch task: list recent messages for one account and stream summaries.

mod summary;

pub use summary::{MessageSummary, NO_SUBJECT, UNKNOWN_SENDER};

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::account::Account;
use crate::event::MonitorEvent;
use crate::generation::{Generation, GenerationCursor};
use crate::service::{MailServiceError, RetryPolicy};

/// Number of most recent messages a fetch lists.
pub const FETCH_COUNT: u32 = 10;

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchReport {
    /// Summaries emitted.
    pub emitted: usize,
    /// Final error, if the fetch gave up.
    pub error: Option<MailServiceError>,
    /// True if a newer pass started before the fetch completed.
    pub superseded: bool,
}

/// One execution of "list then get" for one account.
#[derive(Debug)]
pub struct FetchTask {
    account: Account,
    generation: Generation,
    cursor: GenerationCursor,
    retry: RetryPolicy,
}

impl FetchTask {
    /// Creates a fetch of the [`FETCH_COUNT`] most recent messages on behalf
    /// of `generation`.
    #[must_use]
    pub fn new(account: Account, generation: Generation, cursor: GenerationCursor) -> Self {
        Self {
            account,
            generation,
            cursor,
            retry: RetryPolicy::default(),
        }
    }

    /// Sets the retry policy applied to each provider call.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Runs the fetch, sending each summary as soon as it is extracted.
    ///
    /// Always ends with [`MonitorEvent::FetchFinished`], preceded by
    /// [`MonitorEvent::FetchFailed`] if a call failed after retries. The task
    /// stops early, without an error, once a newer generation has started.
    pub async fn run(self, events: &UnboundedSender<MonitorEvent>) -> FetchReport {
        let name = self.account.name.clone();
        let mut report = FetchReport {
            emitted: 0,
            error: None,
            superseded: false,
        };

        if let Err(e) = self.fetch(events, &mut report).await {
            let _ = events.send(MonitorEvent::FetchFailed {
                generation: self.generation,
                account: name.clone(),
                error: e.clone(),
            });
            report.error = Some(e);
        }

        let _ = events.send(MonitorEvent::FetchFinished {
            generation: self.generation,
            account: name,
            emitted: report.emitted,
        });
        report
    }

    async fn fetch(
        &self,
        events: &UnboundedSender<MonitorEvent>,
        report: &mut FetchReport,
    ) -> Result<(), MailServiceError> {
        if !self.cursor.is_current(self.generation) {
            report.superseded = true;
            return Ok(());
        }

        let client = &self.account.client;
        let ids = self
            .retry
            .run("list recent", || client.list_recent(FETCH_COUNT, None))
            .await?;
        debug!("{} listed {} messages", self.account.name, ids.len());

        for id in &ids {
            if !self.cursor.is_current(self.generation) {
                report.superseded = true;
                return Ok(());
            }

            let raw = self.retry.run("get message", || client.get(id)).await?;
            let summary = MessageSummary::from_raw(self.account.name.clone(), raw);
            if events
                .send(MonitorEvent::Summary {
                    generation: self.generation,
                    summary,
                })
                .is_err()
            {
                // Nobody is listening any more.
                return Ok(());
            }
            report.emitted += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::account::AccountName;
    use crate::service::testing::MockMailClient;

    fn task(client: Arc<MockMailClient>, cursor: &GenerationCursor) -> FetchTask {
        let account = Account::new(AccountName::new("work").unwrap(), client);
        FetchTask::new(account, cursor.current(), cursor.clone()).with_retry(RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(10),
        })
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>) -> Vec<MonitorEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn subjects(events: &[MonitorEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                MonitorEvent::Summary { summary, .. } => Some(summary.subject.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_emits_ten_most_recent_in_listing_order() {
        let cursor = GenerationCursor::new();
        cursor.advance();
        let client = Arc::new(MockMailClient::new().with_messages("m", 15));
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = task(client.clone(), &cursor).run(&tx).await;

        assert_eq!(report.emitted, 10);
        assert_eq!(client.get_calls(), 10);
        let events = drain(&mut rx);
        let expected: Vec<String> = (0..10).map(|i| format!("m {i}")).collect();
        assert_eq!(subjects(&events), expected);
        assert!(matches!(
            events.last().unwrap(),
            MonitorEvent::FetchFinished { emitted: 10, .. }
        ));
    }

    #[tokio::test]
    async fn test_empty_mailbox() {
        let cursor = GenerationCursor::new();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = task(Arc::new(MockMailClient::new()), &cursor).run(&tx).await;

        assert_eq!(report.emitted, 0);
        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MonitorEvent::FetchFinished { emitted: 0, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_list_failure_is_retried() {
        let cursor = GenerationCursor::new();
        let client = Arc::new(
            MockMailClient::new()
                .with_messages("m", 2)
                .failing_lists([MailServiceError::Connection("reset".into())]),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = task(client.clone(), &cursor).run(&tx).await;

        assert_eq!(report.error, None);
        assert_eq!(report.emitted, 2);
        assert_eq!(client.list_calls(), 2);
        assert!(
            !drain(&mut rx)
                .iter()
                .any(|e| matches!(e, MonitorEvent::FetchFailed { .. }))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_failure_stops_remaining_work() {
        let cursor = GenerationCursor::new();
        let client = Arc::new(
            MockMailClient::new()
                .with_messages("m", 5)
                .failing_get("m-2", MailServiceError::Authentication("401".into())),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = task(client.clone(), &cursor).run(&tx).await;

        assert_eq!(report.emitted, 2);
        assert_eq!(client.get_calls(), 3);
        let events = drain(&mut rx);
        assert_eq!(subjects(&events), ["m 0", "m 1"]);
        let failures = events
            .iter()
            .filter(|e| matches!(e, MonitorEvent::FetchFailed { .. }))
            .count();
        assert_eq!(failures, 1);
        assert!(matches!(
            events.last().unwrap(),
            MonitorEvent::FetchFinished { emitted: 2, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_once_superseded() {
        let cursor = GenerationCursor::new();
        let client = Arc::new(
            MockMailClient::new()
                .with_messages("m", 10)
                .with_get_delay(Duration::from_secs(1)),
        );
        let (tx, mut rx) = mpsc::unbounded_channel();

        let running = tokio::spawn({
            let task = task(client.clone(), &cursor);
            async move { task.run(&tx).await }
        });
        tokio::time::sleep(Duration::from_millis(2500)).await;
        cursor.advance();
        let report = running.await.unwrap();

        assert!(report.superseded);
        assert_eq!(report.emitted, 3);
        assert_eq!(subjects(&drain(&mut rx)).len(), 3);
    }
}
