//! Dashboard aggregates.
//!
//! A dashboard recompute asks every account for its total and unread counts
//! and its few most recent subjects, then sums the totals and records them
//! in an [`ActivityHistory`] that backs the seven-day activity series.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use tracing::{debug, warn};

use crate::account::{Account, AccountName};
use crate::fetch::MessageSummary;
use crate::service::{MailServiceError, RetryPolicy, UNREAD_FILTER};

/// Subjects listed per account in the "recent" panel.
pub const RECENT_PER_ACCOUNT: u32 = 5;

/// Days covered by the activity series, ending today.
pub const ACTIVITY_DAYS: u64 = 7;

/// Counts for one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountStats {
    /// Account name.
    pub account: AccountName,
    /// Estimated number of messages, if the provider answered.
    pub total: Option<u64>,
    /// Estimated number of unread messages, if the provider answered.
    pub unread: Option<u64>,
    /// First failure seen while collecting this account's figures.
    pub error: Option<MailServiceError>,
}

/// One entry of the "recent" panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentMessage {
    /// Account name.
    pub account: AccountName,
    /// Message subject.
    pub subject: String,
}

/// Total message count observed on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityPoint {
    /// Calendar day (local time).
    pub day: NaiveDate,
    /// Last total observed that day; 0 if none was.
    pub total: u64,
}

/// Everything the dashboard shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DashboardSnapshot {
    /// Sum of the per-account totals that were available.
    pub total_messages: u64,
    /// Per-account figures in registry order.
    pub accounts: Vec<AccountStats>,
    /// Most recent subjects, grouped by account in registry order.
    pub recent: Vec<RecentMessage>,
    /// Trailing activity series, oldest day first.
    pub activity: Vec<ActivityPoint>,
}

/// Daily totals remembered across recomputes.
#[derive(Debug, Clone, Default)]
pub struct ActivityHistory {
    days: BTreeMap<NaiveDate, u64>,
}

impl ActivityHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `total` as the latest observation for `day`.
    ///
    /// Days older than the series window are forgotten.
    pub fn record(&mut self, day: NaiveDate, total: u64) {
        self.days.insert(day, total);
        if let Some(cutoff) = day.checked_sub_days(Days::new(ACTIVITY_DAYS)) {
            self.days.retain(|d, _| *d > cutoff);
        }
    }

    /// The [`ACTIVITY_DAYS`]-day series ending on `today`, oldest first.
    #[must_use]
    pub fn series(&self, today: NaiveDate) -> Vec<ActivityPoint> {
        (0..ACTIVITY_DAYS)
            .rev()
            .filter_map(|back| today.checked_sub_days(Days::new(back)))
            .map(|day| ActivityPoint {
                day,
                total: self.days.get(&day).copied().unwrap_or(0),
            })
            .collect()
    }
}

/// Collects the counts and recent subjects for every account.
///
/// Failures are recorded per account; they never abort the recompute.
/// `activity` is left empty for the caller to fill in.
pub async fn collect(accounts: &[Account], retry: &RetryPolicy) -> DashboardSnapshot {
    let mut snapshot = DashboardSnapshot::default();

    for account in accounts {
        let client = &account.client;
        let mut error = None;

        let total = keep_first_error(
            retry
                .run("estimate total", || client.estimate_count(None))
                .await,
            &mut error,
        );
        let unread = keep_first_error(
            retry
                .run("estimate unread", || client.estimate_count(Some(UNREAD_FILTER)))
                .await,
            &mut error,
        );
        if let Some(subjects) = keep_first_error(recent_subjects(account, retry).await, &mut error) {
            snapshot.recent.extend(subjects);
        }

        if let Some(e) = &error {
            warn!("Dashboard figures for {} incomplete: {e}", account.name);
        }
        snapshot.total_messages += total.unwrap_or(0);
        snapshot.accounts.push(AccountStats {
            account: account.name.clone(),
            total,
            unread,
            error,
        });
    }

    debug!(
        "Dashboard: {} messages across {} accounts",
        snapshot.total_messages,
        snapshot.accounts.len()
    );
    snapshot
}

fn keep_first_error<T>(
    result: Result<T, MailServiceError>,
    first: &mut Option<MailServiceError>,
) -> Option<T> {
    result
        .map_err(|e| {
            first.get_or_insert(e);
        })
        .ok()
}

async fn recent_subjects(
    account: &Account,
    retry: &RetryPolicy,
) -> Result<Vec<RecentMessage>, MailServiceError> {
    let client = &account.client;
    let ids = retry
        .run("list recent", || client.list_recent(RECENT_PER_ACCOUNT, None))
        .await?;

    let mut recent = Vec::with_capacity(ids.len());
    for id in &ids {
        let raw = retry.run("get message", || client.get(id)).await?;
        let summary = MessageSummary::from_raw(account.name.clone(), raw);
        recent.push(RecentMessage {
            account: summary.account,
            subject: summary.subject,
        });
    }
    Ok(recent)
}
