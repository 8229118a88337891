//! Events delivered to the display sink.

use crate::account::{AccountName, RegistrationError};
use crate::dashboard::DashboardSnapshot;
use crate::fetch::MessageSummary;
use crate::generation::Generation;
use crate::service::MailServiceError;
use crate::settings::Settings;

/// Something the display should know about.
///
/// Events travel over one ordered channel. Within a single account's fetch,
/// summaries arrive in listing order; across accounts no order is implied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    /// A refresh pass began; the message list should be cleared.
    PassStarted {
        /// The new pass.
        generation: Generation,
    },
    /// One fetched message.
    Summary {
        /// Pass the fetch belongs to.
        generation: Generation,
        /// The message.
        summary: MessageSummary,
    },
    /// An account's fetch gave up.
    FetchFailed {
        /// Pass the fetch belongs to.
        generation: Generation,
        /// Account whose fetch failed.
        account: AccountName,
        /// Final error after retries.
        error: MailServiceError,
    },
    /// An account's fetch ended, successfully or not.
    FetchFinished {
        /// Pass the fetch belongs to.
        generation: Generation,
        /// Account that was fetched.
        account: AccountName,
        /// Number of [`MonitorEvent::Summary`] events emitted.
        emitted: usize,
    },
    /// Fresh dashboard figures.
    Dashboard {
        /// Pass the recompute belongs to.
        generation: Generation,
        /// The figures.
        snapshot: DashboardSnapshot,
    },
    /// An account was registered.
    AccountAdded {
        /// The new account.
        account: AccountName,
    },
    /// An add-account request was turned down; nothing changed.
    AccountRejected {
        /// The name as submitted.
        name: String,
        /// Why it was rejected.
        error: RegistrationError,
    },
    /// Settings now in effect.
    SettingsChanged(Settings),
}

impl MonitorEvent {
    /// Generation the event belongs to, for pass-scoped events.
    #[must_use]
    pub const fn generation(&self) -> Option<Generation> {
        match self {
            Self::PassStarted { generation }
            | Self::Summary { generation, .. }
            | Self::FetchFailed { generation, .. }
            | Self::FetchFinished { generation, .. }
            | Self::Dashboard { generation, .. } => Some(*generation),
            Self::AccountAdded { .. } | Self::AccountRejected { .. } | Self::SettingsChanged(_) => {
                None
            }
        }
    }
}
