//! Fixed-period refresh timer.

use std::time::Duration;

use tokio::time::Instant;

/// Deadline-based timer whose period can change between ticks.
///
/// Changing the period never moves the pending deadline; the new period is
/// used when the deadline after that is computed.
#[derive(Debug, Clone)]
pub struct RefreshTimer {
    period: Duration,
    deadline: Instant,
}

impl RefreshTimer {
    /// Starts a timer whose first tick is one `period` from now.
    #[must_use]
    pub fn start(period: Duration) -> Self {
        Self {
            period,
            deadline: Instant::now() + period,
        }
    }

    /// When the next tick is due.
    #[must_use]
    pub const fn deadline(&self) -> Instant {
        self.deadline
    }

    /// Sets the period for ticks after the pending one.
    pub const fn set_period(&mut self, period: Duration) {
        self.period = period;
    }

    /// Records that the pending tick fired and schedules the next one a
    /// full period from now.
    pub fn fire(&mut self) {
        self.deadline = Instant::now() + self.period;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_period_change_keeps_pending_deadline() {
        let start = Instant::now();
        let mut timer = RefreshTimer::start(Duration::from_secs(300));

        tokio::time::advance(Duration::from_secs(60)).await;
        timer.set_period(Duration::from_secs(60));
        assert_eq!(timer.deadline(), start + Duration::from_secs(300));

        tokio::time::sleep_until(timer.deadline()).await;
        timer.fire();
        assert_eq!(timer.deadline(), start + Duration::from_secs(360));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_tick_restarts_from_now() {
        let start = Instant::now();
        let mut timer = RefreshTimer::start(Duration::from_secs(60));

        tokio::time::advance(Duration::from_secs(200)).await;
        timer.fire();
        assert_eq!(timer.deadline(), start + Duration::from_secs(260));
    }
}
