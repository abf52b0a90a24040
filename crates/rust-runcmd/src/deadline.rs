//! Wall-clock deadline for a run.

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Timeout, timeout};

/// A fixed point in time after which a run is abandoned.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// The deadline instant.
    deadline: Instant,
}

impl Deadline {
    /// Create a deadline `duration` from now.
    #[must_use]
    pub fn from_now(duration: Duration) -> Self {
        Self {
            deadline: Instant::now() + duration,
        }
    }

    /// Check if the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Time left before the deadline, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    /// Sleep for `duration`, waking early at the deadline.
    pub async fn sleep_at_most(&self, duration: Duration) {
        let nap = duration.min(self.remaining());
        if !nap.is_zero() {
            tokio::time::sleep(nap).await;
        }
    }

    /// Bound a future by this deadline.
    pub fn apply<F: Future>(&self, future: F) -> Timeout<F> {
        timeout(self.remaining(), future)
    }
}

/// Sleep for `duration`, or less if `deadline` comes first.
pub(crate) async fn nap(duration: Duration, deadline: Option<&Deadline>) {
    match deadline {
        Some(deadline) => deadline.sleep_at_most(duration).await,
        None => tokio::time::sleep(duration).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_remaining() {
        let deadline = Deadline::from_now(Duration::from_secs(10));
        assert!(!deadline.is_expired());
        assert!(deadline.remaining() > Duration::from_secs(9));
    }

    #[tokio::test]
    async fn sleep_is_capped_by_deadline() {
        let deadline = Deadline::from_now(Duration::from_millis(50));
        let start = Instant::now();
        nap(Duration::from_secs(5), Some(&deadline)).await;
        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(deadline.is_expired());
    }

    #[tokio::test]
    async fn apply_times_out() {
        let deadline = Deadline::from_now(Duration::from_millis(10));
        let result = deadline
            .apply(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert!(result.is_err());
    }
}
