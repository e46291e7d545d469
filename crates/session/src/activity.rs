use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::trace;

/// Records the instant of the most recent user interaction.
///
/// Clones share the same timestamp, so one clone can sit behind the input
/// listeners while the watchdog reads another.
#[derive(Clone)]
pub struct ActivityTracker {
    last_activity_ms: Arc<AtomicI64>,
    clock: Arc<dyn Clock>,
    inactivity_timeout: Duration,
}

impl std::fmt::Debug for ActivityTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityTracker")
            .field("last_activity", &self.last_activity())
            .field("inactivity_timeout", &self.inactivity_timeout)
            .finish_non_exhaustive()
    }
}

impl ActivityTracker {
    pub fn new(clock: Arc<dyn Clock>, inactivity_timeout: std::time::Duration) -> Self {
        let now = clock.now().timestamp_millis();
        Self {
            last_activity_ms: Arc::new(AtomicI64::new(now)),
            clock,
            inactivity_timeout: Duration::from_std(inactivity_timeout).unwrap_or(Duration::MAX),
        }
    }

    /// Overwrites the last activity with the current instant.
    pub fn record_activity(&self) {
        let now = self.clock.now().timestamp_millis();
        self.last_activity_ms.store(now, Ordering::Release);
        trace!("Activity recorded at {now}");
    }

    #[must_use]
    pub fn last_activity(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.last_activity_ms.load(Ordering::Acquire)).unwrap_or_default()
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    #[must_use]
    pub fn idle_for(&self, now: DateTime<Utc>) -> Duration {
        // Both sides on the millisecond grid the timestamp is stored on.
        Duration::milliseconds(now.timestamp_millis() - self.last_activity_ms.load(Ordering::Acquire))
    }

    /// Strictly greater than the timeout; an idle time equal to it is still allowed.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.idle_for(now) > self.inactivity_timeout
    }

    #[must_use]
    pub const fn inactivity_timeout(&self) -> Duration {
        self.inactivity_timeout
    }

    #[must_use]
    pub fn time_until_logout(&self) -> Duration {
        // Activity stamped ahead of the clock counts as no idle time.
        let idle = self.idle_for(self.clock.now()).max(Duration::zero());

        if idle >= self.inactivity_timeout {
            Duration::zero()
        } else {
            self.inactivity_timeout - idle
        }
    }
}
