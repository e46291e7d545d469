use crate::activity::ActivityTracker;
use crate::auth::AuthCollaborator;
use crate::config::SessionConfig;
use crate::navigation::Navigator;
use chrono::Duration;
use std::sync::{Arc, Mutex, Weak};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Disarmed,
    Armed,
    Checking,
    LoggingOut,
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Idle time is within the threshold.
    Active { idle: Duration },
    /// The threshold was exceeded; sign-out ran and the redirect was issued.
    LoggedOut,
    /// The watchdog was not armed, so nothing was checked.
    Skipped(WatchdogState),
}

struct WatchdogInner {
    tracker: ActivityTracker,
    auth: Arc<dyn AuthCollaborator>,
    navigator: Arc<dyn Navigator>,
    check_interval: std::time::Duration,
    sign_in_path: String,
    state: Mutex<WatchdogState>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Signs the session out once the tracker reports too much idle time.
///
/// Clones share the same state and timer.
#[derive(Clone)]
pub struct InactivityWatchdog {
    inner: Arc<WatchdogInner>,
}

impl std::fmt::Debug for InactivityWatchdog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InactivityWatchdog")
            .field("state", &self.state())
            .field("check_interval", &self.inner.check_interval)
            .field("sign_in_path", &self.inner.sign_in_path)
            .finish_non_exhaustive()
    }
}

impl InactivityWatchdog {
    pub fn new(
        config: &SessionConfig,
        tracker: ActivityTracker,
        auth: Arc<dyn AuthCollaborator>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            inner: Arc::new(WatchdogInner {
                tracker,
                auth,
                navigator,
                check_interval: config.check_interval(),
                sign_in_path: config.sign_in_path.clone(),
                state: Mutex::new(WatchdogState::Disarmed),
                ticker: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn state(&self) -> WatchdogState {
        self.inner
            .state
            .lock()
            .map(|state| *state)
            .unwrap_or(WatchdogState::Stopped)
    }

    #[must_use]
    pub fn is_armed(&self) -> bool {
        matches!(self.state(), WatchdogState::Armed | WatchdogState::Checking)
    }

    /// Whether a recurring check task is currently owned by this watchdog.
    #[must_use]
    pub fn has_ticker(&self) -> bool {
        self.inner.ticker.lock().map(|ticker| ticker.is_some()).unwrap_or(false)
    }

    #[must_use]
    pub fn time_until_logout(&self) -> Option<Duration> {
        if self.is_armed() {
            Some(self.inner.tracker.time_until_logout())
        } else {
            None
        }
    }

    /// Moves `Disarmed → Armed` and starts the recurring check. The first
    /// check runs one interval from now.
    ///
    /// Returns `false` without starting anything from any other state, so a
    /// watchdog never owns more than one recurring check. Outside a tokio
    /// runtime it also returns `false` and stays `Disarmed`.
    pub fn arm(&self) -> bool {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime available, session watchdog not armed");
            return false;
        };
        if !self.transition(WatchdogState::Disarmed, WatchdogState::Armed) {
            return false;
        }

        let handle = runtime.spawn(run_ticker(Arc::downgrade(&self.inner), self.inner.check_interval));
        if let Ok(mut ticker) = self.inner.ticker.lock() {
            if let Some(stale) = ticker.replace(handle) {
                stale.abort();
            }
        }

        info!(
            "Session watchdog armed (timeout {}s, check every {}ms)",
            self.inner.tracker.inactivity_timeout().num_seconds(),
            self.inner.check_interval.as_millis()
        );
        true
    }

    /// Moves `Armed`/`Checking` back to `Disarmed` and cancels the recurring check.
    pub fn disarm(&self) -> bool {
        let disarmed = match self.inner.state.lock() {
            Ok(mut state) if matches!(*state, WatchdogState::Armed | WatchdogState::Checking) => {
                *state = WatchdogState::Disarmed;
                true
            }
            _ => false,
        };

        if disarmed {
            self.cancel_ticker();
            info!("Session watchdog disarmed");
        }
        disarmed
    }

    /// Tears the watchdog down from any state. Safe to call repeatedly.
    ///
    /// An in-flight sign-out is not cancelled; its redirect still happens.
    pub fn stop(&self) -> bool {
        let cancelled = self.cancel_ticker();
        let previous = match self.inner.state.lock() {
            Ok(mut state) => std::mem::replace(&mut *state, WatchdogState::Stopped),
            Err(_) => WatchdogState::Stopped,
        };

        if previous != WatchdogState::Stopped {
            debug!("Session watchdog stopped from {previous:?}");
        }
        cancelled || previous != WatchdogState::Stopped
    }

    /// Runs one inactivity check.
    ///
    /// When the idle time exceeds the threshold the recurring check is
    /// released, the auth collaborator's sign-out is awaited and the sign-in
    /// page is loaded, whatever the sign-out result.
    pub async fn check(&self) -> CheckOutcome {
        if let Err(state) = self.enter_check() {
            return CheckOutcome::Skipped(state);
        }

        let tracker = &self.inner.tracker;
        let now = tracker.now();
        let idle = tracker.idle_for(now);
        debug!("Time since last activity: {}ms", idle.num_milliseconds());

        if !tracker.is_expired(now) {
            self.transition(WatchdogState::Checking, WatchdogState::Armed);
            return CheckOutcome::Active { idle };
        }

        if !self.transition(WatchdogState::Checking, WatchdogState::LoggingOut) {
            return CheckOutcome::Skipped(self.state());
        }

        info!("Inactivity threshold exceeded after {}s, logging out", idle.num_seconds());
        // Detach rather than abort: this check may be running on the ticker task itself.
        drop(self.take_ticker());

        self.sign_out().await;
        self.inner.navigator.hard_redirect(&self.inner.sign_in_path);

        if let Ok(mut state) = self.inner.state.lock() {
            *state = WatchdogState::Stopped;
        }
        CheckOutcome::LoggedOut
    }

    async fn sign_out(&self) {
        // Spawned so a panicking collaborator is reported as a failure instead of
        // unwinding past the redirect.
        let auth = Arc::clone(&self.inner.auth);
        match tokio::spawn(async move { auth.sign_out().await }).await {
            Ok(Ok(())) => debug!("Session timeout sign-out succeeded"),
            Ok(Err(e)) => warn!("Error during session timeout logout: {e}"),
            Err(e) => warn!("Session timeout logout did not complete: {e}"),
        }
    }

    fn enter_check(&self) -> Result<(), WatchdogState> {
        match self.inner.state.lock() {
            Ok(mut state) if *state == WatchdogState::Armed => {
                *state = WatchdogState::Checking;
                Ok(())
            }
            Ok(state) => Err(*state),
            Err(_) => Err(WatchdogState::Stopped),
        }
    }

    fn transition(&self, from: WatchdogState, to: WatchdogState) -> bool {
        match self.inner.state.lock() {
            Ok(mut state) if *state == from => {
                *state = to;
                true
            }
            _ => false,
        }
    }

    fn take_ticker(&self) -> Option<JoinHandle<()>> {
        self.inner.ticker.lock().ok().and_then(|mut ticker| ticker.take())
    }

    fn cancel_ticker(&self) -> bool {
        match self.take_ticker() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }
}

async fn run_ticker(watchdog: Weak<WatchdogInner>, period: std::time::Duration) {
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!("Starting inactivity check interval");
    loop {
        interval.tick().await;

        let Some(inner) = watchdog.upgrade() else {
            break;
        };
        let outcome = InactivityWatchdog { inner }.check().await;
        if !matches!(outcome, CheckOutcome::Active { .. }) {
            break;
        }
    }
    debug!("Inactivity check interval finished");
}
