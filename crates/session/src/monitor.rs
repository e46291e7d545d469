use crate::activity::ActivityTracker;
use crate::auth::AuthCollaborator;
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::input::{ActivityHandler, InputSurface, ListenerSet};
use crate::navigation::Navigator;
use crate::store::{PreferenceStore, SessionPreference};
use crate::watchdog::{InactivityWatchdog, WatchdogState};
use std::sync::{Arc, Mutex};
use tracing::{info, trace, warn};

/// External pieces a [`SessionMonitor`] talks to.
#[derive(Clone)]
pub struct SessionCollaborators {
    pub store: Arc<dyn PreferenceStore>,
    pub auth: Arc<dyn AuthCollaborator>,
    pub navigator: Arc<dyn Navigator>,
    pub surface: Arc<dyn InputSurface>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Listeners attached and the recurring check started by this call.
    Armed,
    /// Keep-logged-in is set; nothing was attached.
    Disarmed,
    /// A watchdog was already running; no second one was started.
    AlreadyRunning,
    /// The monitor has been torn down and cannot be armed again.
    Stopped,
    /// Called outside a tokio runtime; nothing was attached or started.
    NoRuntime,
}

/// Owns everything one session's inactivity handling needs: the activity
/// timestamp, the watchdog and its timer, and the listener registrations.
///
/// Dropping the monitor tears it down.
pub struct SessionMonitor {
    config: SessionConfig,
    collaborators: SessionCollaborators,
    tracker: ActivityTracker,
    watchdog: InactivityWatchdog,
    handler: ActivityHandler,
    listeners: Mutex<ListenerSet>,
}

impl std::fmt::Debug for SessionMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMonitor")
            .field("state", &self.state())
            .field("has_activity_listeners", &self.has_activity_listeners())
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl SessionMonitor {
    pub fn new(config: SessionConfig, collaborators: SessionCollaborators) -> Self {
        let tracker = ActivityTracker::new(Arc::clone(&collaborators.clock), config.inactivity_timeout());
        let watchdog = InactivityWatchdog::new(
            &config,
            tracker.clone(),
            Arc::clone(&collaborators.auth),
            Arc::clone(&collaborators.navigator),
        );

        // One handler for the monitor's whole life, so removal always matches addition.
        let handler: ActivityHandler = {
            let tracker = tracker.clone();
            Arc::new(move |kind| {
                trace!("Activity detected: {kind}");
                tracker.record_activity();
            })
        };

        Self {
            config,
            collaborators,
            tracker,
            watchdog,
            handler,
            listeners: Mutex::new(ListenerSet::new()),
        }
    }

    /// Mount-time start-up: arms the watchdog unless the persisted
    /// preference says to keep the user logged in.
    pub fn start(&self) -> MonitorStatus {
        match self.watchdog.state() {
            WatchdogState::Stopped => return MonitorStatus::Stopped,
            WatchdogState::Disarmed => {}
            WatchdogState::Armed | WatchdogState::Checking | WatchdogState::LoggingOut => {
                return MonitorStatus::AlreadyRunning;
            }
        }

        if SessionPreference::load(self.store()).keep_logged_in {
            info!("Keep logged in is active, session timeout disabled");
            return MonitorStatus::Disarmed;
        }

        self.arm()
    }

    /// Stamps activity, attaches the listeners and starts the recurring check.
    /// Re-arming a running monitor only refreshes the activity timestamp.
    ///
    /// The recurring check needs a tokio runtime; without one the monitor is
    /// left untouched and [`MonitorStatus::NoRuntime`] is returned.
    pub fn arm(&self) -> MonitorStatus {
        match self.watchdog.state() {
            WatchdogState::Stopped => return MonitorStatus::Stopped,
            WatchdogState::Disarmed => {}
            WatchdogState::Armed | WatchdogState::Checking | WatchdogState::LoggingOut => {
                self.tracker.record_activity();
                return MonitorStatus::AlreadyRunning;
            }
        }

        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No tokio runtime available, session monitor not armed");
            return MonitorStatus::NoRuntime;
        }

        self.tracker.record_activity();
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.attach(self.collaborators.surface.as_ref(), &self.handler);
        }

        if self.watchdog.arm() {
            MonitorStatus::Armed
        } else {
            MonitorStatus::AlreadyRunning
        }
    }

    /// Cancels the recurring check and removes the listeners, leaving the
    /// monitor able to arm again. Returns whether anything was running.
    pub fn disarm(&self) -> bool {
        let disarmed = self.watchdog.disarm();
        let detached = self.detach_listeners();
        disarmed || detached > 0
    }

    /// Teardown: cancels the timer and removes every listener this monitor
    /// added, from any state. Calling it again does nothing.
    pub fn stop(&self) {
        let stopped = self.watchdog.stop();
        let detached = self.detach_listeners();
        if stopped || detached > 0 {
            info!("Session monitor stopped");
        }
    }

    pub fn record_activity(&self) {
        self.tracker.record_activity();
    }

    #[must_use]
    pub fn state(&self) -> WatchdogState {
        self.watchdog.state()
    }

    #[must_use]
    pub fn has_activity_listeners(&self) -> bool {
        self.listeners
            .lock()
            .map(|listeners| listeners.has_activity_listeners())
            .unwrap_or(false)
    }

    #[must_use]
    pub fn time_until_logout(&self) -> Option<chrono::Duration> {
        self.watchdog.time_until_logout()
    }

    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    #[must_use]
    pub const fn tracker(&self) -> &ActivityTracker {
        &self.tracker
    }

    #[must_use]
    pub const fn watchdog(&self) -> &InactivityWatchdog {
        &self.watchdog
    }

    #[must_use]
    pub fn store(&self) -> &dyn PreferenceStore {
        self.collaborators.store.as_ref()
    }

    #[must_use]
    pub fn auth(&self) -> &Arc<dyn AuthCollaborator> {
        &self.collaborators.auth
    }

    #[must_use]
    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.collaborators.navigator
    }

    fn detach_listeners(&self) -> usize {
        self.listeners
            .lock()
            .map(|mut listeners| listeners.detach(self.collaborators.surface.as_ref()))
            .unwrap_or(0)
    }
}

impl Drop for SessionMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::auth::MockAuthClient;
    use crate::clock::ManualClock;
    use crate::input::{ActivityKind, EventSurface};
    use crate::navigation::RecordingNavigator;
    use crate::store::{KEEP_LOGGED_IN_KEY, MemoryStore};
    use chrono::{DateTime, Duration};

    struct Fixture {
        monitor: SessionMonitor,
        store: Arc<MemoryStore>,
        surface: Arc<EventSurface>,
        clock: Arc<ManualClock>,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let surface = Arc::new(EventSurface::new());
        let clock = Arc::new(ManualClock::new(DateTime::from_timestamp_millis(5_000_000).unwrap()));
        let monitor = SessionMonitor::new(
            SessionConfig::default(),
            SessionCollaborators {
                store: store.clone(),
                auth: Arc::new(MockAuthClient::new("demo@warden.dev", "Secret1")),
                navigator: Arc::new(RecordingNavigator::new()),
                surface: surface.clone(),
                clock: clock.clone(),
            },
        );
        Fixture {
            monitor,
            store,
            surface,
            clock,
        }
    }

    #[tokio::test]
    async fn test_start_arms_without_preference() {
        let f = fixture();

        assert_eq!(f.monitor.start(), MonitorStatus::Armed);
        assert_eq!(f.monitor.state(), WatchdogState::Armed);
        assert!(f.monitor.has_activity_listeners());
        assert_eq!(f.surface.listener_count(), ActivityKind::all().len());
    }

    #[tokio::test]
    async fn test_keep_logged_in_suppresses_arming() {
        let f = fixture();
        f.store.set(KEEP_LOGGED_IN_KEY, "true").unwrap();

        assert_eq!(f.monitor.start(), MonitorStatus::Disarmed);
        assert_eq!(f.monitor.state(), WatchdogState::Disarmed);
        assert!(!f.monitor.watchdog().has_ticker());
        assert_eq!(f.surface.listener_count(), 0);
    }

    #[tokio::test]
    async fn test_dispatched_events_reach_tracker() {
        let f = fixture();
        f.monitor.start();

        f.clock.advance(Duration::seconds(30));
        f.surface.dispatch(ActivityKind::KeyPress);

        assert_eq!(f.monitor.tracker().last_activity(), f.clock.now());
    }

    #[tokio::test]
    async fn test_start_twice_is_single_watchdog() {
        let f = fixture();
        assert_eq!(f.monitor.start(), MonitorStatus::Armed);
        assert_eq!(f.monitor.start(), MonitorStatus::AlreadyRunning);
        assert_eq!(f.surface.listener_count(), ActivityKind::all().len());
    }

    #[tokio::test]
    async fn test_stop_twice_is_harmless() {
        let f = fixture();
        f.monitor.start();

        f.monitor.stop();
        f.monitor.stop();

        assert_eq!(f.monitor.state(), WatchdogState::Stopped);
        assert!(!f.monitor.has_activity_listeners());
        assert_eq!(f.surface.listener_count(), 0);
        assert_eq!(f.monitor.start(), MonitorStatus::Stopped);
    }

    #[tokio::test]
    async fn test_disarm_detaches_and_allows_rearm() {
        let f = fixture();
        f.monitor.start();

        assert!(f.monitor.disarm());
        assert_eq!(f.surface.listener_count(), 0);
        assert!(!f.monitor.disarm());

        assert_eq!(f.monitor.arm(), MonitorStatus::Armed);
        assert_eq!(f.surface.listener_count(), ActivityKind::all().len());
    }

    #[test]
    fn test_arm_outside_runtime_leaves_monitor_untouched() {
        let f = fixture();

        assert_eq!(f.monitor.start(), MonitorStatus::NoRuntime);
        assert_eq!(f.monitor.state(), WatchdogState::Disarmed);
        assert!(!f.monitor.watchdog().has_ticker());
        assert!(!f.monitor.has_activity_listeners());
        assert_eq!(f.surface.listener_count(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        let status = runtime.block_on(async { f.monitor.start() });
        assert_eq!(status, MonitorStatus::Armed);
        assert!(f.monitor.watchdog().has_ticker());
        assert_eq!(f.surface.listener_count(), ActivityKind::all().len());
    }

    #[tokio::test]
    async fn test_drop_removes_listeners() {
        let f = fixture();
        f.monitor.start();
        let surface = Arc::clone(&f.surface);

        drop(f);

        assert_eq!(surface.listener_count(), 0);
    }
}
