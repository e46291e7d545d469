use crate::monitor::{MonitorStatus, SessionMonitor};
use crate::store::{SessionPreference, save_last_activity};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyOutcome {
    /// Keep-logged-in chosen; `cleared_previous` tells whether a leftover
    /// watchdog had to be disarmed.
    KeptLoggedIn { cleared_previous: bool },
    Armed,
    /// A watchdog was already running and keeps running.
    AlreadyArmed,
    /// The monitor was torn down before sign-in completed.
    MonitorStopped,
    /// No tokio runtime was available to run the recurring check.
    NotArmed,
}

/// Decides, right after a successful sign-in, whether the inactivity
/// watchdog runs for this session.
///
/// The choice is persisted first. Store failures are logged and never fail
/// the sign-in. Arming needs a tokio runtime, see [`SessionMonitor::arm`].
pub fn apply_sign_in_policy(monitor: &SessionMonitor, keep_logged_in: bool) -> PolicyOutcome {
    if let Err(e) = (SessionPreference { keep_logged_in }).save(monitor.store()) {
        warn!("Failed to persist keep-logged-in preference: {e}");
    }

    if keep_logged_in {
        let cleared_previous = monitor.disarm();
        info!("Keep logged in selected, inactivity timeout not armed");
        return PolicyOutcome::KeptLoggedIn { cleared_previous };
    }

    if let Err(e) = save_last_activity(monitor.store(), monitor.tracker().now()) {
        warn!("Failed to persist last activity: {e}");
    }

    match monitor.arm() {
        MonitorStatus::Armed => PolicyOutcome::Armed,
        MonitorStatus::AlreadyRunning => PolicyOutcome::AlreadyArmed,
        MonitorStatus::Disarmed | MonitorStatus::Stopped => PolicyOutcome::MonitorStopped,
        MonitorStatus::NoRuntime => PolicyOutcome::NotArmed,
    }
}
