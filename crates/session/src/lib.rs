//! Inactivity-based session timeout.
//!
//! A [`SessionMonitor`] records user activity coming from an [`InputSurface`],
//! and its [`InactivityWatchdog`] signs the session out through an
//! [`AuthCollaborator`] and loads the sign-in page once the user has been idle
//! longer than the configured threshold. The "keep me logged in" choice made
//! at sign-in, persisted in a [`PreferenceStore`], switches the watchdog off.

pub mod activity;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod guard;
pub mod input;
pub mod monitor;
pub mod navigation;
pub mod policy;
pub mod signin;
pub mod store;
pub mod watchdog;

pub use activity::ActivityTracker;
pub use auth::{AuthCollaborator, AuthSession, AuthenticatedUser, Credentials, MockAuthClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::SessionConfig;
pub use error::{AuthError, ConfigError, StoreError};
pub use guard::{AuthGuard, GuardDecision};
pub use input::{ActivityHandler, ActivityKind, EventSurface, InputSurface, ListenerRegistration, ListenerSet};
pub use monitor::{MonitorStatus, SessionCollaborators, SessionMonitor};
pub use navigation::{NavigationEvent, NavigationKind, Navigator, RecordingNavigator};
pub use policy::{PolicyOutcome, apply_sign_in_policy};
pub use signin::{SignInOutcome, SignInRequest, sign_in};
pub use store::{FileStore, MemoryStore, PreferenceStore, SessionPreference};
pub use watchdog::{CheckOutcome, InactivityWatchdog, WatchdogState};
