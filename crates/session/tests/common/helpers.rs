#![allow(dead_code)]
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use warden_session::{
    AuthCollaborator, AuthError, AuthSession, AuthenticatedUser, Credentials, EventSurface, MemoryStore,
    MockAuthClient, RecordingNavigator, SessionCollaborators, SessionConfig, SessionMonitor, SystemClock,
};

use super::fixtures::{DEMO_EMAIL, DEMO_PASSWORD};

/// Wraps the mock client, counting sign-outs and optionally failing or
/// stalling them.
pub struct CountingAuth {
    inner: MockAuthClient,
    pub sign_out_calls: AtomicUsize,
    fail_sign_out: AtomicBool,
    sign_out_delay: Option<Duration>,
}

impl CountingAuth {
    pub fn new() -> Self {
        Self {
            inner: MockAuthClient::new(DEMO_EMAIL, DEMO_PASSWORD),
            sign_out_calls: AtomicUsize::new(0),
            fail_sign_out: AtomicBool::new(false),
            sign_out_delay: None,
        }
    }

    pub fn failing() -> Self {
        let auth = Self::new();
        auth.fail_sign_out.store(true, Ordering::SeqCst);
        auth
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            sign_out_delay: Some(delay),
            ..Self::new()
        }
    }

    pub fn sign_outs(&self) -> usize {
        self.sign_out_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthCollaborator for CountingAuth {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        self.inner.sign_in_with_password(credentials).await
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.sign_out_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_sign_out.load(Ordering::SeqCst) {
            return Err(AuthError::Network("connection reset".to_string()));
        }
        self.inner.sign_out().await
    }

    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, AuthError> {
        self.inner.current_user().await
    }
}

pub struct TestContext {
    pub monitor: SessionMonitor,
    pub store: Arc<MemoryStore>,
    pub surface: Arc<EventSurface>,
    pub navigator: Arc<RecordingNavigator>,
    pub auth: Arc<CountingAuth>,
}

impl TestContext {
    /// Must be created inside a (paused) tokio runtime so the clock follows
    /// simulated time.
    pub fn new() -> Self {
        Self::with_auth(CountingAuth::new())
    }

    pub fn with_auth(auth: CountingAuth) -> Self {
        Self::with_store_and_auth(Arc::new(MemoryStore::new()), auth)
    }

    pub fn with_store_and_auth(store: Arc<MemoryStore>, auth: CountingAuth) -> Self {
        let surface = Arc::new(EventSurface::new());
        let navigator = Arc::new(RecordingNavigator::new());
        let auth = Arc::new(auth);

        let monitor = SessionMonitor::new(
            SessionConfig::default(),
            SessionCollaborators {
                store: store.clone(),
                auth: auth.clone(),
                navigator: navigator.clone(),
                surface: surface.clone(),
                clock: Arc::new(SystemClock::new()),
            },
        );

        Self {
            monitor,
            store,
            surface,
            navigator,
            auth,
        }
    }

    pub fn redirect_count(&self) -> usize {
        self.navigator.hard_redirects().len()
    }
}

pub async fn sleep_secs(secs: u64) {
    tokio::time::sleep(Duration::from_secs(secs)).await;
}
