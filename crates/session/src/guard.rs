use crate::auth::{AuthCollaborator, AuthenticatedUser};
use crate::monitor::SessionMonitor;
use crate::navigation::Navigator;
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow(AuthenticatedUser),
    /// No user was signed in; the route was replaced with the sign-in page.
    Redirected,
    /// The session could not be determined. Nothing was navigated.
    Error(String),
}

/// Gate in front of protected pages.
pub struct AuthGuard {
    auth: Arc<dyn AuthCollaborator>,
    navigator: Arc<dyn Navigator>,
    sign_in_path: String,
}

impl AuthGuard {
    pub fn new(auth: Arc<dyn AuthCollaborator>, navigator: Arc<dyn Navigator>, sign_in_path: &str) -> Self {
        Self {
            auth,
            navigator,
            sign_in_path: sign_in_path.to_string(),
        }
    }

    #[must_use]
    pub fn for_monitor(monitor: &SessionMonitor) -> Self {
        Self::new(
            Arc::clone(monitor.auth()),
            Arc::clone(monitor.navigator()),
            &monitor.config().sign_in_path,
        )
    }

    pub async fn check(&self) -> GuardDecision {
        match self.auth.current_user().await {
            Ok(Some(user)) => GuardDecision::Allow(user),
            Ok(None) => {
                debug!("User is not logged in, redirecting to sign in");
                self.navigator.replace(&self.sign_in_path);
                GuardDecision::Redirected
            }
            Err(e) => {
                error!("Error checking permissions: {e}");
                GuardDecision::Error(e.to_string())
            }
        }
    }
}
