use crate::auth::{AuthSession, Credentials};
use crate::error::AuthError;
use crate::monitor::SessionMonitor;
use crate::policy::{PolicyOutcome, apply_sign_in_policy};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub keep_logged_in: bool,
}

impl SignInRequest {
    /// # Errors
    ///
    /// Returns `AuthError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), AuthError> {
        let email = self.email.trim();
        if email.is_empty() {
            return Err(AuthError::Validation("Email is required".to_string()));
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {}
            _ => return Err(AuthError::Validation("Invalid email".to_string())),
        }
        if self.password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct SignInOutcome {
    pub session: AuthSession,
    pub policy: PolicyOutcome,
}

/// Verifies the credentials and, on success, applies the session policy
/// for the request's keep-logged-in choice.
///
/// # Errors
///
/// Returns the validation failure or the auth collaborator's error unchanged;
/// the monitor is left untouched in that case.
pub async fn sign_in(monitor: &SessionMonitor, request: &SignInRequest) -> Result<SignInOutcome, AuthError> {
    request.validate()?;

    let credentials = Credentials {
        email: request.email.trim().to_string(),
        password: request.password.clone(),
    };
    let session = monitor.auth().sign_in_with_password(&credentials).await?;
    debug!("Credentials accepted for {}", session.user.email);

    let policy = apply_sign_in_policy(monitor, request.keep_logged_in);
    Ok(SignInOutcome { session, policy })
}
