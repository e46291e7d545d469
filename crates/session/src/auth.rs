use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::AuthError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: AuthenticatedUser,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Backend that verifies credentials and ends sessions.
#[async_trait]
pub trait AuthCollaborator: Send + Sync {
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the backend fails.
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthSession, AuthError>;

    /// # Errors
    ///
    /// Returns an error if the backend cannot end the session.
    async fn sign_out(&self) -> Result<(), AuthError>;

    /// # Errors
    ///
    /// Returns an error if the session state cannot be determined.
    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, AuthError>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
    pub jti: String,
}

/// In-memory auth backend with a single account.
///
/// Sign-in issues an HS256 token signed with a per-instance random secret;
/// sign-out forgets it.
#[derive(Debug)]
pub struct MockAuthClient {
    secret: Vec<u8>,
    account: Credentials,
    token: Mutex<Option<String>>,
}

impl MockAuthClient {
    #[must_use]
    pub fn new(email: &str, password: &str) -> Self {
        let mut secret = vec![0u8; 32];
        rand::Rng::fill(&mut rand::rng(), &mut secret[..]);

        Self {
            secret,
            account: Credentials {
                email: email.to_string(),
                password: password.to_string(),
            },
            token: Mutex::new(None),
        }
    }

    /// # Errors
    ///
    /// Returns an error if a timestamp does not fit the claims or encoding fails.
    pub fn generate_token(&self, email: &str) -> Result<(String, DateTime<Utc>), AuthError> {
        let issued_at = Utc::now();
        let expiration = issued_at + Duration::hours(1);

        let claims = SessionClaims {
            sub: email.to_string(),
            exp: usize::try_from(expiration.timestamp())
                .map_err(|_| AuthError::Token("Token expiration timestamp overflow".to_string()))?,
            iat: usize::try_from(issued_at.timestamp())
                .map_err(|_| AuthError::Token("Token issue timestamp overflow".to_string()))?,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(&self.secret))
            .map_err(|e| AuthError::Token(format!("Token generation failed: {e}")))?;
        Ok((token, expiration))
    }

    /// # Errors
    ///
    /// Returns an error if the token is malformed, expired or not signed by this client.
    pub fn verify_token(&self, token: &str) -> Result<SessionClaims, AuthError> {
        decode::<SessionClaims>(token, &DecodingKey::from_secret(&self.secret), &Validation::default())
            .map(|data| data.claims)
            .map_err(|e| AuthError::Token(e.to_string()))
    }

    #[must_use]
    pub fn current_token(&self) -> Option<String> {
        self.token.lock().ok().and_then(|token| token.clone())
    }
}

#[async_trait]
impl AuthCollaborator for MockAuthClient {
    async fn sign_in_with_password(&self, credentials: &Credentials) -> Result<AuthSession, AuthError> {
        if credentials.email != self.account.email || credentials.password != self.account.password {
            debug!("Rejected sign-in for {}", credentials.email);
            return Err(AuthError::InvalidCredentials);
        }

        let (token, expires_at) = self.generate_token(&credentials.email)?;
        if let Ok(mut current) = self.token.lock() {
            *current = Some(token.clone());
        }
        info!("Signed in {}", credentials.email);

        Ok(AuthSession {
            user: AuthenticatedUser {
                email: credentials.email.clone(),
            },
            token,
            expires_at,
        })
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Ok(mut current) = self.token.lock() {
            if current.take().is_some() {
                info!("Signed out");
            }
        }
        Ok(())
    }

    async fn current_user(&self) -> Result<Option<AuthenticatedUser>, AuthError> {
        let Some(token) = self.current_token() else {
            return Ok(None);
        };
        Ok(self
            .verify_token(&token)
            .ok()
            .map(|claims| AuthenticatedUser { email: claims.sub }))
    }
}
