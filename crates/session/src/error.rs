use std::path::PathBuf;
use thiserror::Error;

/// Errors reported by an [`AuthCollaborator`](crate::auth::AuthCollaborator).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The sign-in request was rejected before reaching the backend.
    #[error("{0}")]
    Validation(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// The backend could not be reached or answered with a failure.
    #[error("Auth backend unavailable: {0}")]
    Network(String),
    #[error("Token error: {0}")]
    Token(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to access preference file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to (de)serialize preferences: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
