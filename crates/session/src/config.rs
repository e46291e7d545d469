use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_INACTIVITY_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_CHECK_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_SIGN_IN_PATH: &str = "/auth/sign-in";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Idle time after which the session is forcibly signed out (in milliseconds)
    pub inactivity_timeout_ms: u64,

    /// How often the watchdog compares the clock with the last activity (in milliseconds)
    pub check_interval_ms: u64,

    /// Sign-in boundary the watchdog redirects to
    pub sign_in_path: String,

    /// Preference file holding `keepLoggedIn` and `lastActivity`
    pub store_path: PathBuf,

    /// Account accepted by the mock auth client
    pub demo_email: String,
    pub demo_password: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout_ms: DEFAULT_INACTIVITY_TIMEOUT_MS,
            check_interval_ms: DEFAULT_CHECK_INTERVAL_MS,
            sign_in_path: DEFAULT_SIGN_IN_PATH.to_string(),
            store_path: dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("warden")
                .join("preferences.json"),
            demo_email: "demo@warden.dev".to_string(),
            demo_password: "Secret1".to_string(),
        }
    }
}

impl SessionConfig {
    /// Loads the configuration from `path`, falling back to defaults when no
    /// path is given or the file does not exist. The result is validated.
    ///
    /// # Errors
    /// - Returns an error if the file exists but cannot be read.
    /// - Returns an error if the file is not valid JSON.
    /// - Returns an error if the loaded values fail [`SessionConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(p) if p.exists() => {
                let content = fs::read_to_string(p).map_err(|source| ConfigError::Io {
                    path: p.to_path_buf(),
                    source,
                })?;
                serde_json::from_str(&content)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if a duration is zero, the check interval
    /// exceeds the inactivity timeout, or the sign-in path is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.inactivity_timeout_ms == 0 {
            return Err(ConfigError::Invalid("inactivity_timeout_ms must be positive".to_string()));
        }
        if self.check_interval_ms == 0 {
            return Err(ConfigError::Invalid("check_interval_ms must be positive".to_string()));
        }
        if self.check_interval_ms > self.inactivity_timeout_ms {
            return Err(ConfigError::Invalid(format!(
                "check_interval_ms ({}) must not exceed inactivity_timeout_ms ({})",
                self.check_interval_ms, self.inactivity_timeout_ms
            )));
        }
        if self.sign_in_path.trim().is_empty() {
            return Err(ConfigError::Invalid("sign_in_path must not be empty".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub const fn inactivity_timeout(&self) -> Duration {
        Duration::from_millis(self.inactivity_timeout_ms)
    }

    #[must_use]
    pub const fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}
