//! Gateway credential configuration
//!
//! The only environment-level configuration the dashboard carries:
//! the hosted backend's URL and its anonymous API key.

use serde::{Deserialize, Serialize};

/// Environment variable naming the backend URL
pub const URL_VAR: &str = "WEEKDECK_GATEWAY_URL";

/// Environment variable naming the anonymous API key
pub const KEY_VAR: &str = "WEEKDECK_GATEWAY_KEY";

/// Credentials for the hosted backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Backend base URL
    pub url: String,
    /// Anonymous API key
    pub anon_key: String,
}

impl GatewayConfig {
    /// Config from explicit values
    #[inline]
    #[must_use]
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anon_key: anon_key.into(),
        }
    }

    /// Config from the environment
    ///
    /// # Errors
    /// - `ConfigError::MissingVar` if either variable is unset
    /// - `ConfigError::EmptyVar` if either variable is blank
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            url: read_var(URL_VAR)?,
            anon_key: read_var(KEY_VAR)?,
        })
    }
}

fn read_var(name: &'static str) -> Result<String, ConfigError> {
    let value = std::env::var(name).map_err(|_| ConfigError::MissingVar(name))?;
    if value.trim().is_empty() {
        return Err(ConfigError::EmptyVar(name));
    }
    Ok(value)
}

/// Failure to assemble gateway credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// Required variable not set
    #[error("missing environment variable {0}")]
    MissingVar(&'static str),

    /// Required variable set but blank
    #[error("environment variable {0} is empty")]
    EmptyVar(&'static str),
}
