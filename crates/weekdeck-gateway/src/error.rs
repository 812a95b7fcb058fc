//! Error types for gateway operations
//!
//! The taxonomy the dashboard's recovery rules key off:
//! - session errors route back to login and are never retried
//! - read failures surface a banner and leave prior state untouched
//! - write failures surface a banner; note saves retry through the
//!   normal edit/debounce cycle

/// Result alias for gateway calls
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure of a remote gateway call
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    /// A table read failed
    #[error("read from {table} failed: {message}")]
    Read {
        /// Collection the read targeted
        table: &'static str,
        /// Backend-reported reason
        message: String,
    },

    /// A table write failed
    #[error("write to {table} failed: {message}")]
    Write {
        /// Collection the write targeted
        table: &'static str,
        /// Backend-reported reason
        message: String,
    },

    /// Session check or sign-out failed
    #[error("session error: {0}")]
    Session(String),

    /// Backend not reachable at all
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
}

impl GatewayError {
    /// Read failure on the given collection
    #[inline]
    #[must_use]
    pub fn read(table: &'static str, message: impl Into<String>) -> Self {
        Self::Read {
            table,
            message: message.into(),
        }
    }

    /// Write failure on the given collection
    #[inline]
    #[must_use]
    pub fn write(table: &'static str, message: impl Into<String>) -> Self {
        Self::Write {
            table,
            message: message.into(),
        }
    }

    /// Whether this failure came from a write
    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Write { .. })
    }

    /// Whether this failure is an authentication/session one
    #[inline]
    #[must_use]
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Session(_))
    }
}
