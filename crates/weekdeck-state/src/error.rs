//! Error types for the dashboard state core
//!
//! Nothing here is fatal: every failure is rendered into the banner
//! and recovered by user action (re-editing, switching weeks,
//! reloading).

use weekdeck_core::RowError;
use weekdeck_gateway::GatewayError;

/// Failure surfaced by a dashboard operation
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    /// The gateway call itself failed
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// The gateway answered with rows the core could not parse
    #[error(transparent)]
    Row(#[from] RowError),
}

impl StateError {
    /// Whether the failure came from a write
    #[inline]
    #[must_use]
    pub fn is_write(&self) -> bool {
        matches!(self, Self::Gateway(e) if e.is_write())
    }
}
