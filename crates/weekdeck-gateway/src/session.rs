//! Session gate contract
//!
//! Authentication is fully external; the dashboard only needs to know
//! whether a session exists, hear about sign-in/sign-out, and request
//! sign-out.

use crate::error::GatewayResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

/// An authenticated session as reported by the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Authenticated user id
    pub user_id: Uuid,
    /// Sign-in email
    pub email: String,
}

impl Session {
    /// Session for the given user
    #[inline]
    #[must_use]
    pub fn new(user_id: Uuid, email: impl Into<String>) -> Self {
        Self {
            user_id,
            email: email.into(),
        }
    }
}

/// The authentication service the dashboard consults
#[async_trait]
pub trait SessionGate: Send + Sync + 'static {
    /// Current session, if any
    async fn current_session(&self) -> GatewayResult<Option<Session>>;

    /// Watch for session state changes (sign-in and sign-out)
    ///
    /// The receiver always holds the latest known session state.
    fn watch_auth(&self) -> watch::Receiver<Option<Session>>;

    /// End the current session
    async fn sign_out(&self) -> GatewayResult<()>;
}
