//! Session routing
//!
//! The dashboard only routes between two views: login when no session
//! exists, dashboard otherwise. The initial check is the one piece of
//! cancellable work in the system - if the view goes away before the
//! gate answers, the late result is discarded instead of applied.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use weekdeck_gateway::{Session, SessionGate};

/// Which view the app should present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewRoute {
    /// Email/password sign-in and sign-up
    Login,
    /// The task dashboard
    Dashboard,
}

/// Route for a given session state
#[inline]
#[must_use]
pub fn route_for(session: Option<&Session>) -> ViewRoute {
    if session.is_some() {
        ViewRoute::Dashboard
    } else {
        ViewRoute::Login
    }
}

/// The cancellable initial session check
///
/// Clones share one cancellation flag, so the teardown path can hold a
/// clone and cancel without owning the check itself.
#[derive(Debug, Clone, Default)]
pub struct InitialSessionCheck {
    cancelled: Arc<AtomicBool>,
}

impl InitialSessionCheck {
    /// Fresh, uncancelled check
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discard the check's eventual result
    #[inline]
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether the check was cancelled
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Ask the gate for the current session and route on the answer
    ///
    /// Returns `None` when cancelled before the gate answered - the
    /// caller applies no route. A gate failure routes to login and is
    /// not retried.
    pub async fn resolve<S: SessionGate + ?Sized>(&self, gate: &S) -> Option<ViewRoute> {
        let result = gate.current_session().await;
        if self.is_cancelled() {
            tracing::debug!("initial session check cancelled, discarding result");
            return None;
        }
        match result {
            Ok(session) => Some(route_for(session.as_ref())),
            Err(e) => {
                tracing::warn!(error = %e, "session check failed, routing to login");
                Some(ViewRoute::Login)
            }
        }
    }
}

/// Wait for the next auth change and return the resulting route
///
/// Returns `None` once the gate's sender is gone.
pub async fn next_route(auth: &mut watch::Receiver<Option<Session>>) -> Option<ViewRoute> {
    auth.changed().await.ok()?;
    let route = route_for(auth.borrow_and_update().as_ref());
    Some(route)
}
