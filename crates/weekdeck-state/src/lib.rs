//! weekdeck dashboard state core
//!
//! In-memory view state over the remote gateway:
//! - Week and task loading with the first-week selection rule
//! - Note cache hydration with per-(task, owner) defaults
//! - The debounced autosave state machine with in-flight mutual
//!   exclusion, optimistic updates and edit-driven retry
//! - Change-feed handling scoped to the selected week
//! - Session routing between login and dashboard views
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use weekdeck_state::{DashboardConfig, DashboardService};
//!
//! # async fn example(gateway: Arc<impl weekdeck_gateway::DataGateway>) {
//! let (dashboard, _loop) = DashboardService::spawn(gateway, DashboardConfig::new());
//! dashboard.select_week(weekdeck_core::WeekNumber(3)).await.ok();
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod autosave;
pub mod core;
pub mod error;
pub mod event;
pub mod service;
pub mod session;

pub use autosave::{AutosaveRegistry, SaveState, DEFAULT_DEBOUNCE};
pub use crate::core::{DashboardConfig, DashboardCore, NoteEntry, StateSnapshot};
pub use error::StateError;
pub use event::CoreEvent;
pub use service::{DashboardCommand, DashboardHandle, DashboardService, ServiceClosed};
pub use session::{next_route, route_for, InitialSessionCheck, ViewRoute};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for embedding the dashboard core
    pub use crate::{
        DashboardConfig, DashboardCore, DashboardHandle, DashboardService, NoteEntry, SaveState,
        StateSnapshot, ViewRoute,
    };
    pub use weekdeck_core::{NoteKey, Owner, Task, TaskId, TaskStatus, Week, WeekNumber};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
