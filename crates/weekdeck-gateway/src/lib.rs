//! weekdeck external seams
//!
//! Contracts for the collaborators the dashboard delegates everything
//! durable to:
//! - `DataGateway`: table reads/writes against the hosted store
//! - the change feed: filtered subscriptions with RAII teardown
//! - `SessionGate`: authentication state and sign-out
//! - gateway credential configuration from the environment
//!
//! None of these are implemented here beyond their contracts; the
//! in-memory backend used by tests lives in `weekdeck-testkit`.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod config;
pub mod error;
pub mod feed;
pub mod gateway;
pub mod session;

pub use config::{ConfigError, GatewayConfig};
pub use error::{GatewayError, GatewayResult};
pub use feed::{ChangeEvent, ChangeKind, ChangeScope, FeedFilter, Subscription};
pub use gateway::{DataGateway, Row};
pub use session::{Session, SessionGate};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
