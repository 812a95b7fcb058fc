//! weekdeck domain model
//!
//! The shared vocabulary of the dashboard:
//! - Week, task and note records as stored by the remote gateway
//! - The two fixed co-owners and the task status lifecycle
//! - The `(task, owner)` composite key that notes are unique on
//! - Explicit row parsing with defaulting for loosely-shaped rows

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod error;
pub mod row;
pub mod types;

pub use error::RowError;
pub use types::{
    NewTask, NoteId, NoteKey, Owner, Task, TaskId, TaskNote, TaskStatus, Week, WeekNumber,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
