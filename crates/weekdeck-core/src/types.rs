//! Core types for weekdeck
//!
//! Defines the records the dashboard works with:
//! - Weeks and their planning lists
//! - Tasks with an owner and a status
//! - Per-(task, owner) notes and the composite key they are unique on

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Week number assigned by the remote store (unique, ascending)
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct WeekNumber(pub u32);

impl fmt::Display for WeekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "week {}", self.0)
    }
}

/// Unique task identifier (issued by the store on insert)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Generate a new task ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique note identifier (issued by the store on first upsert)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub Uuid);

impl NoteId {
    /// Generate a new note ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two fixed co-owners of the board
///
/// Every task and every note belongs to exactly one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// First co-owner
    A,
    /// Second co-owner
    B,
}

impl Owner {
    /// Both owners, in display order
    pub const ALL: [Owner; 2] = [Owner::A, Owner::B];

    /// Wire name as stored by the gateway
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Owner::A => "a",
            Owner::B => "b",
        }
    }

    /// The other co-owner
    #[inline]
    #[must_use]
    pub fn other(&self) -> Owner {
        match self {
            Owner::A => Owner::B,
            Owner::B => Owner::A,
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Owner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" => Ok(Owner::A),
            "b" => Ok(Owner::B),
            other => Err(format!("unknown owner: {other}")),
        }
    }
}

/// Task status lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Not started
    Pending,
    /// Being worked on
    #[serde(rename = "In Progress")]
    InProgress,
    /// Done
    Completed,
}

impl TaskStatus {
    /// Wire/display string as stored by the gateway
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Whether this status counts as done
    #[inline]
    #[must_use]
    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Status after flipping the completion checkbox
    #[inline]
    #[must_use]
    pub fn toggled(&self) -> TaskStatus {
        if self.is_completed() {
            TaskStatus::Pending
        } else {
            TaskStatus::Completed
        }
    }
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::Pending
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(TaskStatus::Pending),
            "In Progress" => Ok(TaskStatus::InProgress),
            "Completed" => Ok(TaskStatus::Completed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A planning week as stored in the `weeks` collection
///
/// Read-only from the dashboard's perspective: weeks are populated
/// entirely by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Week {
    /// Externally assigned week number
    pub week_number: WeekNumber,
    /// Week title
    #[serde(default)]
    pub title: String,
    /// Objectives for the week
    #[serde(default, deserialize_with = "crate::row::de::string_list")]
    pub objectives: Vec<String>,
    /// Deliverables for the week
    #[serde(default, deserialize_with = "crate::row::de::string_list")]
    pub deliverables: Vec<String>,
    /// Key performance indicators
    #[serde(default, deserialize_with = "crate::row::de::string_list")]
    pub kpis: Vec<String>,
    /// Known risks
    #[serde(default, deserialize_with = "crate::row::de::string_list")]
    pub risks: Vec<String>,
}

/// A task as stored in the `tasks` collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Store-issued identifier
    pub id: TaskId,
    /// Week the task belongs to
    pub week_number: WeekNumber,
    /// Owning co-owner
    pub owner: Owner,
    /// Free-text description
    pub description: String,
    /// Current status
    pub status: TaskStatus,
    /// Creation stamp (set by the store on insert)
    pub created_at: DateTime<Utc>,
    /// Last-update stamp (set by the store on write)
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Composite note key for this task and the given owner
    #[inline]
    #[must_use]
    pub fn note_key(&self, owner: Owner) -> NoteKey {
        NoteKey::new(self.id, owner)
    }
}

/// Insert payload for a new task
///
/// The store issues the id and both timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewTask {
    /// Week the task belongs to
    pub week_number: WeekNumber,
    /// Owning co-owner
    pub owner: Owner,
    /// Free-text description
    pub description: String,
    /// Initial status
    pub status: TaskStatus,
}

impl NewTask {
    /// New task payload with the initial `Pending` status
    #[inline]
    #[must_use]
    pub fn new(week_number: WeekNumber, owner: Owner, description: impl Into<String>) -> Self {
        Self {
            week_number,
            owner,
            description: description.into(),
            status: TaskStatus::Pending,
        }
    }
}

/// A progress note as stored in the `task_notes` collection
///
/// At most one row exists per `(task_id, owner)` pair; saves upsert on
/// that uniqueness constraint and never duplicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskNote {
    /// Store-issued identifier
    pub id: NoteId,
    /// Task the note is attached to
    pub task_id: TaskId,
    /// Co-owner the note belongs to
    pub owner: Owner,
    /// Note text (may be empty; an empty save clears the note)
    #[serde(default)]
    pub note: String,
    /// Last-write stamp (set by the store)
    pub updated_at: DateTime<Utc>,
}

impl TaskNote {
    /// Composite key this row is unique on
    #[inline]
    #[must_use]
    pub fn key(&self) -> NoteKey {
        NoteKey::new(self.task_id, self.owner)
    }
}

/// Composite `(task, owner)` key notes and drafts are tracked under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NoteKey {
    /// Task the note is attached to
    pub task_id: TaskId,
    /// Co-owner the note belongs to
    pub owner: Owner,
}

impl NoteKey {
    /// Build a key from its parts
    #[inline]
    #[must_use]
    pub fn new(task_id: TaskId, owner: Owner) -> Self {
        Self { task_id, owner }
    }
}

impl fmt::Display for NoteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.task_id, self.owner)
    }
}
