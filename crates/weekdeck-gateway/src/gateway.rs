//! Remote data gateway contract
//!
//! Table-shaped reads and writes against the hosted store. Reads come
//! back as raw JSON rows; callers parse them through `weekdeck-core`
//! so the defaulting rules sit on the load path, not in a backend.

use crate::error::GatewayResult;
use crate::feed::{ChangeEvent, FeedFilter, Subscription};
use async_trait::async_trait;
use tokio::sync::mpsc;
use weekdeck_core::{NewTask, NoteKey, TaskId, TaskStatus, WeekNumber};

/// One raw table row as returned by the store
pub type Row = serde_json::Value;

/// The hosted store the dashboard delegates all persistence to
///
/// Implementations own durability, ordering and the `(task_id, owner)`
/// uniqueness constraint on notes; the dashboard core treats its own
/// caches as a read-through, write-behind reflection of this.
#[async_trait]
pub trait DataGateway: Send + Sync + 'static {
    /// All weeks, ordered by week number ascending
    async fn list_weeks(&self) -> GatewayResult<Vec<Row>>;

    /// Tasks in one week, ordered by creation time descending
    async fn list_tasks(&self, week: WeekNumber) -> GatewayResult<Vec<Row>>;

    /// Insert a new task; the store issues id and timestamps
    async fn insert_task(&self, task: NewTask) -> GatewayResult<Row>;

    /// Update one task's status by id
    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> GatewayResult<()>;

    /// All note rows whose task id is in the given set
    async fn list_notes(&self, task_ids: &[TaskId]) -> GatewayResult<Vec<Row>>;

    /// Insert-or-update the note for `key`
    ///
    /// Must never create a second row for the same `(task_id, owner)`
    /// pair. An empty string is a valid value and clears the note.
    /// Returns the stored row with its store-issued `updated_at`.
    async fn upsert_note(&self, key: NoteKey, note: &str) -> GatewayResult<Row>;

    /// Register `sink` for change events passing `filter`
    ///
    /// Delivery stops when the returned handle is dropped.
    fn subscribe(
        &self,
        filter: FeedFilter,
        sink: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Subscription;
}
