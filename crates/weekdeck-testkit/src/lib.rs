//! Testing utilities for the weekdeck workspace
//!
//! An in-memory stand-in for the hosted backend: typed tables behind a
//! lock, raw-row projection on read, upsert-on-conflict semantics for
//! notes, injectable failures and latency, and a manually driven
//! change feed so tests control every interleaving.

#![allow(missing_docs)]

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;
use weekdeck_core::{
    NewTask, NoteId, NoteKey, Owner, Task, TaskId, TaskNote, TaskStatus, Week, WeekNumber,
};
use weekdeck_gateway::{
    ChangeEvent, DataGateway, FeedFilter, GatewayError, GatewayResult, Row, Session, SessionGate,
    Subscription,
};

/// Install an env-filtered test logger (idempotent).
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ---- fixtures ----------------------------------------------------------

/// Week with the given number and title, all lists empty.
pub fn week_fixture(number: u32, title: &str) -> Week {
    Week {
        week_number: WeekNumber(number),
        title: title.to_string(),
        objectives: Vec::new(),
        deliverables: Vec::new(),
        kpis: Vec::new(),
        risks: Vec::new(),
    }
}

/// Pending task in the given week, stamped now.
pub fn task_fixture(week: WeekNumber, owner: Owner, description: &str) -> Task {
    let now = Utc::now();
    Task {
        id: TaskId::new(),
        week_number: week,
        owner,
        description: description.to_string(),
        status: TaskStatus::Pending,
        created_at: now,
        updated_at: now,
    }
}

/// Note row for the given key, stamped now.
pub fn note_fixture(task_id: TaskId, owner: Owner, note: &str) -> TaskNote {
    TaskNote {
        id: NoteId::new(),
        task_id,
        owner,
        note: note.to_string(),
        updated_at: Utc::now(),
    }
}

/// Session for a fresh user.
pub fn session_fixture(email: &str) -> Session {
    Session::new(Uuid::new_v4(), email)
}

// ---- in-memory gateway -------------------------------------------------

struct Tables {
    weeks: Vec<Week>,
    tasks: Vec<Task>,
    // Vec on purpose: upsert scans for the (task_id, owner) pair the
    // way the store's uniqueness constraint would, so a botched upsert
    // really would leave a duplicate row for tests to catch.
    notes: Vec<TaskNote>,
}

struct SubEntry {
    filter: FeedFilter,
    sink: mpsc::UnboundedSender<ChangeEvent>,
}

/// In-memory [`DataGateway`] for tests
///
/// Change events are never emitted automatically; tests publish them
/// explicitly with [`InMemoryGateway::publish`] so interleavings stay
/// deterministic.
pub struct InMemoryGateway {
    tables: Mutex<Tables>,
    subs: Arc<DashMap<u64, SubEntry>>,
    next_sub: AtomicU64,

    upsert_delay: Mutex<Duration>,
    fail_list_weeks: AtomicU32,
    fail_list_tasks: AtomicU32,
    fail_list_notes: AtomicU32,
    fail_upserts: AtomicU32,
    fail_task_writes: AtomicU32,

    list_tasks_calls: AtomicU32,
    list_notes_calls: AtomicU32,
    upsert_attempts: AtomicU32,
    note_writes: Mutex<Vec<(NoteKey, String)>>,
    upserts_in_flight: Mutex<HashMap<NoteKey, usize>>,
    max_upserts_in_flight: Mutex<HashMap<NoteKey, usize>>,
}

impl InMemoryGateway {
    /// Empty gateway
    #[must_use]
    pub fn new() -> Self {
        Self {
            tables: Mutex::new(Tables {
                weeks: Vec::new(),
                tasks: Vec::new(),
                notes: Vec::new(),
            }),
            subs: Arc::new(DashMap::new()),
            next_sub: AtomicU64::new(0),
            upsert_delay: Mutex::new(Duration::ZERO),
            fail_list_weeks: AtomicU32::new(0),
            fail_list_tasks: AtomicU32::new(0),
            fail_list_notes: AtomicU32::new(0),
            fail_upserts: AtomicU32::new(0),
            fail_task_writes: AtomicU32::new(0),
            list_tasks_calls: AtomicU32::new(0),
            list_notes_calls: AtomicU32::new(0),
            upsert_attempts: AtomicU32::new(0),
            note_writes: Mutex::new(Vec::new()),
            upserts_in_flight: Mutex::new(HashMap::new()),
            max_upserts_in_flight: Mutex::new(HashMap::new()),
        }
    }

    // -- seeding --

    pub fn seed_week(&self, week: Week) {
        self.tables.lock().weeks.push(week);
    }

    pub fn seed_task(&self, task: Task) {
        self.tables.lock().tasks.push(task);
    }

    pub fn seed_note(&self, note: TaskNote) {
        self.tables.lock().notes.push(note);
    }

    // -- failure & latency scripting --

    pub fn fail_next_list_weeks(&self, count: u32) {
        self.fail_list_weeks.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_list_tasks(&self, count: u32) {
        self.fail_list_tasks.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_list_notes(&self, count: u32) {
        self.fail_list_notes.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_upserts(&self, count: u32) {
        self.fail_upserts.store(count, Ordering::SeqCst);
    }

    pub fn fail_next_task_writes(&self, count: u32) {
        self.fail_task_writes.store(count, Ordering::SeqCst);
    }

    /// Make every note upsert take this long (virtual time).
    pub fn set_upsert_delay(&self, delay: Duration) {
        *self.upsert_delay.lock() = delay;
    }

    // -- change feed --

    /// Push one change event to every matching subscriber.
    pub fn publish(&self, event: ChangeEvent) {
        for entry in self.subs.iter() {
            if event.matches(&entry.filter) {
                let _ = entry.sink.send(event);
            }
        }
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subs.len()
    }

    #[must_use]
    pub fn subscribed_filters(&self) -> Vec<FeedFilter> {
        self.subs.iter().map(|entry| entry.filter).collect()
    }

    // -- inspection --

    /// Stored task row by id, if any.
    #[must_use]
    pub fn task(&self, id: TaskId) -> Option<Task> {
        self.tables.lock().tasks.iter().find(|t| t.id == id).cloned()
    }

    /// Number of stored task rows across all weeks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.tables.lock().tasks.len()
    }

    /// Stored note row for a key, if any.
    #[must_use]
    pub fn note(&self, key: NoteKey) -> Option<TaskNote> {
        self.tables
            .lock()
            .notes
            .iter()
            .find(|n| n.key() == key)
            .cloned()
    }

    /// How many rows exist for a key (must never exceed one).
    #[must_use]
    pub fn note_rows(&self, key: NoteKey) -> usize {
        self.tables
            .lock()
            .notes
            .iter()
            .filter(|n| n.key() == key)
            .count()
    }

    /// Successful note writes, in order.
    #[must_use]
    pub fn note_writes(&self) -> Vec<(NoteKey, String)> {
        self.note_writes.lock().clone()
    }

    /// Note upserts attempted, including injected failures.
    #[must_use]
    pub fn upsert_attempts(&self) -> u32 {
        self.upsert_attempts.load(Ordering::SeqCst)
    }

    /// Highest number of concurrent upserts observed for a key.
    #[must_use]
    pub fn max_concurrent_upserts(&self, key: NoteKey) -> usize {
        self.max_upserts_in_flight
            .lock()
            .get(&key)
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn list_tasks_calls(&self) -> u32 {
        self.list_tasks_calls.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn list_notes_calls(&self) -> u32 {
        self.list_notes_calls.load(Ordering::SeqCst)
    }

    fn begin_upsert(&self, key: NoteKey) {
        let mut in_flight = self.upserts_in_flight.lock();
        let current = in_flight.entry(key).or_insert(0);
        *current += 1;
        let mut max = self.max_upserts_in_flight.lock();
        let peak = max.entry(key).or_insert(0);
        *peak = (*peak).max(*current);
    }

    fn end_upsert(&self, key: NoteKey) {
        let mut in_flight = self.upserts_in_flight.lock();
        if let Some(current) = in_flight.get_mut(&key) {
            *current = current.saturating_sub(1);
        }
    }
}

impl Default for InMemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrement-if-positive for scripted failure counters.
fn take_failure(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

fn to_row<T: serde::Serialize>(record: &T) -> Row {
    serde_json::to_value(record).unwrap_or(Row::Null)
}

#[async_trait]
impl DataGateway for InMemoryGateway {
    async fn list_weeks(&self) -> GatewayResult<Vec<Row>> {
        if take_failure(&self.fail_list_weeks) {
            return Err(GatewayError::read("weeks", "injected failure"));
        }
        let mut weeks: Vec<Week> = self.tables.lock().weeks.clone();
        weeks.sort_by_key(|w| w.week_number);
        Ok(weeks.iter().map(to_row).collect())
    }

    async fn list_tasks(&self, week: WeekNumber) -> GatewayResult<Vec<Row>> {
        self.list_tasks_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_list_tasks) {
            return Err(GatewayError::read("tasks", "injected failure"));
        }
        let mut tasks: Vec<Task> = self
            .tables
            .lock()
            .tasks
            .iter()
            .filter(|t| t.week_number == week)
            .cloned()
            .collect();
        // Newest first; reverse before the stable sort so equal stamps
        // keep newest-inserted first too.
        tasks.reverse();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks.iter().map(to_row).collect())
    }

    async fn insert_task(&self, task: NewTask) -> GatewayResult<Row> {
        if take_failure(&self.fail_task_writes) {
            return Err(GatewayError::write("tasks", "injected failure"));
        }
        let now = Utc::now();
        let stored = Task {
            id: TaskId::new(),
            week_number: task.week_number,
            owner: task.owner,
            description: task.description,
            status: task.status,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().tasks.push(stored.clone());
        Ok(to_row(&stored))
    }

    async fn update_task_status(&self, id: TaskId, status: TaskStatus) -> GatewayResult<()> {
        if take_failure(&self.fail_task_writes) {
            return Err(GatewayError::write("tasks", "injected failure"));
        }
        let mut tables = self.tables.lock();
        match tables.tasks.iter_mut().find(|t| t.id == id) {
            Some(task) => {
                task.status = status;
                task.updated_at = Utc::now();
                Ok(())
            }
            None => Err(GatewayError::write("tasks", format!("no task {id}"))),
        }
    }

    async fn list_notes(&self, task_ids: &[TaskId]) -> GatewayResult<Vec<Row>> {
        self.list_notes_calls.fetch_add(1, Ordering::SeqCst);
        if take_failure(&self.fail_list_notes) {
            return Err(GatewayError::read("task_notes", "injected failure"));
        }
        let notes: Vec<TaskNote> = self
            .tables
            .lock()
            .notes
            .iter()
            .filter(|n| task_ids.contains(&n.task_id))
            .cloned()
            .collect();
        Ok(notes.iter().map(to_row).collect())
    }

    async fn upsert_note(&self, key: NoteKey, note: &str) -> GatewayResult<Row> {
        self.upsert_attempts.fetch_add(1, Ordering::SeqCst);
        self.begin_upsert(key);
        let delay = *self.upsert_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let result = if take_failure(&self.fail_upserts) {
            Err(GatewayError::write("task_notes", "injected failure"))
        } else {
            let mut tables = self.tables.lock();
            let stored = match tables.notes.iter_mut().find(|n| n.key() == key) {
                Some(existing) => {
                    existing.note = note.to_string();
                    existing.updated_at = Utc::now();
                    existing.clone()
                }
                None => {
                    let fresh = TaskNote {
                        id: NoteId::new(),
                        task_id: key.task_id,
                        owner: key.owner,
                        note: note.to_string(),
                        updated_at: Utc::now(),
                    };
                    tables.notes.push(fresh.clone());
                    fresh
                }
            };
            self.note_writes.lock().push((key, note.to_string()));
            Ok(to_row(&stored))
        };
        self.end_upsert(key);
        result
    }

    fn subscribe(
        &self,
        filter: FeedFilter,
        sink: mpsc::UnboundedSender<ChangeEvent>,
    ) -> Subscription {
        let id = self.next_sub.fetch_add(1, Ordering::SeqCst);
        self.subs.insert(id, SubEntry { filter, sink });
        let subs = Arc::clone(&self.subs);
        Subscription::new(move || {
            subs.remove(&id);
        })
    }
}

impl std::fmt::Debug for InMemoryGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryGateway")
            .field("subscribers", &self.subs.len())
            .finish_non_exhaustive()
    }
}

// ---- scriptable session gate -------------------------------------------

/// [`SessionGate`] whose state tests drive directly
pub struct ScriptedSessionGate {
    auth: watch::Sender<Option<Session>>,
    fail_checks: AtomicU32,
    check_delay: Mutex<Duration>,
}

impl ScriptedSessionGate {
    /// Gate starting in the given session state
    #[must_use]
    pub fn new(initial: Option<Session>) -> Self {
        Self {
            auth: watch::Sender::new(initial),
            fail_checks: AtomicU32::new(0),
            check_delay: Mutex::new(Duration::ZERO),
        }
    }

    /// Sign a user in, notifying watchers.
    pub fn sign_in(&self, session: Session) {
        self.auth.send_replace(Some(session));
    }

    /// Make the next `count` session checks fail.
    pub fn fail_next_checks(&self, count: u32) {
        self.fail_checks.store(count, Ordering::SeqCst);
    }

    /// Make every session check take this long (virtual time).
    pub fn set_check_delay(&self, delay: Duration) {
        *self.check_delay.lock() = delay;
    }
}

impl Default for ScriptedSessionGate {
    fn default() -> Self {
        Self::new(None)
    }
}

#[async_trait]
impl SessionGate for ScriptedSessionGate {
    async fn current_session(&self) -> GatewayResult<Option<Session>> {
        let delay = *self.check_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if take_failure(&self.fail_checks) {
            return Err(GatewayError::Session("injected failure".to_string()));
        }
        Ok(self.auth.borrow().clone())
    }

    fn watch_auth(&self) -> watch::Receiver<Option<Session>> {
        self.auth.subscribe()
    }

    async fn sign_out(&self) -> GatewayResult<()> {
        self.auth.send_replace(None);
        Ok(())
    }
}

impl std::fmt::Debug for ScriptedSessionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedSessionGate").finish_non_exhaustive()
    }
}
