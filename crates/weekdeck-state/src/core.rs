//! Dashboard state core
//!
//! Owns every in-memory cache the dashboard renders from:
//! - the week list and the selected week
//! - the selected week's tasks, newest first
//! - the per-(task, owner) note cache and draft cache
//! - the per-key autosave table and the error banner
//!
//! The caches are a read-through, write-behind reflection of the
//! remote store, never the source of truth. All mutation happens on
//! one logical event loop: direct calls from the service plus
//! `CoreEvent`s the core sent itself (timer fires, save completions,
//! feed pushes).

use crate::autosave::{AutosaveRegistry, DEFAULT_DEBOUNCE};
use crate::error::StateError;
use crate::event::CoreEvent;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weekdeck_core::row::{note_from_row, notes_from_rows, tasks_from_rows, weeks_from_rows};
use weekdeck_core::{NewTask, NoteKey, Owner, Task, TaskId, TaskStatus, Week, WeekNumber};
use weekdeck_gateway::{ChangeEvent, ChangeScope, DataGateway, FeedFilter, Subscription};

/// Tunables for the dashboard core
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Quiet period before a dirty draft is flushed
    pub debounce: Duration,
    /// Capacity of the service command channel
    pub command_buffer: usize,
}

impl DashboardConfig {
    /// Default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With a custom debounce interval
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// With a custom command channel capacity
    #[inline]
    #[must_use]
    pub fn with_command_buffer(mut self, capacity: usize) -> Self {
        self.command_buffer = capacity;
        self
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            command_buffer: 32,
        }
    }
}

/// One entry of the note cache
///
/// Every visible `(task, owner)` pair has exactly one entry after
/// hydration; pairs never saved hold the empty default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteEntry {
    /// Last-known-saved note text
    pub note: String,
    /// Store stamp of that save, `None` until a first save is seen
    pub updated_at: Option<DateTime<Utc>>,
}

/// Cloneable view of the core's caches for the presentation layer
#[derive(Debug, Clone)]
pub struct StateSnapshot {
    /// All weeks, ascending
    pub weeks: Vec<Week>,
    /// Selected week, if any
    pub selected_week: Option<WeekNumber>,
    /// Selected week's tasks, newest first
    pub tasks: Vec<Task>,
    /// Note cache
    pub notes: HashMap<NoteKey, NoteEntry>,
    /// Draft cache
    pub drafts: HashMap<NoteKey, String>,
    /// Keys with a save in flight
    pub saving: Vec<NoteKey>,
    /// Last surfaced error, cleared by the next success
    pub banner: Option<String>,
}

/// A live change-feed subscription plus its forwarder task
///
/// Dropping the binding unsubscribes at the gateway and aborts the
/// forwarder, so nothing outlives the selection that created it.
struct FeedBinding {
    _subscription: Subscription,
    forwarder: JoinHandle<()>,
}

impl FeedBinding {
    fn open<G: DataGateway>(
        gateway: &G,
        filter: FeedFilter,
        events: mpsc::UnboundedSender<CoreEvent>,
    ) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let subscription = gateway.subscribe(filter, tx);
        let forwarder = tokio::spawn(async move {
            while let Some(change) = rx.recv().await {
                if events.send(CoreEvent::Feed(change)).is_err() {
                    break;
                }
            }
        });
        Self {
            _subscription: subscription,
            forwarder,
        }
    }
}

impl Drop for FeedBinding {
    fn drop(&mut self) {
        self.forwarder.abort();
    }
}

/// The two feeds active while a week is selected
struct FeedPair {
    _tasks: FeedBinding,
    _notes: FeedBinding,
}

/// The dashboard state core
pub struct DashboardCore<G> {
    gateway: Arc<G>,
    events: mpsc::UnboundedSender<CoreEvent>,
    weeks: Vec<Week>,
    selected: Option<WeekNumber>,
    tasks: Vec<Task>,
    notes: HashMap<NoteKey, NoteEntry>,
    drafts: HashMap<NoteKey, String>,
    autosave: AutosaveRegistry,
    feeds: Option<FeedPair>,
    banner: Option<String>,
}

impl<G: DataGateway> DashboardCore<G> {
    /// New core plus the receiver for its self-notification events
    ///
    /// The caller (normally `DashboardService`) must feed received
    /// events back through [`DashboardCore::handle_event`].
    #[must_use]
    pub fn new(gateway: Arc<G>, config: &DashboardConfig) -> (Self, mpsc::UnboundedReceiver<CoreEvent>) {
        let (events, events_rx) = mpsc::unbounded_channel();
        let autosave = AutosaveRegistry::new(config.debounce, events.clone());
        let core = Self {
            gateway,
            events,
            weeks: Vec::new(),
            selected: None,
            tasks: Vec::new(),
            notes: HashMap::new(),
            drafts: HashMap::new(),
            autosave,
            feeds: None,
            banner: None,
        };
        (core, events_rx)
    }

    // ---- loading -------------------------------------------------------

    /// Load weeks and apply the initial selection
    pub async fn initialize(&mut self) {
        tracing::info!("loading weeks");
        let rows = match self.gateway.list_weeks().await {
            Ok(rows) => rows,
            Err(e) => return self.surface(e.into()),
        };
        let weeks = match weeks_from_rows(&rows) {
            Ok(weeks) => weeks,
            Err(e) => return self.surface(e.into()),
        };
        self.banner = None;
        self.weeks = weeks;

        // Keep a still-existing selection; otherwise fall back to the
        // first week by ascending order.
        let still_valid = self
            .selected
            .is_some_and(|s| self.weeks.iter().any(|w| w.week_number == s));
        if still_valid {
            return;
        }
        match self.weeks.first().map(|w| w.week_number) {
            Some(first) => self.select_week(first).await,
            None => self.clear_selection(),
        }
    }

    /// Switch the dashboard to `week`
    ///
    /// Re-establishes both change-feed subscriptions when the
    /// selection actually changes, then reloads tasks and notes.
    pub async fn select_week(&mut self, week: WeekNumber) {
        let changed = self.selected != Some(week);
        self.selected = Some(week);
        if changed || self.feeds.is_none() {
            tracing::info!(%week, "selected");
            self.resubscribe(week);
        }
        self.reload_tasks().await;
    }

    async fn reload_tasks(&mut self) {
        let Some(week) = self.selected else {
            return;
        };
        let rows = match self.gateway.list_tasks(week).await {
            Ok(rows) => rows,
            Err(e) => return self.surface(e.into()),
        };
        let tasks = match tasks_from_rows(&rows) {
            Ok(tasks) => tasks,
            Err(e) => return self.surface(e.into()),
        };
        self.banner = None;
        tracing::debug!(%week, count = tasks.len(), "tasks loaded");
        self.tasks = tasks;
        self.hydrate_notes().await;
    }

    /// Refetch notes for the visible tasks and rebuild both caches
    ///
    /// Every `(task, owner)` pair gets a default entry before fetched
    /// rows overwrite it, and drafts are reset to mirror the saved
    /// values. Any local edit not yet flushed is overwritten here:
    /// last write observed wins, exactly as a fast external update can
    /// visibly clobber an in-progress unsent edit.
    async fn hydrate_notes(&mut self) {
        let visible: Vec<TaskId> = self.tasks.iter().map(|t| t.id).collect();
        let rows = match self.gateway.list_notes(&visible).await {
            Ok(rows) => rows,
            Err(e) => return self.surface(e.into()),
        };
        let fetched = match notes_from_rows(&rows) {
            Ok(notes) => notes,
            Err(e) => return self.surface(e.into()),
        };
        self.banner = None;

        let visible: HashSet<TaskId> = visible.into_iter().collect();
        let mut notes = HashMap::with_capacity(visible.len() * Owner::ALL.len());
        for task_id in &visible {
            for owner in Owner::ALL {
                notes.insert(NoteKey::new(*task_id, owner), NoteEntry::default());
            }
        }
        for note in fetched {
            if !visible.contains(&note.task_id) {
                continue;
            }
            notes.insert(
                note.key(),
                NoteEntry {
                    note: note.note,
                    updated_at: Some(note.updated_at),
                },
            );
        }
        self.drafts = notes
            .iter()
            .map(|(key, entry)| (*key, entry.note.clone()))
            .collect();
        self.notes = notes;
        tracing::debug!(entries = self.notes.len(), "notes hydrated");
    }

    fn resubscribe(&mut self, week: WeekNumber) {
        // Drop the previous pair first: unsubscribe + forwarder abort.
        self.feeds = None;
        self.feeds = Some(FeedPair {
            _tasks: FeedBinding::open(
                &*self.gateway,
                FeedFilter::TasksInWeek(week),
                self.events.clone(),
            ),
            _notes: FeedBinding::open(&*self.gateway, FeedFilter::AllNotes, self.events.clone()),
        });
    }

    fn clear_selection(&mut self) {
        self.selected = None;
        self.feeds = None;
        self.tasks.clear();
        self.notes.clear();
        self.drafts.clear();
    }

    // ---- notes ---------------------------------------------------------

    /// Record a draft edit for `key`
    ///
    /// A draft differing from the saved note (re)arms the key's
    /// debounce timer; the flush re-reads current values when it
    /// fires.
    pub fn edit_note(&mut self, key: NoteKey, text: impl Into<String>) {
        self.drafts.insert(key, text.into());
        let dirty = self.is_dirty(key);
        self.autosave.note_edited(key, dirty);
    }

    /// Save `key`'s current draft now, bypassing the debounce
    pub fn save_note(&mut self, key: NoteKey) {
        self.try_save(key);
    }

    fn on_debounce_elapsed(&mut self, key: NoteKey) {
        self.autosave.timer_elapsed(key);
        self.try_save(key);
    }

    /// Start a save for `key` if it is still worth doing
    ///
    /// Re-reads the current draft and saved values: the key may have
    /// been saved independently since the request was scheduled. At
    /// most one save is in flight per key; an excess request is
    /// dropped and the next debounce cycle retries if still dirty.
    fn try_save(&mut self, key: NoteKey) {
        if !self.is_dirty(key) {
            self.autosave.settle_clean(key);
            return;
        }
        if !self.autosave.try_begin_save(key) {
            tracing::debug!(%key, "save already in flight, dropping request");
            return;
        }
        let text = self.drafts.get(&key).cloned().unwrap_or_default();
        tracing::debug!(%key, "saving note");
        let gateway = Arc::clone(&self.gateway);
        let events = self.events.clone();
        tokio::spawn(async move {
            let outcome = gateway.upsert_note(key, &text).await;
            let _ = events.send(CoreEvent::SaveFinished { key, text, outcome });
        });
    }

    fn on_save_finished(
        &mut self,
        key: NoteKey,
        text: String,
        outcome: Result<weekdeck_gateway::Row, weekdeck_gateway::GatewayError>,
    ) {
        match outcome {
            Ok(row) => {
                // Optimistic update: no refetch, just the saved text
                // and a fresh stamp.
                let stamp = note_from_row(&row)
                    .map(|n| n.updated_at)
                    .unwrap_or_else(|_| Utc::now());
                self.notes.insert(
                    key,
                    NoteEntry {
                        note: text,
                        updated_at: Some(stamp),
                    },
                );
                self.banner = None;
                tracing::debug!(%key, "note saved");
            }
            Err(e) => {
                // No cache mutation: draft and saved stay divergent so
                // the debounce cycle becomes the retry path.
                self.surface(e.into());
            }
        }
        let still_dirty = self.is_dirty(key);
        self.autosave.finish_save(key, still_dirty);
    }

    fn is_dirty(&self, key: NoteKey) -> bool {
        let draft = self.drafts.get(&key).map_or("", String::as_str);
        let saved = self.notes.get(&key).map_or("", |entry| entry.note.as_str());
        draft != saved
    }

    // ---- tasks ---------------------------------------------------------

    /// Insert a new `Pending` task into the selected week
    ///
    /// No-op without a selection or with a blank description. The
    /// task list is not appended locally; the change feed (or a
    /// manual reload) reflects the new row.
    pub async fn add_task(&mut self, owner: Owner, description: &str) {
        let Some(week) = self.selected else {
            return;
        };
        let description = description.trim();
        if description.is_empty() {
            return;
        }
        match self
            .gateway
            .insert_task(NewTask::new(week, owner, description))
            .await
        {
            Ok(_) => {
                self.banner = None;
                tracing::info!(%week, %owner, "task added");
            }
            Err(e) => self.surface(e.into()),
        }
    }

    /// Update one task's status by id
    ///
    /// The local list is not mutated; the change feed refreshes it.
    pub async fn set_task_status(&mut self, id: TaskId, status: TaskStatus) {
        match self.gateway.update_task_status(id, status).await {
            Ok(()) => {
                self.banner = None;
                tracing::info!(%id, %status, "status updated");
            }
            Err(e) => self.surface(e.into()),
        }
    }

    /// Flip a task's completion checkbox
    pub async fn toggle_completion(&mut self, id: TaskId) {
        let Some(status) = self.tasks.iter().find(|t| t.id == id).map(|t| t.status) else {
            return;
        };
        self.set_task_status(id, status.toggled()).await;
    }

    // ---- events --------------------------------------------------------

    /// Apply one self-notification event
    pub async fn handle_event(&mut self, event: CoreEvent) {
        match event {
            CoreEvent::DebounceElapsed(key) => self.on_debounce_elapsed(key),
            CoreEvent::SaveFinished { key, text, outcome } => {
                self.on_save_finished(key, text, outcome);
            }
            CoreEvent::Feed(change) => self.on_feed(change).await,
        }
    }

    async fn on_feed(&mut self, change: ChangeEvent) {
        match change.scope {
            ChangeScope::Task { week_number } => {
                if self.selected == Some(week_number) {
                    tracing::debug!(%week_number, "task change pushed, reloading");
                    self.reload_tasks().await;
                }
            }
            ChangeScope::Note { task_id } => {
                if self.tasks.iter().any(|t| t.id == task_id) {
                    tracing::debug!(%task_id, "note change pushed, rehydrating");
                    self.hydrate_notes().await;
                } else {
                    tracing::trace!(%task_id, "note change outside visible set ignored");
                }
            }
        }
    }

    fn surface(&mut self, error: StateError) {
        tracing::warn!(error = %error, "dashboard operation failed");
        self.banner = Some(error.to_string());
    }

    // ---- views ---------------------------------------------------------

    /// All weeks, ascending
    #[inline]
    #[must_use]
    pub fn weeks(&self) -> &[Week] {
        &self.weeks
    }

    /// Selected week, if any
    #[inline]
    #[must_use]
    pub fn selected_week(&self) -> Option<WeekNumber> {
        self.selected
    }

    /// Selected week's tasks, newest first
    #[inline]
    #[must_use]
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// Note cache entry for `key`
    #[inline]
    #[must_use]
    pub fn note(&self, key: NoteKey) -> Option<&NoteEntry> {
        self.notes.get(&key)
    }

    /// Current draft for `key`
    #[inline]
    #[must_use]
    pub fn draft(&self, key: NoteKey) -> Option<&str> {
        self.drafts.get(&key).map(String::as_str)
    }

    /// Whether a save is in flight for `key`
    #[inline]
    #[must_use]
    pub fn is_saving(&self, key: NoteKey) -> bool {
        self.autosave.is_saving(key)
    }

    /// Last surfaced error, if no success has cleared it yet
    #[inline]
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    /// Number of note cache entries
    #[inline]
    #[must_use]
    pub fn note_count(&self) -> usize {
        self.notes.len()
    }

    /// Cloneable view of every cache for rendering
    #[must_use]
    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            weeks: self.weeks.clone(),
            selected_week: self.selected,
            tasks: self.tasks.clone(),
            notes: self.notes.clone(),
            drafts: self.drafts.clone(),
            saving: self.autosave.saving_keys(),
            banner: self.banner.clone(),
        }
    }
}

impl<G> std::fmt::Debug for DashboardCore<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardCore")
            .field("selected", &self.selected)
            .field("weeks", &self.weeks.len())
            .field("tasks", &self.tasks.len())
            .field("notes", &self.notes.len())
            .field("banner", &self.banner)
            .finish_non_exhaustive()
    }
}
