//! Change feed contract
//!
//! The hosted store pushes row-change events matching a topic filter.
//! Subscriptions are RAII handles: dropping one unsubscribes, so no
//! subscription can outlive the view that created it.

use weekdeck_core::{TaskId, WeekNumber};

/// Topic filter a subscription is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedFilter {
    /// Task rows belonging to one week
    TasksInWeek(WeekNumber),
    /// Every note row
    AllNotes,
}

/// Kind of row change reported by the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// New row
    Insert,
    /// Existing row modified
    Update,
    /// Row removed
    Delete,
}

/// What the changed row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeScope {
    /// A task row in the given week
    Task {
        /// Week the task belongs to
        week_number: WeekNumber,
    },
    /// A note row attached to the given task
    Note {
        /// Task the note is attached to
        task_id: TaskId,
    },
}

/// One pushed row-change event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Kind of change
    pub kind: ChangeKind,
    /// Row the change applies to
    pub scope: ChangeScope,
}

impl ChangeEvent {
    /// Task-row change event
    #[inline]
    #[must_use]
    pub fn task(kind: ChangeKind, week_number: WeekNumber) -> Self {
        Self {
            kind,
            scope: ChangeScope::Task { week_number },
        }
    }

    /// Note-row change event
    #[inline]
    #[must_use]
    pub fn note(kind: ChangeKind, task_id: TaskId) -> Self {
        Self {
            kind,
            scope: ChangeScope::Note { task_id },
        }
    }

    /// Whether this event passes the given topic filter
    #[must_use]
    pub fn matches(&self, filter: &FeedFilter) -> bool {
        match (self.scope, filter) {
            (ChangeScope::Task { week_number }, FeedFilter::TasksInWeek(week)) => {
                week_number == *week
            }
            (ChangeScope::Note { .. }, FeedFilter::AllNotes) => true,
            _ => false,
        }
    }
}

/// Live subscription handle
///
/// Dropping the handle runs the teardown the gateway registered,
/// removing the sink from the feed.
#[must_use = "dropping the subscription is what unsubscribes; hold it for the view's lifetime"]
pub struct Subscription {
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Handle that runs `on_drop` when released
    pub fn new(on_drop: impl FnOnce() + Send + 'static) -> Self {
        Self {
            on_drop: Some(Box::new(on_drop)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(teardown) = self.on_drop.take() {
            teardown();
            tracing::trace!("subscription torn down");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.on_drop.is_some())
            .finish()
    }
}
