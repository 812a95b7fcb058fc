//! Per-key autosave bookkeeping
//!
//! One state-machine table tracks every `(task, owner)` note key:
//!
//! ```text
//! Clean -> Dirty -> Scheduled -> Saving -> Clean   (success)
//!                                      \-> Dirty   (failure, re-armed)
//! ```
//!
//! Timers are debounced per key: re-arming cancels and replaces the
//! pending timer, so rapid retyping keeps deferring the flush. At most
//! one save is in flight per key; a save request arriving while one is
//! in flight is dropped, and the next debounce cycle retries if the
//! key is still dirty. The registry owns every timer it spawned and
//! aborts them all when dropped.

use crate::event::CoreEvent;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use weekdeck_core::NoteKey;

/// Default quiet period before a dirty draft is flushed
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1500);

/// Where a `(task, owner)` key sits in the autosave lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    /// Draft equals the last-known-saved note
    #[default]
    Clean,
    /// Draft differs; nothing scheduled or in flight
    Dirty,
    /// A debounce timer is pending
    Scheduled,
    /// A write is in flight
    Saving,
}

/// The per-key state-machine table
#[derive(Debug)]
pub struct AutosaveRegistry {
    debounce: Duration,
    events: mpsc::UnboundedSender<CoreEvent>,
    states: HashMap<NoteKey, SaveState>,
    timers: HashMap<NoteKey, JoinHandle<()>>,
}

impl AutosaveRegistry {
    /// Registry firing `CoreEvent::DebounceElapsed` into `events`
    #[must_use]
    pub fn new(debounce: Duration, events: mpsc::UnboundedSender<CoreEvent>) -> Self {
        Self {
            debounce,
            events,
            states: HashMap::new(),
            timers: HashMap::new(),
        }
    }

    /// Current state for a key (untracked keys are `Clean`)
    #[inline]
    #[must_use]
    pub fn state(&self, key: NoteKey) -> SaveState {
        self.states.get(&key).copied().unwrap_or_default()
    }

    /// Whether a write is in flight for this key
    #[inline]
    #[must_use]
    pub fn is_saving(&self, key: NoteKey) -> bool {
        self.state(key) == SaveState::Saving
    }

    /// Keys with a write currently in flight
    #[must_use]
    pub fn saving_keys(&self) -> Vec<NoteKey> {
        self.states
            .iter()
            .filter(|(_, state)| **state == SaveState::Saving)
            .map(|(key, _)| *key)
            .collect()
    }

    /// Number of pending debounce timers
    #[inline]
    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Record an edit for `key`
    ///
    /// A dirty edit (re)arms the key's debounce timer; an edit back to
    /// the saved value settles a dirty key without touching any timer
    /// still pending (the fire-time re-check makes it a no-op).
    pub fn note_edited(&mut self, key: NoteKey, dirty: bool) {
        if dirty {
            self.arm(key);
        } else if self.state(key) == SaveState::Dirty {
            self.states.insert(key, SaveState::Clean);
        }
    }

    /// (Re)arm the debounce timer for `key`
    ///
    /// Cancels and replaces any timer already pending for the same
    /// key. An in-flight save keeps its `Saving` state; the timer will
    /// fire into the usual dropped-while-saving path.
    pub fn arm(&mut self, key: NoteKey) {
        if let Some(timer) = self.timers.remove(&key) {
            timer.abort();
        }
        let events = self.events.clone();
        let delay = self.debounce;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(CoreEvent::DebounceElapsed(key));
        });
        self.timers.insert(key, timer);
        if self.state(key) != SaveState::Saving {
            self.states.insert(key, SaveState::Scheduled);
        }
        tracing::trace!(%key, "debounce timer armed");
    }

    /// Forget the timer entry whose fire event is being handled
    pub fn timer_elapsed(&mut self, key: NoteKey) {
        self.timers.remove(&key);
    }

    /// Claim the in-flight slot for `key`
    ///
    /// Returns `false` when a save is already in flight, in which case
    /// the caller must drop the request rather than queue it.
    pub fn try_begin_save(&mut self, key: NoteKey) -> bool {
        if self.state(key) == SaveState::Saving {
            return false;
        }
        self.states.insert(key, SaveState::Saving);
        true
    }

    /// Release the in-flight slot after a save completed
    ///
    /// A still-dirty key (failed save, or new edits landed during the
    /// flight) goes back through the debounce cycle: an already-armed
    /// timer is kept, otherwise a fresh one is armed. A clean key
    /// settles to `Clean` (or `Scheduled` if a stale timer is pending;
    /// its fire re-checks and no-ops).
    pub fn finish_save(&mut self, key: NoteKey, still_dirty: bool) {
        if still_dirty {
            if self.timers.contains_key(&key) {
                self.states.insert(key, SaveState::Scheduled);
            } else {
                self.states.insert(key, SaveState::Dirty);
                self.arm(key);
            }
        } else if self.timers.contains_key(&key) {
            self.states.insert(key, SaveState::Scheduled);
        } else {
            self.states.insert(key, SaveState::Clean);
        }
    }

    /// Settle a key after a no-op save request (draft already saved)
    pub fn settle_clean(&mut self, key: NoteKey) {
        if self.state(key) != SaveState::Saving {
            let state = if self.timers.contains_key(&key) {
                SaveState::Scheduled
            } else {
                SaveState::Clean
            };
            self.states.insert(key, state);
        }
    }
}

impl Drop for AutosaveRegistry {
    fn drop(&mut self) {
        for timer in self.timers.values() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weekdeck_core::{Owner, TaskId};

    fn key() -> NoteKey {
        NoteKey::new(TaskId::new(), Owner::A)
    }

    fn registry() -> (AutosaveRegistry, mpsc::UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (AutosaveRegistry::new(DEFAULT_DEBOUNCE, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn dirty_edit_schedules_and_fires_once() {
        let (mut registry, mut events) = registry();
        let key = key();

        registry.note_edited(key, true);
        assert_eq!(registry.state(key), SaveState::Scheduled);
        assert_eq!(registry.pending_timers(), 1);

        match events.recv().await {
            Some(CoreEvent::DebounceElapsed(fired)) => assert_eq!(fired, key),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_timer() {
        let (mut registry, mut events) = registry();
        let key = key();

        registry.arm(key);
        registry.arm(key);
        assert_eq!(registry.pending_timers(), 1);

        // Exactly one fire reaches the channel; the aborted timer is gone.
        assert!(matches!(
            events.recv().await,
            Some(CoreEvent::DebounceElapsed(_))
        ));
        drop(registry);
        assert!(events.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_save_excludes_a_second() {
        let (mut registry, _events) = registry();
        let key = key();

        assert!(registry.try_begin_save(key));
        assert!(!registry.try_begin_save(key));
        assert!(registry.is_saving(key));

        registry.finish_save(key, false);
        assert_eq!(registry.state(key), SaveState::Clean);
        assert!(registry.try_begin_save(key));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_save_rearms_the_debounce_cycle() {
        let (mut registry, mut events) = registry();
        let key = key();

        assert!(registry.try_begin_save(key));
        registry.finish_save(key, true);
        assert_eq!(registry.state(key), SaveState::Scheduled);
        assert_eq!(registry.pending_timers(), 1);

        assert!(matches!(
            events.recv().await,
            Some(CoreEvent::DebounceElapsed(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn arming_during_flight_keeps_saving_state() {
        let (mut registry, _events) = registry();
        let key = key();

        assert!(registry.try_begin_save(key));
        registry.arm(key);
        assert_eq!(registry.state(key), SaveState::Saving);

        // Completion with the timer still pending leaves it to re-check.
        registry.finish_save(key, true);
        assert_eq!(registry.state(key), SaveState::Scheduled);
        assert_eq!(registry.pending_timers(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts_pending_timers() {
        let (tx, mut events) = mpsc::unbounded_channel();
        let mut registry = AutosaveRegistry::new(DEFAULT_DEBOUNCE, tx);
        let key = key();

        registry.arm(key);
        drop(registry);

        // Both the registry's sender and the aborted timer's are gone.
        assert!(events.recv().await.is_none());
    }
}
