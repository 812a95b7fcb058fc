//! End-to-end autosave behavior against the in-memory gateway
//!
//! All tests run on a paused clock: `events.recv()` auto-advances
//! virtual time to the next pending timer, so debounce windows elapse
//! deterministically.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use weekdeck_core::{NoteKey, Owner, TaskId};
use weekdeck_gateway::{ChangeEvent, ChangeKind, DataGateway};
use weekdeck_state::{CoreEvent, DashboardConfig, DashboardCore};
use weekdeck_testkit::{note_fixture, task_fixture, week_fixture, InMemoryGateway};

async fn next_event(events: &mut mpsc::UnboundedReceiver<CoreEvent>) -> CoreEvent {
    tokio::time::timeout(Duration::from_secs(60), events.recv())
        .await
        .expect("no core event within a virtual minute")
        .expect("event channel closed")
}

async fn pump(
    core: &mut DashboardCore<InMemoryGateway>,
    events: &mut mpsc::UnboundedReceiver<CoreEvent>,
    count: usize,
) {
    for _ in 0..count {
        let event = next_event(events).await;
        core.handle_event(event).await;
    }
}

/// Gateway seeded with week 3 and one task, plus an initialized core.
async fn board_with_one_task() -> (
    Arc<InMemoryGateway>,
    DashboardCore<InMemoryGateway>,
    mpsc::UnboundedReceiver<CoreEvent>,
    TaskId,
) {
    weekdeck_testkit::init_test_logging();
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_week(week_fixture(3, "Launch prep"));
    let task = task_fixture(weekdeck_core::WeekNumber(3), Owner::A, "Call clinic");
    let task_id = task.id;
    gateway.seed_task(task);

    let (mut core, events) = DashboardCore::new(Arc::clone(&gateway), &DashboardConfig::new());
    core.initialize().await;
    (gateway, core, events, task_id)
}

#[tokio::test(start_paused = true)]
async fn hydration_initializes_every_pair() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_week(week_fixture(3, "Launch prep"));
    let task_a = task_fixture(weekdeck_core::WeekNumber(3), Owner::A, "Call clinic");
    let task_b = task_fixture(weekdeck_core::WeekNumber(3), Owner::B, "Book flights");
    gateway.seed_note(note_fixture(task_a.id, Owner::A, "left a voicemail"));
    let key_saved = NoteKey::new(task_a.id, Owner::A);
    let key_empty = NoteKey::new(task_b.id, Owner::B);
    gateway.seed_task(task_a);
    gateway.seed_task(task_b);

    let (mut core, _events) = DashboardCore::new(Arc::clone(&gateway), &DashboardConfig::new());
    core.initialize().await;

    // Two tasks x two owners, exactly one entry each.
    assert_eq!(core.note_count(), 4);

    let saved = core.note(key_saved).unwrap();
    assert_eq!(saved.note, "left a voicemail");
    assert!(saved.updated_at.is_some());

    let empty = core.note(key_empty).unwrap();
    assert_eq!(empty.note, "");
    assert!(empty.updated_at.is_none());

    // Drafts mirror the hydrated notes, so nothing reads as unsaved.
    assert_eq!(core.draft(key_saved), Some("left a voicemail"));
    assert_eq!(core.draft(key_empty), Some(""));
}

#[tokio::test(start_paused = true)]
async fn debounced_edit_produces_exactly_one_upsert() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::B);

    core.edit_note(key, "En route");
    pump(&mut core, &mut events, 2).await; // timer fire, save completion

    assert_eq!(gateway.note_writes(), vec![(key, "En route".to_string())]);
    assert_eq!(gateway.upsert_attempts(), 1);
    let entry = core.note(key).unwrap();
    assert_eq!(entry.note, "En route");
    assert!(entry.updated_at.is_some());
    assert!(!core.is_saving(key));
    assert_eq!(core.banner(), None);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_coalesce_into_the_final_value() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::B);

    // Two edits 200ms apart, both inside the 1500ms window.
    core.edit_note(key, "En");
    tokio::time::advance(Duration::from_millis(200)).await;
    core.edit_note(key, "En route");
    pump(&mut core, &mut events, 2).await;

    // Only the second value is ever written.
    assert_eq!(gateway.note_writes(), vec![(key, "En route".to_string())]);
    assert_eq!(gateway.upsert_attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn explicit_save_is_idempotent_and_never_duplicates() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::A);

    core.edit_note(key, "done early");
    core.save_note(key);
    pump(&mut core, &mut events, 1).await; // save completion

    // The still-pending debounce timer re-checks and finds draft ==
    // saved: no second write, no second row.
    pump(&mut core, &mut events, 1).await;
    core.save_note(key);

    assert_eq!(gateway.upsert_attempts(), 1);
    assert_eq!(gateway.note_rows(key), 1);
    assert_eq!(core.note(key).unwrap().note, "done early");
}

#[tokio::test(start_paused = true)]
async fn in_flight_save_drops_concurrent_requests() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::B);
    gateway.set_upsert_delay(Duration::from_millis(500));

    core.edit_note(key, "first");
    pump(&mut core, &mut events, 1).await; // timer fire starts the save
    assert!(core.is_saving(key));

    // Explicit save while one is in flight: dropped, not queued.
    core.save_note(key);
    pump(&mut core, &mut events, 1).await; // save completion

    assert_eq!(gateway.upsert_attempts(), 1);
    assert_eq!(gateway.max_concurrent_upserts(key), 1);
    assert!(!core.is_saving(key));
}

#[tokio::test(start_paused = true)]
async fn edit_during_flight_saves_again_after_completion() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::B);
    gateway.set_upsert_delay(Duration::from_millis(500));

    core.edit_note(key, "first");
    pump(&mut core, &mut events, 1).await; // save in flight
    core.edit_note(key, "first, updated");

    // Completion lands before the new timer; the key is still dirty,
    // so the next debounce cycle writes the newer draft.
    pump(&mut core, &mut events, 3).await;

    assert_eq!(
        gateway.note_writes(),
        vec![
            (key, "first".to_string()),
            (key, "first, updated".to_string()),
        ]
    );
    assert_eq!(gateway.max_concurrent_upserts(key), 1);
    assert_eq!(core.note(key).unwrap().note, "first, updated");
}

#[tokio::test(start_paused = true)]
async fn failed_save_keeps_draft_and_retries_on_the_next_cycle() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::A);
    gateway.fail_next_upserts(1);

    core.edit_note(key, "v1");
    pump(&mut core, &mut events, 2).await; // timer fire, failed completion

    // No cache mutation: draft and saved stay divergent, error surfaced.
    assert!(core.banner().is_some());
    assert_eq!(core.note(key).unwrap().note, "");
    assert_eq!(core.draft(key), Some("v1"));
    assert!(!core.is_saving(key));
    assert_eq!(gateway.note_rows(key), 0);

    // The re-armed timer cycle retries with the current draft.
    pump(&mut core, &mut events, 2).await;
    assert_eq!(gateway.upsert_attempts(), 2);
    assert_eq!(core.note(key).unwrap().note, "v1");
    assert_eq!(core.banner(), None);
}

#[tokio::test(start_paused = true)]
async fn empty_save_clears_the_note_in_place() {
    let gateway = Arc::new(InMemoryGateway::new());
    gateway.seed_week(week_fixture(3, "Launch prep"));
    let task = task_fixture(weekdeck_core::WeekNumber(3), Owner::A, "Call clinic");
    let key = NoteKey::new(task.id, Owner::A);
    gateway.seed_note(note_fixture(task.id, Owner::A, "obsolete"));
    gateway.seed_task(task);

    let (mut core, mut events) = DashboardCore::new(Arc::clone(&gateway), &DashboardConfig::new());
    core.initialize().await;

    core.edit_note(key, "");
    pump(&mut core, &mut events, 2).await;

    assert_eq!(gateway.note_rows(key), 1);
    assert_eq!(gateway.note(key).unwrap().note, "");
    assert_eq!(core.note(key).unwrap().note, "");
}

#[tokio::test(start_paused = true)]
async fn external_push_rehydrates_and_overwrites_unsent_draft() {
    let (gateway, mut core, mut events, task_id) = board_with_one_task().await;
    let key = NoteKey::new(task_id, Owner::A);

    // Local edit sits unsent in the draft cache...
    core.edit_note(key, "my half-typed update");

    // ...while another client writes and the store pushes the change.
    gateway.upsert_note(key, "their version").await.unwrap();
    gateway.publish(ChangeEvent::note(ChangeKind::Update, task_id));
    pump(&mut core, &mut events, 1).await;

    // Last write observed wins: hydration reset the draft too.
    assert_eq!(core.note(key).unwrap().note, "their version");
    assert_eq!(core.draft(key), Some("their version"));

    // The stale timer finds nothing dirty; no write from this client.
    pump(&mut core, &mut events, 1).await;
    assert_eq!(gateway.note_writes().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn push_for_invisible_task_is_ignored() {
    let (gateway, mut core, mut events, _task_id) = board_with_one_task().await;
    let hydrations_before = gateway.list_notes_calls();

    gateway.publish(ChangeEvent::note(ChangeKind::Update, TaskId::new()));
    pump(&mut core, &mut events, 1).await;

    assert_eq!(gateway.list_notes_calls(), hydrations_before);
}
