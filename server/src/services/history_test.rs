use super::*;
use crate::services::storage;
use crate::state::test_helpers;
use serde_json::json;

fn change(key: &str, before: Option<Value>, after: Option<Value>) -> Change {
    Change { key: key.into(), before, after }
}

// =============================================================================
// History (pure)
// =============================================================================

#[test]
fn record_clears_redo() {
    let mut history = History::new(10);
    history.record(change("a", None, Some(json!(1))));
    let batch = history.take_undo().unwrap();
    history.redo.push_back(batch);
    assert_eq!(history.redo_len(), 1);

    history.record(change("b", None, Some(json!(2))));
    assert_eq!(history.redo_len(), 0);
}

#[test]
fn no_op_changes_are_not_recorded() {
    let mut history = History::new(10);
    history.record(change("a", Some(json!(1)), Some(json!(1))));
    assert_eq!(history.undo_len(), 0);
}

#[test]
fn undo_stack_is_capped() {
    let mut history = History::new(2);
    for i in 0..5 {
        history.record(change("a", Some(json!(i)), Some(json!(i + 1))));
    }
    assert_eq!(history.undo_len(), 2);
}

#[test]
fn paused_changes_merge_per_key() {
    let mut history = History::new(10);
    history.pause();
    history.record(change("a", None, Some(json!({"w": 1}))));
    history.record(change("a", Some(json!({"w": 1})), Some(json!({"w": 2}))));
    history.record(change("b", None, Some(json!({}))));
    assert!(history.is_paused());
    assert_eq!(history.undo_len(), 0);

    history.resume();
    assert!(!history.is_paused());
    assert_eq!(history.undo_len(), 1);

    let batch = history.take_undo().unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[0], change("a", None, Some(json!({"w": 2}))));
}

#[test]
fn paused_change_that_returns_to_start_cancels_out() {
    let mut history = History::new(10);
    history.pause();
    history.record(change("a", Some(json!(1)), Some(json!(2))));
    history.record(change("a", Some(json!(2)), Some(json!(1))));
    history.resume();
    assert_eq!(history.undo_len(), 0);
}

// =============================================================================
// undo / redo against a room
// =============================================================================

#[tokio::test]
async fn undo_after_set_restores_previous_value() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    storage::set_shape(&state, &room_id, client, "k", test_helpers::rect_shape("k", 1.0))
        .await
        .unwrap();
    storage::set_shape(&state, &room_id, client, "k", test_helpers::rect_shape("k", 2.0))
        .await
        .unwrap();

    let patch = undo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.set["k"]["left"], 1.0);
    assert!(patch.deleted.is_empty());

    let patch = undo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.deleted, vec!["k".to_string()]);
    assert!(storage::snapshot(&state, &room_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn redo_reapplies_undone_edit() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    storage::set_shape(&state, &room_id, client, "k", test_helpers::rect_shape("k", 1.0))
        .await
        .unwrap();
    undo(&state, &room_id, client).await.unwrap();

    let patch = redo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.set["k"]["left"], 1.0);
    assert_eq!(storage::snapshot(&state, &room_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn new_edit_after_undo_drops_redo() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    storage::set_shape(&state, &room_id, client, "a", json!({})).await.unwrap();
    undo(&state, &room_id, client).await.unwrap();
    storage::set_shape(&state, &room_id, client, "b", json!({})).await.unwrap();

    let patch = redo(&state, &room_id, client).await.unwrap();
    assert!(patch.is_empty());
}

#[tokio::test]
async fn undo_reset_restores_every_shape() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    for key in ["a", "b", "c"] {
        storage::set_shape(&state, &room_id, client, key, test_helpers::rect_shape(key, 0.0))
            .await
            .unwrap();
    }
    storage::reset(&state, &room_id, client).await.unwrap();

    let patch = undo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.set.len(), 3);
    assert_eq!(storage::snapshot(&state, &room_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn undo_delete_restores_shape() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "k", test_helpers::rect_shape("k", 5.0))
        .await
        .unwrap();
    storage::delete_shape(&state, &room_id, client, "k").await.unwrap();

    let patch = undo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.set["k"]["left"], 5.0);
}

#[tokio::test]
async fn paused_gesture_undoes_in_one_step() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    pause(&state, &room_id, client).await.unwrap();
    for left in [1.0, 2.0, 3.0, 4.0] {
        storage::set_shape(&state, &room_id, client, "k", test_helpers::rect_shape("k", left))
            .await
            .unwrap();
    }
    resume(&state, &room_id, client).await.unwrap();

    let patch = undo(&state, &room_id, client).await.unwrap();
    assert_eq!(patch.deleted, vec!["k".to_string()]);
    assert!(undo(&state, &room_id, client).await.unwrap().is_empty());
}

#[tokio::test]
async fn histories_are_per_client() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (a, _rx_a) = test_helpers::seed_client(&state, &room_id).await;
    let (b, _rx_b) = test_helpers::seed_client(&state, &room_id).await;

    storage::set_shape(&state, &room_id, a, "mine", json!({})).await.unwrap();
    storage::set_shape(&state, &room_id, b, "theirs", json!({})).await.unwrap();

    let patch = undo(&state, &room_id, a).await.unwrap();
    assert_eq!(patch.deleted, vec!["mine".to_string()]);
    assert!(storage::snapshot(&state, &room_id).await.unwrap().contains_key("theirs"));
}

#[tokio::test]
async fn undo_in_unknown_room_errors() {
    let state = test_helpers::test_app_state();
    let err = undo(&state, "ghost", Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, StorageError::RoomNotLoaded(_)));
}
