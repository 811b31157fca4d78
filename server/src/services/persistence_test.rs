use super::*;
use crate::services::storage;
use crate::state::test_helpers;
use serde_json::json;

#[tokio::test]
async fn flush_writes_dirty_shapes_and_clears_flags() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", test_helpers::rect_shape("a", 1.0))
        .await
        .unwrap();

    flush_room(&state, &room_id).await.unwrap();

    assert_eq!(store.persisted(&room_id).await["a"]["left"], 1.0);
    let rooms = state.rooms.read().await;
    assert!(!rooms[&room_id].has_pending_writes());
}

#[tokio::test]
async fn flush_propagates_deletes() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", json!({})).await.unwrap();
    flush_room(&state, &room_id).await.unwrap();

    storage::delete_shape(&state, &room_id, client, "a").await.unwrap();
    flush_room(&state, &room_id).await.unwrap();

    assert!(store.persisted(&room_id).await.is_empty());
    let rooms = state.rooms.read().await;
    assert!(rooms[&room_id].deleted.is_empty());
}

#[tokio::test]
async fn failed_flush_retains_dirty_flags() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", json!({})).await.unwrap();

    store.set_fail_saves(true);
    assert!(flush_room(&state, &room_id).await.is_err());
    assert!(state.rooms.read().await[&room_id].dirty.contains("a"));

    store.set_fail_saves(false);
    flush_room(&state, &room_id).await.unwrap();
    assert!(store.persisted(&room_id).await.contains_key("a"));
}

#[tokio::test]
async fn flush_of_clean_room_is_noop() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let room_id = test_helpers::seed_room(&state).await;
    store.set_fail_saves(true);
    flush_room(&state, &room_id).await.unwrap();
    flush_room(&state, "ghost").await.unwrap();
}

#[tokio::test]
async fn flush_all_covers_every_dirty_room() {
    let (state, store) = test_helpers::test_app_state_with_store();
    let first = test_helpers::seed_room(&state).await;
    let second = test_helpers::seed_room(&state).await;
    let (a, _rx_a) = test_helpers::seed_client(&state, &first).await;
    let (b, _rx_b) = test_helpers::seed_client(&state, &second).await;
    storage::set_shape(&state, &first, a, "x", json!({})).await.unwrap();
    storage::set_shape(&state, &second, b, "y", json!({})).await.unwrap();

    flush_all_dirty(&state).await;

    assert!(store.persisted(&first).await.contains_key("x"));
    assert!(store.persisted(&second).await.contains_key("y"));
}

#[tokio::test]
async fn rewrite_during_flush_stays_dirty() {
    let (state, _store) = test_helpers::test_app_state_with_store();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", test_helpers::rect_shape("a", 1.0))
        .await
        .unwrap();

    let pending = capture(&state, &room_id).await.unwrap();
    storage::set_shape(&state, &room_id, client, "a", test_helpers::rect_shape("a", 2.0))
        .await
        .unwrap();

    // Replay the ack half of a flush with the stale capture.
    let mut rooms = state.rooms.write().await;
    let room = rooms.get_mut(&room_id).unwrap();
    for (key, flushed) in &pending.upserts {
        if room.objects.get(key) == Some(flushed) {
            room.dirty.remove(key);
        }
    }
    assert!(room.dirty.contains("a"));
}
