use super::*;
use crate::state::test_helpers;
use crate::store::RoomStore;

#[test]
fn storage_error_to_status_maps_variants() {
    assert_eq!(
        storage_error_to_status(&StorageError::RoomNotLoaded("x".into())),
        StatusCode::NOT_FOUND
    );
    assert_eq!(storage_error_to_status(&StorageError::InvalidKey), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_storage_reads_live_room() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", test_helpers::rect_shape("a", 1.0))
        .await
        .unwrap();

    let Json(body) = get_storage(State(state), Path(room_id.clone())).await.unwrap();
    assert_eq!(body.room_id, room_id);
    assert_eq!(body.objects["a"]["left"], 1.0);
}

#[tokio::test]
async fn get_storage_falls_back_to_store() {
    let (state, store) = test_helpers::test_app_state_with_store();
    store
        .save("cold", &[("k".into(), json!({"objectId": "k"}))], &[])
        .await
        .unwrap();

    let Json(body) = get_storage(State(state), Path("cold".into())).await.unwrap();
    assert_eq!(body.objects, json!({"k": {"objectId": "k"}}));
}

#[tokio::test]
async fn get_storage_rejects_bad_room_id() {
    let state = test_helpers::test_app_state();
    let err = get_storage(State(state), Path("a b".into())).await.err();
    assert_eq!(err, Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn reset_storage_clears_and_notifies() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, mut rx) = test_helpers::seed_client(&state, &room_id).await;
    storage::set_shape(&state, &room_id, client, "a", json!({})).await.unwrap();

    let Json(body) = reset_storage(State(state.clone()), Path(room_id.clone()))
        .await
        .unwrap();
    assert_eq!(body["removed"], 1);

    assert_eq!(rx.try_recv().unwrap().syscall, "storage:reset");
    let rooms = state.rooms.read().await;
    let live = &rooms[&room_id];
    assert!(live.objects.is_empty());
    assert!(!live.history.contains_key(&Uuid::nil()));
}

#[tokio::test]
async fn reset_storage_unknown_room_removes_nothing() {
    let state = test_helpers::test_app_state();
    let Json(body) = reset_storage(State(state), Path("ghost".into())).await.unwrap();
    assert_eq!(body["removed"], 0);
}

#[tokio::test]
async fn reset_storage_clears_stored_room() {
    let (state, store) = test_helpers::test_app_state_with_store();
    store
        .save(
            "cold",
            &[("k".into(), json!({"objectId": "k"})), ("j".into(), json!({"objectId": "j"}))],
            &[],
        )
        .await
        .unwrap();

    let Json(body) = reset_storage(State(state.clone()), Path("cold".into()))
        .await
        .unwrap();
    assert_eq!(body["removed"], 2);
    assert!(store.persisted("cold").await.is_empty());

    let Json(after) = get_storage(State(state), Path("cold".into())).await.unwrap();
    assert_eq!(after.objects, json!({}));
}

#[tokio::test]
async fn reset_storage_stored_room_reports_store_failure() {
    let (state, store) = test_helpers::test_app_state_with_store();
    store
        .save("cold", &[("k".into(), json!({"objectId": "k"}))], &[])
        .await
        .unwrap();
    store.set_fail_saves(true);

    let err = reset_storage(State(state), Path("cold".into())).await.err();
    assert_eq!(err, Some(StatusCode::SERVICE_UNAVAILABLE));
}

#[tokio::test]
async fn list_rooms_returns_summaries() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (_client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    let Json(rooms) = list_rooms(State(state)).await;
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0].participants, 1);
}
