use super::*;
use crate::state::test_helpers;
use serde_json::json;

fn data(value: Value) -> Data {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        _ => Data::new(),
    }
}

#[tokio::test]
async fn update_merges_fields() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    update_presence(&state, &room_id, client, &data(json!({"cursor": {"x": 3.0, "y": 4.0}})))
        .await
        .unwrap();
    let view = update_presence(&state, &room_id, client, &data(json!({"message": "hello"})))
        .await
        .unwrap();

    assert_eq!(view.presence.cursor, Some(Cursor { x: 3.0, y: 4.0 }));
    assert_eq!(view.presence.message.as_deref(), Some("hello"));
    assert!(view.presence.previous_message.is_none());
}

#[tokio::test]
async fn null_clears_field() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    let update = data(json!({"cursor": {"x": 1.0, "y": 1.0}, "message": "hi"}));
    update_presence(&state, &room_id, client, &update)
        .await
        .unwrap();
    let view = clear_presence(&state, &room_id, client).await.unwrap();

    assert!(view.presence.cursor.is_none());
    assert!(view.presence.message.is_none());
}

#[tokio::test]
async fn malformed_cursor_hides_it() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (client, _rx) = test_helpers::seed_client(&state, &room_id).await;

    let view = update_presence(&state, &room_id, client, &data(json!({"cursor": {"x": "left"}})))
        .await
        .unwrap();
    assert!(view.presence.cursor.is_none());
}

#[tokio::test]
async fn unknown_participant_is_ignored() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let view = update_presence(&state, &room_id, Uuid::new_v4(), &Data::new()).await;
    assert!(view.is_none());
}

#[tokio::test]
async fn others_excludes_caller() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (a, _rx_a) = test_helpers::seed_client(&state, &room_id).await;
    let (b, _rx_b) = test_helpers::seed_client(&state, &room_id).await;
    let (c, _rx_c) = test_helpers::seed_client(&state, &room_id).await;

    let views = others(&state, &room_id, a).await;
    let ids: Vec<Uuid> = views.iter().map(|v| v.client_id).collect();
    assert_eq!(ids, vec![b, c]);
}

#[test]
fn view_payload_is_flat_camel_case() {
    let participant = Participant {
        connection_id: 7,
        name: "Ada".into(),
        color: "#059669".into(),
        presence: Presence { cursor: None, message: Some("yo".into()), previous_message: None },
    };
    let client_id = Uuid::new_v4();
    let payload = PresenceView::new(client_id, &participant).to_data();

    assert_eq!(payload["connectionId"], json!(7));
    assert_eq!(payload["clientId"], json!(client_id));
    assert_eq!(payload["message"], json!("yo"));
    assert_eq!(payload["cursor"], Value::Null);
    assert!(payload.contains_key("previousMessage"));
}

#[tokio::test]
async fn view_of_returns_single_participant() {
    let state = test_helpers::test_app_state();
    let room_id = test_helpers::seed_room(&state).await;
    let (a, _rx) = test_helpers::seed_client(&state, &room_id).await;
    let view = view_of(&state, &room_id, a).await.unwrap();
    assert_eq!(view.client_id, a);
    assert_eq!(view.connection_id, 1);
    assert!(view_of(&state, &room_id, Uuid::new_v4()).await.is_none());
}
