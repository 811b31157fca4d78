use super::*;
use serde_json::json;

#[tokio::test]
async fn unknown_room_loads_empty() {
    let store = MemoryRoomStore::new();
    let shapes = store.load("nowhere").await.unwrap();
    assert!(shapes.is_empty());
}

#[tokio::test]
async fn save_applies_deletes_then_upserts() {
    let store = MemoryRoomStore::new();
    let upserts = [
        ("a".into(), json!({"objectId": "a"})),
        ("b".into(), json!({"objectId": "b"})),
    ];
    store
        .save("lobby", &upserts, &[])
        .await
        .unwrap();
    store
        .save("lobby", &[("c".into(), json!({"objectId": "c"}))], &["a".into()])
        .await
        .unwrap();

    let shapes = store.load("lobby").await.unwrap();
    let mut keys: Vec<_> = shapes.keys().cloned().collect();
    keys.sort();
    assert_eq!(keys, vec!["b", "c"]);
}

#[tokio::test]
async fn failing_store_reports_retryable_error() {
    let store = MemoryRoomStore::new();
    store.set_fail_saves(true);
    let err = store.save("lobby", &[], &[]).await.unwrap_err();
    assert_eq!(err.error_code(), "E_STORE_UNAVAILABLE");
    assert!(err.retryable());

    store.set_fail_saves(false);
    assert!(store.save("lobby", &[], &[]).await.is_ok());
}
