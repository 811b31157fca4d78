use super::*;

fn shape_set_frame() -> Frame {
    Frame {
        id: "id-1".to_owned(),
        parent_id: Some("parent-1".to_owned()),
        ts: 42,
        room_id: Some("lobby".to_owned()),
        from: Some("client-1".to_owned()),
        syscall: "storage:set".to_owned(),
        status: Status::Done,
        data: serde_json::json!({
            "id": "shape-1",
            "shape": {
                "type": "rect",
                "objectId": "shape-1",
                "left": 10.5,
                "visible": true,
                "path": [{"x": 1.0, "y": 2.0}],
                "src": null
            }
        }),
    }
}

fn request_wire(status: i32, data: Option<prost_types::Value>) -> Vec<u8> {
    let wire = WireFrame {
        id: "id-1".to_owned(),
        parent_id: None,
        ts: 1,
        room_id: None,
        from: None,
        syscall: "storage:get".to_owned(),
        status,
        data,
    };
    let mut bytes = Vec::new();
    wire.encode(&mut bytes).expect("encode");
    bytes
}

#[test]
fn status_numeric_mapping_matches_wire_enum() {
    assert_eq!(Status::Request.as_i32(), 0);
    assert_eq!(Status::Done.as_i32(), 1);
    assert_eq!(Status::Error.as_i32(), 2);
    assert_eq!(Status::Cancel.as_i32(), 3);
    assert_eq!(Status::Item.as_i32(), 4);
    assert_eq!(Status::Bulk.as_i32(), 5);
}

#[test]
fn status_from_wire_rejects_out_of_range_value() {
    let err = Status::from_i32(99).expect_err("status should be invalid");
    assert!(matches!(err, CodecError::InvalidStatus(99)));
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(Status::Cancel.is_terminal());
    assert!(!Status::Request.is_terminal());
    assert!(!Status::Item.is_terminal());
    assert!(!Status::Bulk.is_terminal());
}

#[test]
fn shape_payload_survives_binary_codec() {
    let frame = shape_set_frame();
    let decoded = decode_frame(&encode_frame(&frame)).expect("decode should succeed");
    assert_eq!(decoded, frame);
}

#[test]
fn shape_payload_survives_json_codec() {
    let frame = shape_set_frame();
    let text = encode_json(&frame).expect("encode");
    let decoded = decode_json(&text).expect("decode");
    assert_eq!(decoded, frame);
}

#[test]
fn decode_frame_rejects_malformed_bytes() {
    let err = decode_frame(&[0xff, 0x00, 0x01]).expect_err("bytes should fail");
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn decode_json_rejects_malformed_text() {
    let err = decode_json("{not json").expect_err("text should fail");
    assert!(matches!(err, CodecError::Json(_)));
}

#[test]
fn decode_frame_rejects_invalid_wire_status() {
    let bytes = request_wire(77, Some(json_to_proto_value(&serde_json::json!({}))));
    let err = decode_frame(&bytes).expect_err("status should fail");
    assert!(matches!(err, CodecError::InvalidStatus(77)));
}

#[test]
fn decode_frame_defaults_missing_data_to_empty_object() {
    let bytes = request_wire(Status::Request.as_i32(), None);
    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, serde_json::json!({}));
}

#[test]
fn decode_frame_converts_nan_number_to_json_null() {
    let bytes = request_wire(
        Status::Request.as_i32(),
        Some(prost_types::Value { kind: Some(prost_types::value::Kind::NumberValue(f64::NAN)) }),
    );
    let frame = decode_frame(&bytes).expect("decode");
    assert_eq!(frame.data, Value::Null);
}

#[test]
fn integer_connection_ids_come_back_as_floats() {
    let frame = Frame {
        id: "id-int".to_owned(),
        parent_id: None,
        ts: 1,
        room_id: Some("lobby".to_owned()),
        from: None,
        syscall: "room:join".to_owned(),
        status: Status::Request,
        data: serde_json::json!({"connection_id": 2}),
    };

    let decoded = decode_frame(&encode_frame(&frame)).expect("decode");
    assert_eq!(decoded.data.get("connection_id"), Some(&serde_json::json!(2.0)));
}

#[test]
fn error_message_only_on_error_frames() {
    let mut frame = shape_set_frame();
    frame.data = serde_json::json!({"message": "boom"});
    assert_eq!(frame.error_message(), None);

    frame.status = Status::Error;
    assert_eq!(frame.error_message(), Some("boom"));
}

#[test]
fn status_serializes_as_lowercase_json() {
    assert_eq!(serde_json::to_string(&Status::Request).expect("serialize"), "\"request\"");
    assert_eq!(serde_json::to_string(&Status::Cancel).expect("serialize"), "\"cancel\"");
    assert!(serde_json::from_str::<Status>("\"Error\"").is_err());
}
