#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn rect_at(id: &str, z: i64) -> Shape {
    let mut s = Shape::new(ShapeKind::Rect, id.to_owned());
    s.width = 10.0;
    s.height = 10.0;
    s.z_index = z;
    s
}

// =============================================================
// Serialization
// =============================================================

#[test]
fn decodes_serialized_entry() {
    let value = json!({
        "type": "rect",
        "objectId": "stale",
        "left": 10, "top": 20, "width": 30, "height": 40,
        "scaleX": 2, "fill": "#ff0000",
        "zIndex": 3.0,
        "shadow": null, "opacity": 0.5
    });
    let shape = Shape::from_entry("k1", &value).unwrap();

    assert_eq!(shape.kind, ShapeKind::Rect);
    assert_eq!(shape.object_id, "k1");
    assert_eq!(shape.scale_x, 2.0);
    assert_eq!(shape.scale_y, 1.0);
    assert_eq!(shape.stroke, "#aabbcc");
    assert_eq!(shape.z_index, 3);
    assert_eq!(shape.extra["opacity"], 0.5);
}

#[test]
fn encodes_camel_case_and_keeps_unknown_fields() {
    let value = json!({
        "type": "i-text",
        "objectId": "t",
        "text": "hi",
        "fontWeight": 700,
        "charSpacing": 4,
    });
    let shape = Shape::from_entry("t", &value).unwrap();
    let out = shape.to_value().unwrap();

    assert_eq!(out["type"], "i-text");
    assert_eq!(out["objectId"], "t");
    assert_eq!(out["fontWeight"], 700.0);
    assert_eq!(out["charSpacing"], 4);
    assert_eq!(out["scaleX"], 1.0);
    assert!(out.get("radius").is_none());
}

#[test]
fn rejects_unknown_kind() {
    assert!(Shape::from_entry("x", &json!({ "type": "hexagon" })).is_err());
    assert!(Shape::from_entry("x", &json!("not an object")).is_err());
}

#[test]
fn font_weight_css() {
    assert_eq!(FontWeight::Numeric(400.0).css(), "400");
    assert_eq!(FontWeight::Named("bold".into()).css(), "bold");
}

// =============================================================
// Geometry
// =============================================================

#[test]
fn bounds_apply_scale() {
    let mut s = rect_at("a", 0);
    s.left = 5.0;
    s.scale_x = 3.0;
    let b = s.bounds();
    assert_eq!((b.left, b.width, b.height), (5.0, 30.0, 10.0));
}

#[test]
fn bounds_normalize_negative_drag() {
    let mut s = rect_at("a", 0);
    s.left = 50.0;
    s.top = 50.0;
    s.width = -20.0;
    let b = s.bounds();
    assert_eq!((b.left, b.width), (30.0, 20.0));
}

#[test]
fn translate_moves_line_endpoints() {
    let mut line = create_specific_shape(Tool::Line, Point::new(0.0, 0.0)).unwrap();
    line.translate(5.0, -5.0);
    assert_eq!(line.endpoints(), Some((Point::new(5.0, -5.0), Point::new(105.0, 95.0))));
    assert_eq!((line.left, line.top), (5.0, -5.0));
}

#[test]
fn translate_moves_path_points() {
    let mut path = create_path_shape(vec![Point::new(0.0, 0.0), Point::new(4.0, 2.0)]).unwrap();
    path.translate(1.0, 1.0);
    assert_eq!(path.path.as_deref(), Some(&[Point::new(1.0, 1.0), Point::new(5.0, 3.0)][..]));
}

// =============================================================
// Factories
// =============================================================

#[test]
fn factory_defaults_match_toolbar_shapes() {
    let p = Point::new(10.0, 20.0);

    let rect = create_specific_shape(Tool::Rect, p).unwrap();
    assert_eq!((rect.left, rect.top, rect.width, rect.height), (10.0, 20.0, 100.0, 100.0));
    assert_eq!(rect.fill, "#aabbcc");

    let circle = create_specific_shape(Tool::Circle, p).unwrap();
    assert_eq!(circle.radius, Some(100.0));

    let tri = create_specific_shape(Tool::Triangle, p).unwrap();
    assert_eq!(tri.kind, ShapeKind::Triangle);
    assert_eq!((tri.width, tri.height), (100.0, 100.0));

    let line = create_specific_shape(Tool::Line, p).unwrap();
    assert_eq!(line.stroke_width, 2.0);
    assert_eq!(line.x2, Some(110.0));
    assert_eq!(line.y2, Some(120.0));

    let text = create_specific_shape(Tool::Text, p).unwrap();
    assert_eq!(text.text.as_deref(), Some("Tap to Type"));
    assert_eq!(text.font_family.as_deref(), Some("Helvetica"));
    assert_eq!(text.font_size, Some(36.0));
    assert_eq!(text.font_weight, Some(FontWeight::Named("400".into())));
}

#[test]
fn factory_skips_non_drawing_tools() {
    for tool in [Tool::Select, Tool::Freeform, Tool::Image] {
        assert!(create_specific_shape(tool, Point::default()).is_none());
    }
}

#[test]
fn factory_ids_are_unique() {
    let a = create_specific_shape(Tool::Rect, Point::default()).unwrap();
    let b = create_specific_shape(Tool::Rect, Point::default()).unwrap();
    assert_ne!(a.object_id, b.object_id);
}

#[test]
fn image_shape_is_square() {
    let img = create_image_shape("data:image/png;base64,AA==".into(), Point::new(1.0, 2.0));
    assert_eq!((img.width, img.height), (200.0, 200.0));
    assert_eq!(img.kind, ShapeKind::Image);
}

#[test]
fn path_needs_two_points() {
    assert!(create_path_shape(vec![Point::default()]).is_none());
}

// =============================================================
// Store
// =============================================================

#[test]
fn sorted_orders_by_z_then_id() {
    let mut store = ShapeStore::new();
    store.insert(rect_at("b", 1));
    store.insert(rect_at("a", 1));
    store.insert(rect_at("c", 0));
    let ids: Vec<&str> = store.sorted().iter().map(|s| s.object_id.as_str()).collect();
    assert_eq!(ids, ["c", "a", "b"]);
    assert_eq!(store.max_z(), 1);
    assert_eq!(store.min_z(), 0);
}

#[test]
fn load_snapshot_replaces_and_skips_invalid() {
    let mut store = ShapeStore::new();
    store.insert(rect_at("old", 0));

    let snapshot = json!({
        "r": { "type": "rect", "objectId": "r" },
        "bad": { "type": 42 },
    });
    let loaded = store.load_snapshot(snapshot.as_object().unwrap());

    assert_eq!(loaded, 1);
    assert!(store.get("old").is_none());
    assert!(store.contains("r"));
}

#[test]
fn empty_store_z_defaults_to_zero() {
    let store = ShapeStore::new();
    assert_eq!(store.max_z(), 0);
    assert!(store.is_empty());
}
