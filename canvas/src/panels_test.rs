use super::*;
use crate::geom::Point;
use crate::input::Tool;
use crate::shape::{FontWeight, create_specific_shape};

fn with_z(mut shape: Shape, z: i64) -> Shape {
    shape.z_index = z;
    shape
}

#[test]
fn layer_list_is_newest_first() {
    let mut store = ShapeStore::new();
    let rect = with_z(create_specific_shape(Tool::Rect, Point::default()).unwrap(), 1);
    let text = with_z(create_specific_shape(Tool::Text, Point::default()).unwrap(), 2);
    let text_id = text.object_id.clone();
    store.insert(rect);
    store.insert(text);

    let layers = layer_list(&store);
    assert_eq!(layers.len(), 2);
    assert_eq!(layers[0].id, text_id);
    assert_eq!(layers[0].label, "Text");
    assert_eq!(layers[1].icon, "/assets/rectangle.svg");
}

#[test]
fn attributes_report_scaled_size() {
    let mut shape = create_specific_shape(Tool::Rect, Point::default()).unwrap();
    shape.scale_x = 1.5;
    shape.fill = "#123456".into();
    let attrs = Attributes::from_shape(&shape);

    assert_eq!(attrs.width, "150");
    assert_eq!(attrs.height, "100");
    assert_eq!(attrs.fill, "#123456");
    assert_eq!(attrs.font_size, "");
}

#[test]
fn attributes_include_text_fields() {
    let mut shape = create_specific_shape(Tool::Text, Point::default()).unwrap();
    shape.font_weight = Some(FontWeight::Numeric(700.0));
    let attrs = Attributes::from_shape(&shape);

    assert_eq!(attrs.font_size, "36");
    assert_eq!(attrs.font_family, "Helvetica");
    assert_eq!(attrs.font_weight, "700");
}

#[test]
fn attribute_names_parse() {
    assert_eq!(Attribute::from_name("fontSize"), Some(Attribute::FontSize));
    assert_eq!(Attribute::from_name("opacity"), None);
}

#[test]
fn attributes_set_overwrites_field() {
    let mut attrs = Attributes::default();
    attrs.set(Attribute::Stroke, "#000000");
    assert_eq!(attrs.stroke, "#000000");
    assert_eq!(attrs.fill, "#aabbcc");
}

#[test]
fn active_users_collapse_after_three() {
    let me = Participant { connection_id: 1, name: "Me".into() };
    let others: Vec<Participant> = (2..=6)
        .map(|i| Participant { connection_id: i, name: format!("P{i}") })
        .collect();

    let users = active_users(&others, &me);
    assert_eq!(users.others.len(), 3);
    assert_eq!(users.overflow, 2);
    assert_eq!(users.me.color, "#D97706");
    assert_eq!(users.others[0].name, "P2");
}

#[test]
fn active_users_alone() {
    let me = Participant { connection_id: 0, name: "Solo".into() };
    let users = active_users(&[], &me);
    assert!(users.others.is_empty());
    assert_eq!(users.overflow, 0);
}
