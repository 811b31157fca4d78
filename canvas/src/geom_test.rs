#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn distance_to_segment_projects_onto_interior() {
    let p = Point::new(5.0, 3.0);
    assert_eq!(p.distance_to_segment(Point::new(0.0, 0.0), Point::new(10.0, 0.0)), 3.0);
}

#[test]
fn distance_to_segment_clamps_to_endpoints() {
    let p = Point::new(13.0, 4.0);
    assert_eq!(p.distance_to_segment(Point::new(0.0, 0.0), Point::new(10.0, 0.0)), 5.0);
}

#[test]
fn distance_to_degenerate_segment_is_point_distance() {
    let a = Point::new(1.0, 1.0);
    assert_eq!(Point::new(4.0, 5.0).distance_to_segment(a, a), 5.0);
}

#[test]
fn rotate_quarter_turn() {
    let p = Point::new(10.0, 0.0).rotate_around(Point::new(0.0, 0.0), 90.0);
    assert!((p.x).abs() < 1e-9);
    assert!((p.y - 10.0).abs() < 1e-9);
}

#[test]
fn from_corners_normalizes_order() {
    let b = Bounds::from_corners(Point::new(10.0, 20.0), Point::new(0.0, 5.0));
    assert_eq!(b, Bounds { left: 0.0, top: 5.0, width: 10.0, height: 15.0 });
    assert_eq!(b.center(), Point::new(5.0, 12.5));
}

#[test]
fn enclosing_covers_all_points() {
    let points = [Point::new(3.0, 1.0), Point::new(-2.0, 4.0), Point::new(0.0, -1.0)];
    let b = Bounds::enclosing(&points);
    assert_eq!(b, Some(Bounds { left: -2.0, top: -1.0, width: 5.0, height: 5.0 }));
    assert_eq!(Bounds::enclosing(&[]), None);
}

#[test]
fn contains_includes_edges() {
    let b = Bounds { left: 0.0, top: 0.0, width: 10.0, height: 10.0 };
    assert!(b.contains(Point::new(10.0, 0.0)));
    assert!(!b.contains(Point::new(10.1, 5.0)));
}
