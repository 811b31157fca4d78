//! Hit-testing: which shape, and which scale handle, lies under a point.
//!
//! Rotated shapes are tested by rotating the query point into the shape's
//! unrotated frame (around the bounds center) and then testing against the
//! axis-aligned geometry.

#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::consts::{HANDLE_RADIUS_PX, STROKE_HIT_SLOP_PX};
use crate::geom::{Bounds, Point};
use crate::shape::{ObjectId, Shape, ShapeKind, ShapeStore};

/// A corner scale handle of a shape's bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] =
        [Self::TopLeft, Self::TopRight, Self::BottomLeft, Self::BottomRight];

    /// The diagonally opposite corner; the fixed anchor while scaling.
    #[must_use]
    pub fn opposite(self) -> Self {
        match self {
            Self::TopLeft => Self::BottomRight,
            Self::TopRight => Self::BottomLeft,
            Self::BottomLeft => Self::TopRight,
            Self::BottomRight => Self::TopLeft,
        }
    }

    /// Position of this corner on `b`.
    #[must_use]
    pub fn of(self, b: &Bounds) -> Point {
        match self {
            Self::TopLeft => Point::new(b.left, b.top),
            Self::TopRight => Point::new(b.right(), b.top),
            Self::BottomLeft => Point::new(b.left, b.bottom()),
            Self::BottomRight => Point::new(b.right(), b.bottom()),
        }
    }
}

/// Topmost shape containing `point`, if any.
#[must_use]
pub fn find_target(store: &ShapeStore, point: Point) -> Option<ObjectId> {
    store
        .sorted()
        .into_iter()
        .rev()
        .find(|s| contains(s, point))
        .map(|s| s.object_id.clone())
}

/// Scale handle of `shape` under `point`.
///
/// Lines and paths have no scale handles.
#[must_use]
pub fn corner_at(shape: &Shape, point: Point) -> Option<Corner> {
    if matches!(shape.kind, ShapeKind::Line | ShapeKind::Path) {
        return None;
    }
    let b = shape.bounds();
    let local = to_local(shape, &b, point);
    Corner::ALL
        .into_iter()
        .find(|c| c.of(&b).distance_to(local) <= HANDLE_RADIUS_PX)
}

/// Whether `point` lies on `shape`.
#[must_use]
pub fn contains(shape: &Shape, point: Point) -> bool {
    let b = shape.bounds();
    let p = to_local(shape, &b, point);
    let slop = (shape.stroke_width / 2.0).max(STROKE_HIT_SLOP_PX);

    match shape.kind {
        ShapeKind::Rect | ShapeKind::Text | ShapeKind::Image => b.contains(p),
        ShapeKind::Circle => {
            let c = b.center();
            let (rx, ry) = (b.width / 2.0, b.height / 2.0);
            if rx <= 0.0 || ry <= 0.0 {
                return false;
            }
            let (nx, ny) = ((p.x - c.x) / rx, (p.y - c.y) / ry);
            nx * nx + ny * ny <= 1.0
        }
        ShapeKind::Triangle => {
            let apex = Point::new(b.left + b.width / 2.0, b.top);
            let left = Point::new(b.left, b.bottom());
            let right = Point::new(b.right(), b.bottom());
            in_triangle(p, apex, left, right)
        }
        ShapeKind::Line => shape
            .endpoints()
            .is_some_and(|(a, z)| p.distance_to_segment(a, z) <= slop),
        ShapeKind::Path => shape.path.as_deref().is_some_and(|points| {
            points
                .windows(2)
                .any(|w| p.distance_to_segment(w[0], w[1]) <= slop)
        }),
    }
}

fn to_local(shape: &Shape, b: &Bounds, point: Point) -> Point {
    point.rotate_around(b.center(), -shape.angle)
}

fn in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let cross =
        |o: Point, u: Point, v: Point| (u.x - o.x) * (v.y - o.y) - (u.y - o.y) * (v.x - o.x);
    let d1 = cross(a, b, p);
    let d2 = cross(b, c, p);
    let d3 = cross(c, a, p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
