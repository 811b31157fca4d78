//! Shape model: the serialized object schema, factories, and the local store.
//!
//! `Shape` is exactly what travels through the shared object map. Its JSON
//! form is camel-cased and keeps any field this crate does not model in
//! `extra`, so shapes written by other clients survive a round trip through
//! this engine untouched.
//!
//! `ShapeStore` is the engine's local mirror of the shared map. Draw order is
//! `(z_index, object_id)`, bottom first.

#[cfg(test)]
#[path = "shape_test.rs"]
mod shape_test;

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::consts::{
    DEFAULT_CIRCLE_RADIUS, DEFAULT_COLOR, DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE,
    DEFAULT_FONT_WEIGHT, DEFAULT_LINE_STROKE_WIDTH, DEFAULT_SHAPE_SIZE, DEFAULT_TEXT, IMAGE_SIZE,
    TEXT_LINE_HEIGHT, TEXT_WIDTH_FACTOR,
};
use crate::geom::{Bounds, Point};
use crate::input::Tool;

/// Key of a shape in the shared object map.
pub type ObjectId = String;

/// Mint a fresh shape id.
#[must_use]
pub fn new_object_id() -> ObjectId {
    Uuid::new_v4().to_string()
}

// =============================================================
// Types
// =============================================================

/// What kind of object a shape is; serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeKind {
    Rect,
    Circle,
    Triangle,
    Line,
    /// Editable text.
    #[serde(rename = "i-text")]
    Text,
    /// Freehand polyline.
    Path,
    Image,
}

/// Font weight as either a CSS keyword (`"bold"`) or a number (`400`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FontWeight {
    Numeric(f64),
    Named(String),
}

impl FontWeight {
    /// CSS value, with whole numbers printed without a fraction.
    #[must_use]
    pub fn css(&self) -> String {
        match self {
            Self::Numeric(n) if n.fract() == 0.0 => format!("{n:.0}"),
            Self::Numeric(n) => n.to_string(),
            Self::Named(s) => s.clone(),
        }
    }
}

/// A canvas object in its shared-map form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    #[serde(rename = "type")]
    pub kind: ShapeKind,
    /// Duplicate of the map key.
    #[serde(default)]
    pub object_id: ObjectId,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub top: f64,
    /// Unscaled width.
    #[serde(default)]
    pub width: f64,
    /// Unscaled height.
    #[serde(default)]
    pub height: f64,
    #[serde(default = "unit")]
    pub scale_x: f64,
    #[serde(default = "unit")]
    pub scale_y: f64,
    /// Rotation in degrees around the bounds center.
    #[serde(default)]
    pub angle: f64,
    #[serde(default = "default_color")]
    pub fill: String,
    #[serde(default = "default_color")]
    pub stroke: String,
    #[serde(default = "unit")]
    pub stroke_width: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<FontWeight>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<Point>>,
    /// Image data URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, deserialize_with = "whole_number")]
    pub z_index: i64,
    /// Fields this crate does not model, preserved verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unit() -> f64 {
    1.0
}

fn default_color() -> String {
    DEFAULT_COLOR.to_owned()
}

/// Accept `3` and `3.0` alike; the binary frame codec carries every JSON
/// number as a double.
#[allow(clippy::cast_possible_truncation)]
fn whole_number<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
    let n = f64::deserialize(d)?;
    Ok(n.round() as i64)
}

// =============================================================
// Shape
// =============================================================

impl Shape {
    /// Blank shape of `kind` at the origin with default styling.
    #[must_use]
    pub fn new(kind: ShapeKind, object_id: ObjectId) -> Self {
        Self {
            kind,
            object_id,
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            angle: 0.0,
            fill: default_color(),
            stroke: default_color(),
            stroke_width: 1.0,
            radius: None,
            x1: None,
            y1: None,
            x2: None,
            y2: None,
            text: None,
            font_size: None,
            font_family: None,
            font_weight: None,
            path: None,
            src: None,
            z_index: 0,
            extra: Map::new(),
        }
    }

    /// Decode a shared-map entry, stamping `object_id` with its key.
    ///
    /// # Errors
    ///
    /// Returns the serde error if `value` is not a valid shape.
    pub fn from_entry(key: &str, value: &Value) -> Result<Self, serde_json::Error> {
        let mut shape = Self::deserialize(value)?;
        key.clone_into(&mut shape.object_id);
        Ok(shape)
    }

    /// Encode for the shared map.
    ///
    /// # Errors
    ///
    /// Returns the serde error if an `extra` value cannot be serialized.
    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Line endpoints, when both are present.
    #[must_use]
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        Some((
            Point::new(self.x1?, self.y1?),
            Point::new(self.x2?, self.y2?),
        ))
    }

    /// Axis-aligned box in canvas space, before rotation.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        match self.kind {
            ShapeKind::Line => {
                if let Some((a, b)) = self.endpoints() {
                    return Bounds::from_corners(a, b);
                }
            }
            ShapeKind::Path => {
                if let Some(b) = self.path.as_deref().and_then(Bounds::enclosing) {
                    return b;
                }
            }
            ShapeKind::Circle => {
                if let Some(r) = self.radius {
                    let origin = Point::new(self.left, self.top);
                    let far = Point::new(
                        self.left + 2.0 * r * self.scale_x,
                        self.top + 2.0 * r * self.scale_y,
                    );
                    return Bounds::from_corners(origin, far);
                }
            }
            _ => {}
        }
        Bounds::from_corners(
            Point::new(self.left, self.top),
            Point::new(
                self.left + self.width * self.scale_x,
                self.top + self.height * self.scale_y,
            ),
        )
    }

    /// Displayed width and height, scale applied.
    #[must_use]
    pub fn scaled_size(&self) -> (f64, f64) {
        let b = self.bounds();
        (b.width, b.height)
    }

    /// Move by `(dx, dy)`, carrying endpoints and path points along.
    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.left += dx;
        self.top += dy;
        for x in [&mut self.x1, &mut self.x2].into_iter().flatten() {
            *x += dx;
        }
        for y in [&mut self.y1, &mut self.y2].into_iter().flatten() {
            *y += dy;
        }
        if let Some(points) = self.path.as_mut() {
            for p in points {
                p.x += dx;
                p.y += dy;
            }
        }
    }

    /// Set the circle radius, keeping the unscaled box in step.
    pub fn set_radius(&mut self, radius: f64) {
        self.radius = Some(radius);
        self.width = radius * 2.0;
        self.height = radius * 2.0;
    }

    /// Move the second line endpoint and refit the box around both ends.
    pub fn set_line_end(&mut self, end: Point) {
        self.x2 = Some(end.x);
        self.y2 = Some(end.y);
        self.refit_box();
    }

    /// Replace the text and resize the box to fit it.
    pub fn set_text(&mut self, text: String) {
        let font_size = self.font_size.unwrap_or(DEFAULT_FONT_SIZE);
        let (w, h) = text_box(&text, font_size);
        self.width = w;
        self.height = h;
        self.text = Some(text);
    }

    /// Font size change for text; the box follows.
    pub fn set_font_size(&mut self, font_size: f64) {
        self.font_size = Some(font_size);
        if let Some(text) = &self.text {
            let (w, h) = text_box(text, font_size);
            self.width = w;
            self.height = h;
        }
    }

    fn refit_box(&mut self) {
        let b = self.bounds();
        self.left = b.left;
        self.top = b.top;
        self.width = b.width;
        self.height = b.height;
        self.scale_x = 1.0;
        self.scale_y = 1.0;
    }
}

/// Estimated box for a block of text.
#[allow(clippy::cast_precision_loss)]
fn text_box(text: &str, font_size: f64) -> (f64, f64) {
    let longest = text.lines().map(|l| l.chars().count()).max().unwrap_or(0);
    let lines = text.lines().count().max(1);
    (
        longest as f64 * font_size * TEXT_WIDTH_FACTOR,
        lines as f64 * font_size * TEXT_LINE_HEIGHT,
    )
}

// =============================================================
// Factories
// =============================================================

/// New shape for a drawing tool, anchored at `pointer`.
///
/// Returns `None` for tools that do not draw on pointer-down (select,
/// freeform, image).
#[must_use]
pub fn create_specific_shape(tool: Tool, pointer: Point) -> Option<Shape> {
    let kind = tool.shape_kind()?;
    let mut shape = Shape::new(kind, new_object_id());
    shape.left = pointer.x;
    shape.top = pointer.y;

    match kind {
        ShapeKind::Rect | ShapeKind::Triangle => {
            shape.width = DEFAULT_SHAPE_SIZE;
            shape.height = DEFAULT_SHAPE_SIZE;
        }
        ShapeKind::Circle => shape.set_radius(DEFAULT_CIRCLE_RADIUS),
        ShapeKind::Line => {
            shape.x1 = Some(pointer.x);
            shape.y1 = Some(pointer.y);
            shape.stroke_width = DEFAULT_LINE_STROKE_WIDTH;
            shape.set_line_end(Point::new(
                pointer.x + DEFAULT_SHAPE_SIZE,
                pointer.y + DEFAULT_SHAPE_SIZE,
            ));
        }
        ShapeKind::Text => {
            shape.font_family = Some(DEFAULT_FONT_FAMILY.to_owned());
            shape.font_weight = Some(FontWeight::Named(DEFAULT_FONT_WEIGHT.to_owned()));
            shape.set_font_size(DEFAULT_FONT_SIZE);
            shape.set_text(DEFAULT_TEXT.to_owned());
        }
        ShapeKind::Path | ShapeKind::Image => return None,
    }
    Some(shape)
}

/// Image shape for an uploaded data URL, fitted to a 200×200 square.
#[must_use]
pub fn create_image_shape(src: String, at: Point) -> Shape {
    let mut shape = Shape::new(ShapeKind::Image, new_object_id());
    shape.left = at.x;
    shape.top = at.y;
    shape.width = IMAGE_SIZE;
    shape.height = IMAGE_SIZE;
    shape.src = Some(src);
    shape
}

/// Freehand path through `points`. `None` for fewer than two points.
#[must_use]
pub fn create_path_shape(points: Vec<Point>) -> Option<Shape> {
    if points.len() < 2 {
        return None;
    }
    let mut shape = Shape::new(ShapeKind::Path, new_object_id());
    shape.fill = "transparent".to_owned();
    shape.path = Some(points);
    shape.refit_box();
    Some(shape)
}

// =============================================================
// Store
// =============================================================

/// Local mirror of the shared object map.
#[derive(Debug, Default)]
pub struct ShapeStore {
    shapes: HashMap<ObjectId, Shape>,
}

impl ShapeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by `object_id`.
    pub fn insert(&mut self, shape: Shape) {
        self.shapes.insert(shape.object_id.clone(), shape);
    }

    pub fn remove(&mut self, id: &str) -> Option<Shape> {
        self.shapes.remove(id)
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Shape> {
        self.shapes.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Shape> {
        self.shapes.get_mut(id)
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.shapes.contains_key(id)
    }

    pub fn clear(&mut self) {
        self.shapes.clear();
    }

    /// Replace everything with the contents of a shared-map snapshot.
    ///
    /// Entries that do not decode as shapes are skipped. Returns how many
    /// shapes were loaded.
    pub fn load_snapshot(&mut self, map: &Map<String, Value>) -> usize {
        self.shapes.clear();
        for (key, value) in map {
            if let Ok(shape) = Shape::from_entry(key, value) {
                self.insert(shape);
            }
        }
        self.shapes.len()
    }

    /// Shapes in draw order, bottom first.
    #[must_use]
    pub fn sorted(&self) -> Vec<&Shape> {
        let mut shapes: Vec<&Shape> = self.shapes.values().collect();
        shapes.sort_by(|a, b| {
            a.z_index
                .cmp(&b.z_index)
                .then_with(|| a.object_id.cmp(&b.object_id))
        });
        shapes
    }

    /// Highest `z_index` in the store, 0 when empty.
    #[must_use]
    pub fn max_z(&self) -> i64 {
        self.shapes.values().map(|s| s.z_index).max().unwrap_or(0)
    }

    /// Lowest `z_index` in the store, 0 when empty.
    #[must_use]
    pub fn min_z(&self) -> i64 {
        self.shapes.values().map(|s| s.z_index).min().unwrap_or(0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }
}
