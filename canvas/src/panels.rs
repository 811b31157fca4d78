//! Derived state for the sidebars and navbar.
//!
//! Nothing here mutates the board. The host renders these views as DOM; the
//! engine only keeps `Attributes` current for the selected shape.

#[cfg(test)]
#[path = "panels_test.rs"]
mod panels_test;

use crate::consts::{DEFAULT_COLOR, MAX_VISIBLE_AVATARS};
use crate::live::cursor_color;
use crate::shape::{ObjectId, Shape, ShapeKind, ShapeStore};

// =============================================================
// Layer list
// =============================================================

/// One row of the left sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerItem {
    pub id: ObjectId,
    pub label: &'static str,
    pub icon: &'static str,
}

/// Every shape, topmost (newest) first.
#[must_use]
pub fn layer_list(store: &ShapeStore) -> Vec<LayerItem> {
    store
        .sorted()
        .into_iter()
        .rev()
        .map(|s| {
            let (label, icon) = shape_info(s.kind);
            LayerItem { id: s.object_id.clone(), label, icon }
        })
        .collect()
}

fn shape_info(kind: ShapeKind) -> (&'static str, &'static str) {
    match kind {
        ShapeKind::Rect => ("Rectangle", "/assets/rectangle.svg"),
        ShapeKind::Circle => ("Circle", "/assets/circle.svg"),
        ShapeKind::Triangle => ("Triangle", "/assets/triangle.svg"),
        ShapeKind::Line => ("Line", "/assets/line.svg"),
        ShapeKind::Text => ("Text", "/assets/text.svg"),
        ShapeKind::Path => ("Free Drawing", "/assets/freeform.svg"),
        ShapeKind::Image => ("Image", "/assets/image.svg"),
    }
}

// =============================================================
// Attribute editor
// =============================================================

/// An editable property in the right sidebar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Width,
    Height,
    FontSize,
    FontFamily,
    FontWeight,
    Fill,
    Stroke,
}

impl Attribute {
    /// Parse the form field name (`"fontSize"`, `"fill"`, ...).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "width" => Self::Width,
            "height" => Self::Height,
            "fontSize" => Self::FontSize,
            "fontFamily" => Self::FontFamily,
            "fontWeight" => Self::FontWeight,
            "fill" => Self::Fill,
            "stroke" => Self::Stroke,
            _ => return None,
        })
    }
}

/// Form values of the right sidebar, as the inputs display them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attributes {
    pub width: String,
    pub height: String,
    pub font_size: String,
    pub font_family: String,
    pub font_weight: String,
    pub fill: String,
    pub stroke: String,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            width: String::new(),
            height: String::new(),
            font_size: String::new(),
            font_family: String::new(),
            font_weight: String::new(),
            fill: DEFAULT_COLOR.to_owned(),
            stroke: DEFAULT_COLOR.to_owned(),
        }
    }
}

impl Attributes {
    /// Values for `shape`, with width and height scaled and rounded.
    #[must_use]
    pub fn from_shape(shape: &Shape) -> Self {
        let (w, h) = shape.scaled_size();
        Self {
            width: format!("{w:.0}"),
            height: format!("{h:.0}"),
            font_size: shape.font_size.map(|s| format!("{s}")).unwrap_or_default(),
            font_family: shape.font_family.clone().unwrap_or_default(),
            font_weight: shape.font_weight.as_ref().map(|w| w.css()).unwrap_or_default(),
            fill: shape.fill.clone(),
            stroke: shape.stroke.clone(),
        }
    }

    /// Overwrite one field.
    pub fn set(&mut self, attribute: Attribute, value: &str) {
        let slot = match attribute {
            Attribute::Width => &mut self.width,
            Attribute::Height => &mut self.height,
            Attribute::FontSize => &mut self.font_size,
            Attribute::FontFamily => &mut self.font_family,
            Attribute::FontWeight => &mut self.font_weight,
            Attribute::Fill => &mut self.fill,
            Attribute::Stroke => &mut self.stroke,
        };
        value.clone_into(slot);
    }
}

// =============================================================
// Active users
// =============================================================

/// A room participant as the navbar sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub connection_id: u32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Avatar {
    pub name: String,
    pub color: &'static str,
}

/// Navbar avatar strip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUsers {
    pub me: Avatar,
    /// At most three peers.
    pub others: Vec<Avatar>,
    /// Peers beyond the visible ones.
    pub overflow: usize,
}

#[must_use]
pub fn active_users(others: &[Participant], me: &Participant) -> ActiveUsers {
    let avatar = |p: &Participant| Avatar {
        name: p.name.clone(),
        color: cursor_color(p.connection_id),
    };
    ActiveUsers {
        me: avatar(me),
        others: others.iter().take(MAX_VISIBLE_AVATARS).map(avatar).collect(),
        overflow: others.len().saturating_sub(MAX_VISIBLE_AVATARS),
    }
}
