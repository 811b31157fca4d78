//! Input model: tools, toolbar elements, modifier keys, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `NavElement` is what the toolbar hands the engine. `InputState` is
//! the gesture tracked between pointer-down and pointer-up, carrying what the
//! engine needs to update the shape on move and sync it on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::geom::{Bounds, Point};
use crate::hit::Corner;
use crate::shape::{ObjectId, ShapeKind};

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Rect,
    Circle,
    Triangle,
    Line,
    /// Create a text object.
    Text,
    /// Freehand drawing.
    Freeform,
    /// Waiting on an image upload; pointer-down draws nothing.
    Image,
}

impl Tool {
    /// The shape kind this tool creates on pointer-down, if any.
    #[must_use]
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            Self::Rect => Some(ShapeKind::Rect),
            Self::Circle => Some(ShapeKind::Circle),
            Self::Triangle => Some(ShapeKind::Triangle),
            Self::Line => Some(ShapeKind::Line),
            Self::Text => Some(ShapeKind::Text),
            Self::Select | Self::Freeform | Self::Image => None,
        }
    }

    /// Whether a shape of `kind` is picked (rather than drawn over) under this tool.
    #[must_use]
    pub fn selects(self, kind: ShapeKind) -> bool {
        match self {
            Self::Select => true,
            Self::Image => kind == ShapeKind::Image,
            other => other.shape_kind() == Some(kind),
        }
    }
}

/// A toolbar entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NavElement {
    #[default]
    Select,
    Rectangle,
    Circle,
    Triangle,
    Line,
    Image,
    Freeform,
    Text,
    /// Clear the whole board.
    Reset,
    /// Delete the current selection.
    Delete,
}

impl NavElement {
    pub const ALL: [NavElement; 10] = [
        Self::Select,
        Self::Rectangle,
        Self::Circle,
        Self::Triangle,
        Self::Line,
        Self::Image,
        Self::Freeform,
        Self::Text,
        Self::Reset,
        Self::Delete,
    ];

    /// Wire/DOM value of the entry (`"rectangle"`, `"reset"`, ...).
    #[must_use]
    pub fn value(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::Rectangle => "rectangle",
            Self::Circle => "circle",
            Self::Triangle => "triangle",
            Self::Line => "line",
            Self::Image => "image",
            Self::Freeform => "freeform",
            Self::Text => "text",
            Self::Reset => "reset",
            Self::Delete => "delete",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Select => "Select",
            Self::Rectangle => "Rectangle",
            Self::Circle => "Circle",
            Self::Triangle => "Triangle",
            Self::Line => "Line",
            Self::Image => "Image",
            Self::Freeform => "Free Drawing",
            Self::Text => "Text",
            Self::Reset => "Reset",
            Self::Delete => "Delete",
        }
    }

    #[must_use]
    pub fn from_value(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.value() == value)
    }

    /// The tool this entry activates. Reset and delete are commands, not tools.
    #[must_use]
    pub fn tool(self) -> Option<Tool> {
        match self {
            Self::Select => Some(Tool::Select),
            Self::Rectangle => Some(Tool::Rect),
            Self::Circle => Some(Tool::Circle),
            Self::Triangle => Some(Tool::Triangle),
            Self::Line => Some(Tool::Line),
            Self::Image => Some(Tool::Image),
            Self::Freeform => Some(Tool::Freeform),
            Self::Text => Some(Tool::Text),
            Self::Reset | Self::Delete => None,
        }
    }
}

/// Keyboard modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    /// Shift key is held.
    pub shift: bool,
    /// Ctrl key is held.
    pub ctrl: bool,
    /// Alt / Option key is held.
    pub alt: bool,
    /// Meta / Command key is held.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl on most platforms, Command on macOS.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// A keyboard key as reported by the browser (`"Delete"`, `"Escape"`, `"c"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive match, so shortcuts work with caps lock or shift held.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// The gesture in progress between pointer-down and pointer-up.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// No gesture in progress.
    #[default]
    Idle,
    /// Sizing a freshly created shape.
    Drawing {
        /// Id of the provisional shape.
        id: ObjectId,
    },
    /// Collecting freehand points.
    FreeDrawing {
        points: Vec<Point>,
    },
    /// Moving the selection.
    Dragging {
        /// Shape under the pointer at pointer-down.
        id: ObjectId,
        /// Pointer position at the previous event.
        last: Point,
        /// Set once the pointer actually moves; a plain click syncs nothing.
        moved: bool,
    },
    /// Scaling a shape from one of its corners.
    Scaling {
        id: ObjectId,
        /// Corner that stays put.
        anchor: Point,
        /// Bounds at the start of the gesture.
        original: Bounds,
        /// Scale factors at the start of the gesture.
        scale: (f64, f64),
        /// Which handle is being dragged.
        corner: Corner,
    },
}
