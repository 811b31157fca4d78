//! Shared constants for the canvas crate.

// ── Shape defaults ──────────────────────────────────────────────

/// Fill and stroke color of every freshly created shape.
pub const DEFAULT_COLOR: &str = "#aabbcc";

/// Width and height of a new rectangle or triangle.
pub const DEFAULT_SHAPE_SIZE: f64 = 100.0;

/// Radius of a new circle.
pub const DEFAULT_CIRCLE_RADIUS: f64 = 100.0;

/// Stroke width of a new line; other shapes default to 1.
pub const DEFAULT_LINE_STROKE_WIDTH: f64 = 2.0;

/// Placeholder content of a new text object.
pub const DEFAULT_TEXT: &str = "Tap to Type";
pub const DEFAULT_FONT_FAMILY: &str = "Helvetica";
pub const DEFAULT_FONT_SIZE: f64 = 36.0;
pub const DEFAULT_FONT_WEIGHT: &str = "400";

/// Rough glyph advance as a fraction of the font size, used to size text
/// boxes without a measuring context.
pub const TEXT_WIDTH_FACTOR: f64 = 0.5;

/// Line height as a multiple of the font size.
pub const TEXT_LINE_HEIGHT: f64 = 1.16;

/// Uploaded images are scaled to fit this square.
pub const IMAGE_SIZE: f64 = 200.0;

/// Offset applied to each pasted copy.
pub const PASTE_OFFSET: f64 = 20.0;

/// Smallest width or height a scale gesture may produce.
pub const MIN_SCALED_SIZE: f64 = 4.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Hit slop in pixels for corner handles.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Minimum distance in pixels at which thin strokes (lines, paths) still hit.
pub const STROKE_HIT_SLOP_PX: f64 = 6.0;

// ── Live overlay ────────────────────────────────────────────────

/// Reactions older than this are pruned.
pub const REACTION_TTL_MS: f64 = 4000.0;

/// How often a held reaction is re-broadcast.
pub const REACTION_BROADCAST_INTERVAL_MS: f64 = 100.0;

/// How often expired reactions are pruned.
pub const REACTION_PRUNE_INTERVAL_MS: f64 = 1000.0;

/// Cursor palette indexed by `connection_id % len`.
pub const CURSOR_COLORS: [&str; 5] = ["#DC2626", "#D97706", "#059669", "#7C3AED", "#DB2777"];

/// Emoji offered by the reaction selector.
pub const REACTION_EMOJIS: [&str; 6] = ["👍", "🔥", "😍", "👀", "😱", "🙁"];

/// Avatars shown in the navbar before collapsing into an overflow count.
pub const MAX_VISIBLE_AVATARS: usize = 3;
