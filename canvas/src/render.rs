//! Rendering: draws the board and the live overlay to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It receives read-only views of engine and overlay state and produces
//! pixels; it does not mutate any application state.
//!
//! Every shape is drawn in its own frame: translated to the center of its
//! bounds and rotated by its angle, so the per-kind renderers only deal with
//! a box centered on the origin.
//!
//! All fallible `Canvas2D` calls propagate errors via `Result<(), JsValue>`.
//! The top-level caller ([`crate::engine::Engine::render`]) handles the result.

use std::f64::consts::TAU;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use crate::consts::{
    DEFAULT_FONT_FAMILY, DEFAULT_FONT_SIZE, HANDLE_RADIUS_PX, REACTION_TTL_MS, TEXT_LINE_HEIGHT,
};
use crate::geom::{Bounds, Point};
use crate::hit::Corner;
use crate::live::{CursorMode, LiveOverlay, cursor_color};
use crate::shape::{ObjectId, Shape, ShapeKind, ShapeStore};

/// Selection outline color.
const SELECTION_COLOR: &str = "#1E90FF";

/// Selection dash segment length in pixels.
const SELECTION_DASH_PX: f64 = 4.0;

/// How far a reaction drifts upward over its lifetime, in pixels.
const REACTION_RISE_PX: f64 = 120.0;

const REACTION_FONT: &str = "32px sans-serif";
const LABEL_FONT: &str = "12px sans-serif";
const CHAT_FONT: &str = "14px sans-serif";

/// CSS size of the drawing surface and the device pixel ratio.
#[derive(Debug, Clone, Copy)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub dpr: f64,
}

/// Draw the board: every shape in z-order, then the selection frame.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails (e.g. invalid context state).
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    store: &ShapeStore,
    selection: &[ObjectId],
    viewport: Viewport,
) -> Result<(), JsValue> {
    ctx.set_transform(viewport.dpr, 0.0, 0.0, viewport.dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport.width, viewport.height);

    for shape in store.sorted() {
        draw_shape(ctx, shape)?;
    }

    let show_handles = selection.len() == 1;
    for id in selection {
        if let Some(shape) = store.get(id) {
            draw_selection(ctx, shape, show_handles)?;
        }
    }
    Ok(())
}

/// Draw the freehand stroke still under the pointer.
///
/// # Errors
///
/// Returns `Err` if a `Canvas2D` call fails.
pub fn draw_stroke_preview(
    ctx: &CanvasRenderingContext2d,
    points: &[Point],
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_stroke_style_str(crate::consts::DEFAULT_COLOR);
    ctx.set_line_width(1.0);
    trace_polyline(ctx, points, Point::default());
    ctx.stroke();
    ctx.restore();
    Ok(())
}

// =============================================================
// Shapes
// =============================================================

fn draw_shape(ctx: &CanvasRenderingContext2d, shape: &Shape) -> Result<(), JsValue> {
    let b = shape.bounds();
    let center = b.center();

    ctx.save();
    ctx.translate(center.x, center.y)?;
    ctx.rotate(shape.angle.to_radians())?;
    ctx.set_fill_style_str(&shape.fill);
    ctx.set_stroke_style_str(&shape.stroke);
    ctx.set_line_width(shape.stroke_width);

    let (hw, hh) = (b.width / 2.0, b.height / 2.0);
    match shape.kind {
        ShapeKind::Rect => {
            ctx.fill_rect(-hw, -hh, b.width, b.height);
            ctx.stroke_rect(-hw, -hh, b.width, b.height);
        }
        ShapeKind::Circle => {
            ctx.begin_path();
            ctx.ellipse(0.0, 0.0, hw, hh, 0.0, 0.0, TAU)?;
            ctx.fill();
            ctx.stroke();
        }
        ShapeKind::Triangle => {
            ctx.begin_path();
            ctx.move_to(0.0, -hh);
            ctx.line_to(hw, hh);
            ctx.line_to(-hw, hh);
            ctx.close_path();
            ctx.fill();
            ctx.stroke();
        }
        ShapeKind::Line => {
            if let Some((a, z)) = shape.endpoints() {
                ctx.begin_path();
                ctx.move_to(a.x - center.x, a.y - center.y);
                ctx.line_to(z.x - center.x, z.y - center.y);
                ctx.stroke();
            }
        }
        ShapeKind::Path => {
            if let Some(points) = shape.path.as_deref() {
                trace_polyline(ctx, points, center);
                ctx.stroke();
            }
        }
        ShapeKind::Text => draw_text(ctx, shape, &b)?,
        ShapeKind::Image => draw_image_placeholder(ctx, &b)?,
    }

    ctx.restore();
    Ok(())
}

fn draw_text(ctx: &CanvasRenderingContext2d, shape: &Shape, b: &Bounds) -> Result<(), JsValue> {
    let Some(text) = shape.text.as_deref() else {
        return Ok(());
    };
    let size = shape.font_size.unwrap_or(DEFAULT_FONT_SIZE);
    let family = shape.font_family.as_deref().unwrap_or(DEFAULT_FONT_FAMILY);
    let weight = shape.font_weight.as_ref().map_or_else(|| "normal".to_owned(), |w| w.css());

    ctx.translate(-b.width / 2.0, -b.height / 2.0)?;
    ctx.scale(shape.scale_x, shape.scale_y)?;
    ctx.set_font(&format!("{weight} {size}px {family}"));
    ctx.set_text_baseline("top");
    ctx.set_text_align("left");

    let mut y = 0.0;
    for line in text.lines() {
        ctx.fill_text(line, 0.0, y)?;
        y += size * TEXT_LINE_HEIGHT;
    }
    Ok(())
}

/// Images render as a labeled frame; decoding the data URL is left to the host.
fn draw_image_placeholder(ctx: &CanvasRenderingContext2d, b: &Bounds) -> Result<(), JsValue> {
    let (hw, hh) = (b.width / 2.0, b.height / 2.0);
    ctx.set_fill_style_str("rgba(60, 64, 70, 0.08)");
    ctx.fill_rect(-hw, -hh, b.width, b.height);
    ctx.set_stroke_style_str("#8a8f98");
    ctx.set_line_width(1.0);
    ctx.stroke_rect(-hw, -hh, b.width, b.height);

    ctx.begin_path();
    ctx.move_to(-hw, -hh);
    ctx.line_to(hw, hh);
    ctx.move_to(hw, -hh);
    ctx.line_to(-hw, hh);
    ctx.stroke();
    Ok(())
}

fn trace_polyline(ctx: &CanvasRenderingContext2d, points: &[Point], origin: Point) {
    ctx.begin_path();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        ctx.move_to(first.x - origin.x, first.y - origin.y);
    }
    for p in iter {
        ctx.line_to(p.x - origin.x, p.y - origin.y);
    }
}

// =============================================================
// Selection
// =============================================================

fn draw_selection(
    ctx: &CanvasRenderingContext2d,
    shape: &Shape,
    show_handles: bool,
) -> Result<(), JsValue> {
    let b = shape.bounds();
    let center = b.center();

    ctx.save();
    ctx.translate(center.x, center.y)?;
    ctx.rotate(shape.angle.to_radians())?;

    ctx.set_stroke_style_str(SELECTION_COLOR);
    ctx.set_line_width(1.0);
    let dash = js_sys::Array::new();
    dash.push(&SELECTION_DASH_PX.into());
    dash.push(&SELECTION_DASH_PX.into());
    ctx.set_line_dash(&dash)?;
    ctx.stroke_rect(-b.width / 2.0, -b.height / 2.0, b.width, b.height);
    ctx.set_line_dash(&js_sys::Array::new())?;

    let scalable = !matches!(shape.kind, ShapeKind::Line | ShapeKind::Path);
    if show_handles && scalable {
        let local = Bounds {
            left: -b.width / 2.0,
            top: -b.height / 2.0,
            width: b.width,
            height: b.height,
        };
        let size = HANDLE_RADIUS_PX;
        ctx.set_fill_style_str("#ffffff");
        for corner in Corner::ALL {
            let p = corner.of(&local);
            ctx.fill_rect(p.x - size / 2.0, p.y - size / 2.0, size, size);
            ctx.stroke_rect(p.x - size / 2.0, p.y - size / 2.0, size, size);
        }
    }

    ctx.restore();
    Ok(())
}

// =============================================================
// Live overlay
// =============================================================

/// Draw peer cursors, the local chat bubble, and reactions on top of the board.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails.
pub fn draw_overlay(
    ctx: &CanvasRenderingContext2d,
    overlay: &LiveOverlay,
    now: f64,
) -> Result<(), JsValue> {
    for peer in overlay.peers() {
        if let Some(cursor) = peer.cursor {
            let color = cursor_color(peer.connection_id);
            draw_cursor(ctx, cursor, color, &peer.name)?;
            if let Some(message) = peer.message.as_deref().filter(|m| !m.is_empty()) {
                draw_bubble(ctx, cursor, color, message)?;
            }
        }
    }

    if let (CursorMode::Chat { message, previous_message }, Some(cursor)) =
        (&overlay.mode, overlay.cursor)
    {
        let shown = if message.is_empty() {
            previous_message.as_deref().unwrap_or("Say something…")
        } else {
            message.as_str()
        };
        draw_bubble(ctx, cursor, "#000000", shown)?;
    }

    ctx.save();
    ctx.set_font(REACTION_FONT);
    ctx.set_text_align("center");
    ctx.set_text_baseline("middle");
    for reaction in &overlay.reactions {
        let age = ((now - reaction.timestamp) / REACTION_TTL_MS).clamp(0.0, 1.0);
        ctx.set_global_alpha(1.0 - age);
        let y = reaction.point.y - age * REACTION_RISE_PX;
        ctx.fill_text(&reaction.value, reaction.point.x, y)?;
    }
    ctx.restore();
    Ok(())
}

fn draw_cursor(
    ctx: &CanvasRenderingContext2d,
    at: Point,
    color: &str,
    name: &str,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.translate(at.x, at.y)?;
    ctx.set_fill_style_str(color);
    ctx.begin_path();
    ctx.move_to(0.0, 0.0);
    ctx.line_to(0.0, 16.0);
    ctx.line_to(4.5, 12.0);
    ctx.line_to(11.0, 12.0);
    ctx.close_path();
    ctx.fill();

    ctx.set_font(LABEL_FONT);
    ctx.set_text_baseline("top");
    ctx.fill_text(name, 12.0, 14.0)?;
    ctx.restore();
    Ok(())
}

fn draw_bubble(
    ctx: &CanvasRenderingContext2d,
    at: Point,
    color: &str,
    text: &str,
) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_font(CHAT_FONT);
    let width = ctx.measure_text(text)?.width() + 16.0;
    let (x, y) = (at.x + 10.0, at.y + 32.0);

    ctx.set_fill_style_str(color);
    ctx.fill_rect(x, y, width, 24.0);
    ctx.set_fill_style_str("#ffffff");
    ctx.set_text_baseline("middle");
    ctx.fill_text(text, x + 8.0, y + 12.0)?;
    ctx.restore();
    Ok(())
}
