//! Canvas engine: turns toolbar, pointer, and keyboard events into local
//! shape edits plus the `Action`s the host must forward to the room.
//!
//! ARCHITECTURE
//! ============
//! `EngineCore` owns every piece of editor state that does not need the DOM:
//! the local shape store, selection, clipboard, active tool, and the gesture
//! in progress. `Engine` wraps it together with the `<canvas>` element and
//! adds rendering. Tests drive `EngineCore` directly.
//!
//! Local edits are applied immediately and reported as `SyncShape` /
//! `DeleteShape` / `ResetStorage` actions; the host turns those into
//! `storage:*` frames. Remote changes come back in through the `apply_remote_*`
//! methods. A drawing gesture is bracketed by `HistoryPause` and
//! `HistoryResume` so the whole drag undoes in one step.
//!
//! Unknown ids never error: handlers for a shape that has vanished (deleted by
//! a peer mid-gesture, say) simply return no actions.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use serde_json::{Map, Value};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::consts::{MIN_SCALED_SIZE, PASTE_OFFSET};
use crate::geom::{Bounds, Point};
use crate::hit::{self, Corner};
use crate::input::{InputState, Key, Modifiers, NavElement, Tool};
use crate::live::LiveOverlay;
use crate::panels::{Attribute, Attributes};
use crate::render::{self, Viewport};
use crate::shape::{
    FontWeight, ObjectId, Shape, ShapeKind, ShapeStore, create_image_shape, create_path_shape,
    create_specific_shape, new_object_id,
};

/// Actions returned from handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Write the shape into the shared map under `id`.
    SyncShape { id: ObjectId, shape: Shape },
    /// Remove `id` from the shared map.
    DeleteShape { id: ObjectId },
    /// Clear the shared map.
    ResetStorage,
    Undo,
    Redo,
    HistoryPause,
    HistoryResume,
    /// The toolbar should highlight this entry.
    SetActiveElement(NavElement),
    AttributesChanged(Attributes),
    /// Open the host's file picker.
    RequestImageUpload,
    PreventDefault,
    RenderNeeded,
}

/// Which end of the stack `bring_element` moves a shape to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Front,
    Back,
}

/// Core engine state. Everything except the canvas element.
#[derive(Debug)]
pub struct EngineCore {
    pub store: ShapeStore,
    pub tool: Tool,
    pub active_element: NavElement,
    pub input: InputState,
    /// Selected shape ids, in selection order.
    pub selection: Vec<ObjectId>,
    /// The shape the attribute editor targets.
    pub active_object: Option<ObjectId>,
    pub clipboard: Vec<Shape>,
    /// When false the attribute editor is not refreshed on selection.
    pub editing_enabled: bool,
    pub attributes: Attributes,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self {
            store: ShapeStore::new(),
            tool: Tool::Select,
            active_element: NavElement::Select,
            input: InputState::Idle,
            selection: Vec::new(),
            active_object: None,
            clipboard: Vec::new(),
            editing_enabled: true,
            attributes: Attributes::default(),
            viewport_width: 0.0,
            viewport_height: 0.0,
        }
    }
}

impl EngineCore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================
    // Toolbar
    // =========================================================

    pub fn handle_active_element(&mut self, element: NavElement) -> Vec<Action> {
        self.active_element = element;
        match element {
            NavElement::Reset => {
                self.store.clear();
                self.clear_selection();
                self.input = InputState::Idle;
                let mut actions = vec![Action::ResetStorage];
                actions.extend(self.back_to_select());
                actions.push(Action::RenderNeeded);
                actions
            }
            NavElement::Delete => {
                let mut actions = self.delete_selected();
                actions.extend(self.back_to_select());
                actions
            }
            NavElement::Image => {
                self.tool = Tool::Image;
                self.input = InputState::Idle;
                vec![Action::SetActiveElement(element), Action::RequestImageUpload]
            }
            other => {
                self.tool = other.tool().unwrap_or_default();
                self.input = InputState::Idle;
                vec![Action::SetActiveElement(other)]
            }
        }
    }

    fn back_to_select(&mut self) -> Vec<Action> {
        self.tool = Tool::Select;
        self.active_element = NavElement::Select;
        vec![Action::SetActiveElement(NavElement::Select)]
    }

    // =========================================================
    // Pointer
    // =========================================================

    pub fn on_pointer_down(&mut self, point: Point, modifiers: Modifiers) -> Vec<Action> {
        if self.tool == Tool::Freeform {
            self.clear_selection();
            self.input = InputState::FreeDrawing { points: vec![point] };
            return vec![Action::HistoryPause, Action::RenderNeeded];
        }

        if let Some(actions) = self.try_begin_scale(point) {
            return actions;
        }

        let target = hit::find_target(&self.store, point)
            .filter(|id| self.store.get(id).is_some_and(|s| self.tool.selects(s.kind)));
        if let Some(id) = target {
            if modifiers.shift {
                if !self.selection.contains(&id) {
                    self.selection.push(id.clone());
                }
            } else if !self.selection.contains(&id) {
                self.selection = vec![id.clone()];
            }
            self.active_object = Some(id.clone());
            self.input = InputState::Dragging { id, last: point, moved: false };
            let mut actions = self.on_selection_created(self.selection.clone());
            actions.push(Action::RenderNeeded);
            return actions;
        }

        if let Some(mut shape) = create_specific_shape(self.tool, point) {
            shape.z_index = self.store.max_z() + 1;
            let id = shape.object_id.clone();
            self.store.insert(shape);
            self.clear_selection();
            self.input = InputState::Drawing { id };
            return vec![Action::HistoryPause, Action::RenderNeeded];
        }

        if self.tool == Tool::Select && !self.selection.is_empty() {
            self.clear_selection();
            return vec![Action::RenderNeeded];
        }
        Vec::new()
    }

    fn try_begin_scale(&mut self, point: Point) -> Option<Vec<Action>> {
        let [id] = self.selection.as_slice() else {
            return None;
        };
        let shape = self.store.get(id)?;
        let corner = hit::corner_at(shape, point)?;
        let original = shape.bounds();
        self.input = InputState::Scaling {
            id: id.clone(),
            anchor: corner.opposite().of(&original),
            original,
            scale: (shape.scale_x, shape.scale_y),
            corner,
        };
        Some(vec![Action::HistoryPause])
    }

    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        match &mut self.input {
            InputState::Idle => Vec::new(),
            InputState::FreeDrawing { points } => {
                points.push(point);
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { id } => {
                let id = id.clone();
                let Some(shape) = self.store.get_mut(&id) else {
                    return Vec::new();
                };
                resize_provisional(shape, point);
                vec![Action::SyncShape { id, shape: shape.clone() }, Action::RenderNeeded]
            }
            InputState::Dragging { id: _, last, moved } => {
                let (dx, dy) = (point.x - last.x, point.y - last.y);
                *last = point;
                *moved = true;
                for id in &self.selection {
                    if let Some(shape) = self.store.get_mut(id) {
                        shape.translate(dx, dy);
                    }
                }
                vec![Action::RenderNeeded]
            }
            InputState::Scaling { id, anchor, original, scale, corner } => {
                let (id, anchor, original, scale, corner) =
                    (id.clone(), *anchor, *original, *scale, *corner);
                let Some(shape) = self.store.get_mut(&id) else {
                    return Vec::new();
                };
                apply_scale(shape, anchor, original, scale, corner, point);
                let mut actions = Vec::new();
                if self.editing_enabled {
                    let (w, h) = shape.scaled_size();
                    self.attributes.width = format!("{w:.0}");
                    self.attributes.height = format!("{h:.0}");
                    actions.push(Action::AttributesChanged(self.attributes.clone()));
                }
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    pub fn on_pointer_up(&mut self, point: Point) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle => Vec::new(),
            InputState::FreeDrawing { mut points } => {
                if points.last() != Some(&point) {
                    points.push(point);
                }
                let mut actions = Vec::new();
                if let Some(mut path) = create_path_shape(points) {
                    path.z_index = self.store.max_z() + 1;
                    let id = path.object_id.clone();
                    self.store.insert(path.clone());
                    actions.push(Action::SyncShape { id, shape: path });
                }
                actions.extend([Action::HistoryResume, Action::RenderNeeded]);
                actions
            }
            InputState::Drawing { id } => {
                let mut actions = self.on_object_modified(&id);
                actions.push(Action::HistoryResume);
                actions.extend(self.back_to_select());
                actions.push(Action::RenderNeeded);
                actions
            }
            InputState::Dragging { moved, .. } => {
                if !moved {
                    return Vec::new();
                }
                let ids = self.selection.clone();
                let mut actions = vec![Action::HistoryPause];
                for id in &ids {
                    actions.extend(self.on_object_modified(id));
                }
                actions.push(Action::HistoryResume);
                actions
            }
            InputState::Scaling { id, .. } => {
                let mut actions = self.on_object_modified(&id);
                actions.push(Action::HistoryResume);
                actions
            }
        }
    }

    // =========================================================
    // Object events
    // =========================================================

    /// Sync a locally modified shape. Nothing happens for unknown ids.
    pub fn on_object_modified(&mut self, id: &str) -> Vec<Action> {
        match self.store.get(id) {
            Some(shape) => vec![Action::SyncShape { id: id.to_owned(), shape: shape.clone() }],
            None => Vec::new(),
        }
    }

    /// Selection changed; refresh the attribute editor for a single shape.
    pub fn on_selection_created(&mut self, ids: Vec<ObjectId>) -> Vec<Action> {
        self.selection = ids;
        if !self.editing_enabled {
            return Vec::new();
        }
        let [id] = self.selection.as_slice() else {
            return Vec::new();
        };
        let Some(shape) = self.store.get(id) else {
            return Vec::new();
        };
        self.active_object = Some(id.clone());
        self.attributes = Attributes::from_shape(shape);
        vec![Action::AttributesChanged(self.attributes.clone())]
    }

    fn clear_selection(&mut self) {
        self.selection.clear();
        self.active_object = None;
    }

    // =========================================================
    // Keyboard
    // =========================================================

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            if key.is("c") {
                self.copy_selected();
                return Vec::new();
            }
            if key.is("v") {
                return self.paste();
            }
            if key.is("x") {
                self.copy_selected();
                return self.delete_selected();
            }
            if key.is("z") {
                return vec![Action::Undo];
            }
            if key.is("y") {
                return vec![Action::Redo];
            }
        }
        match key.as_str() {
            "Delete" | "Backspace" => self.delete_selected(),
            "/" if !modifiers.shift => vec![Action::PreventDefault],
            _ => Vec::new(),
        }
    }

    fn copy_selected(&mut self) {
        let copied: Vec<Shape> = self
            .selection
            .iter()
            .filter_map(|id| self.store.get(id).cloned())
            .collect();
        if !copied.is_empty() {
            self.clipboard = copied;
        }
    }

    fn paste(&mut self) -> Vec<Action> {
        if self.clipboard.is_empty() {
            return Vec::new();
        }
        let mut actions = vec![Action::HistoryPause];
        let mut pasted = Vec::with_capacity(self.clipboard.len());
        let mut z = self.store.max_z();
        for original in &self.clipboard {
            let mut copy = original.clone();
            copy.object_id = new_object_id();
            copy.translate(PASTE_OFFSET, PASTE_OFFSET);
            z += 1;
            copy.z_index = z;
            pasted.push(copy.object_id.clone());
            actions.push(Action::SyncShape { id: copy.object_id.clone(), shape: copy.clone() });
            self.store.insert(copy);
        }
        self.selection = pasted;
        self.active_object = None;
        actions.extend([Action::HistoryResume, Action::RenderNeeded]);
        actions
    }

    /// Remove every selected shape, one `DeleteShape` per id.
    pub fn delete_selected(&mut self) -> Vec<Action> {
        let mut actions: Vec<Action> = std::mem::take(&mut self.selection)
            .into_iter()
            .filter(|id| self.store.remove(id).is_some())
            .map(|id| Action::DeleteShape { id })
            .collect();
        self.active_object = None;
        if !actions.is_empty() {
            actions.push(Action::RenderNeeded);
        }
        actions
    }

    // =========================================================
    // Attribute editor
    // =========================================================

    /// Edit the active shape from the right sidebar.
    ///
    /// Width and height reset the matching scale to 1. Values that don't
    /// parse, or that equal the current value, produce no actions.
    pub fn modify_shape(&mut self, attribute: Attribute, value: &str) -> Vec<Action> {
        let Some(id) = self.active_object.clone() else {
            return Vec::new();
        };
        let Some(shape) = self.store.get_mut(&id) else {
            return Vec::new();
        };
        let changed = match attribute {
            Attribute::Width => parse_size(value).is_some_and(|w| {
                shape.scale_x = 1.0;
                shape.width = w;
                if shape.kind == ShapeKind::Circle {
                    shape.radius = Some(w / 2.0);
                }
                true
            }),
            Attribute::Height => parse_size(value).is_some_and(|h| {
                shape.scale_y = 1.0;
                shape.height = h;
                true
            }),
            Attribute::FontSize => parse_size(value).is_some_and(|size| {
                if shape.font_size == Some(size) {
                    return false;
                }
                shape.set_font_size(size);
                true
            }),
            Attribute::FontFamily => replace_if_changed(&mut shape.font_family, value),
            Attribute::FontWeight => {
                let weight = FontWeight::Named(value.to_owned());
                if shape.font_weight.as_ref().is_some_and(|w| w.css() == value) {
                    false
                } else {
                    shape.font_weight = Some(weight);
                    true
                }
            }
            Attribute::Fill => replace_string_if_changed(&mut shape.fill, value),
            Attribute::Stroke => replace_string_if_changed(&mut shape.stroke, value),
        };
        if !changed {
            return Vec::new();
        }
        self.attributes.set(attribute, value);
        vec![Action::SyncShape { id, shape: shape.clone() }, Action::RenderNeeded]
    }

    /// Move the active shape to the top or bottom of the stack.
    pub fn bring_element(&mut self, layer: Layer) -> Vec<Action> {
        let Some(id) = self.active_object.clone() else {
            return Vec::new();
        };
        let z = match layer {
            Layer::Front => self.store.max_z() + 1,
            Layer::Back => self.store.min_z() - 1,
        };
        let Some(shape) = self.store.get_mut(&id) else {
            return Vec::new();
        };
        shape.z_index = z;
        vec![Action::SyncShape { id, shape: shape.clone() }, Action::RenderNeeded]
    }

    /// Place an uploaded image.
    pub fn upload_image(&mut self, src: String, at: Point) -> Vec<Action> {
        let mut shape = create_image_shape(src, at);
        shape.z_index = self.store.max_z() + 1;
        let id = shape.object_id.clone();
        self.store.insert(shape.clone());
        let mut actions = vec![Action::SyncShape { id, shape }];
        actions.extend(self.back_to_select());
        actions.push(Action::RenderNeeded);
        actions
    }

    /// Commit text from the host's text editor.
    pub fn set_text(&mut self, id: &str, text: String) -> Vec<Action> {
        let Some(shape) = self.store.get_mut(id) else {
            return Vec::new();
        };
        shape.set_text(text);
        vec![Action::SyncShape { id: id.to_owned(), shape: shape.clone() }, Action::RenderNeeded]
    }

    // =========================================================
    // Remote changes
    // =========================================================

    /// Hydrate from a `storage:get` or join snapshot.
    pub fn load_snapshot(&mut self, map: &Map<String, Value>) -> Vec<Action> {
        self.store.load_snapshot(map);
        self.retain_live_selection();
        vec![Action::RenderNeeded]
    }

    /// A peer (or the server echo of our own write) set a key.
    pub fn apply_remote_set(&mut self, id: &str, value: &Value) -> Vec<Action> {
        match Shape::from_entry(id, value) {
            Ok(shape) => {
                self.store.insert(shape);
                vec![Action::RenderNeeded]
            }
            Err(_) => Vec::new(),
        }
    }

    pub fn apply_remote_delete(&mut self, id: &str) -> Vec<Action> {
        if self.store.remove(id).is_none() {
            return Vec::new();
        }
        self.retain_live_selection();

        // A peer deleted the shape under our gesture; abandon it.
        let paused = matches!(
            &self.input,
            InputState::Drawing { id: d } | InputState::Scaling { id: d, .. } if d == id
        );
        let dragged = matches!(&self.input, InputState::Dragging { id: d, .. } if d == id);
        let mut actions = Vec::new();
        if paused || dragged {
            self.input = InputState::Idle;
        }
        if paused {
            actions.push(Action::HistoryResume);
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    pub fn apply_remote_reset(&mut self) -> Vec<Action> {
        self.store.clear();
        self.clear_selection();

        // Any gesture in flight loses its shape; close the paused batch with it.
        let paused = matches!(
            self.input,
            InputState::Drawing { .. } | InputState::Scaling { .. } | InputState::FreeDrawing { .. }
        );
        self.input = InputState::Idle;
        if paused {
            vec![Action::HistoryResume, Action::RenderNeeded]
        } else {
            vec![Action::RenderNeeded]
        }
    }

    /// Apply an undo/redo patch: `{ "set": {key: shape}, "deleted": [key] }`.
    pub fn apply_remote_patch(&mut self, patch: &Map<String, Value>) -> Vec<Action> {
        let mut changed = false;
        if let Some(set) = patch.get("set").and_then(Value::as_object) {
            for (id, value) in set {
                changed |= !self.apply_remote_set(id, value).is_empty();
            }
        }
        if let Some(deleted) = patch.get("deleted").and_then(Value::as_array) {
            for id in deleted.iter().filter_map(Value::as_str) {
                changed |= !self.apply_remote_delete(id).is_empty();
            }
        }
        if changed { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    fn retain_live_selection(&mut self) {
        let store = &self.store;
        self.selection.retain(|id| store.contains(id));
        if self.active_object.as_ref().is_some_and(|id| !store.contains(id)) {
            self.active_object = None;
        }
    }

    // =========================================================
    // Viewport / queries
    // =========================================================

    pub fn on_resize(&mut self, width: f64, height: f64) -> Vec<Action> {
        self.viewport_width = width;
        self.viewport_height = height;
        vec![Action::RenderNeeded]
    }

    #[must_use]
    pub fn shape(&self, id: &str) -> Option<&Shape> {
        self.store.get(id)
    }

    /// The in-progress freehand stroke, for rendering.
    #[must_use]
    pub fn pending_stroke(&self) -> Option<&[Point]> {
        match &self.input {
            InputState::FreeDrawing { points } => Some(points),
            _ => None,
        }
    }
}

// =============================================================
// Gesture helpers
// =============================================================

/// Resize a shape being drawn so its far corner follows the pointer.
fn resize_provisional(shape: &mut Shape, pointer: Point) {
    match shape.kind {
        ShapeKind::Rect | ShapeKind::Triangle | ShapeKind::Image => {
            shape.width = pointer.x - shape.left;
            shape.height = pointer.y - shape.top;
        }
        ShapeKind::Circle => shape.set_radius((pointer.x - shape.left).abs() / 2.0),
        ShapeKind::Line => shape.set_line_end(pointer),
        ShapeKind::Text | ShapeKind::Path => {}
    }
}

/// Scale `shape` so the dragged corner follows the pointer while the opposite
/// corner stays at `anchor`.
fn apply_scale(
    shape: &mut Shape,
    anchor: Point,
    original: Bounds,
    scale: (f64, f64),
    corner: Corner,
    pointer: Point,
) {
    let target = Bounds::from_corners(anchor, pointer);
    let width = target.width.max(MIN_SCALED_SIZE);
    let height = target.height.max(MIN_SCALED_SIZE);
    if original.width > 0.0 {
        shape.scale_x = scale.0 * width / original.width;
    }
    if original.height > 0.0 {
        shape.scale_y = scale.1 * height / original.height;
    }
    // Keep the anchor fixed: grow away from it on the dragged side.
    shape.left = match corner {
        Corner::TopLeft | Corner::BottomLeft => anchor.x - width,
        Corner::TopRight | Corner::BottomRight => anchor.x,
    };
    shape.top = match corner {
        Corner::TopLeft | Corner::TopRight => anchor.y - height,
        Corner::BottomLeft | Corner::BottomRight => anchor.y,
    };
}

fn parse_size(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().into_iter().find(|v| v.is_finite() && *v > 0.0)
}

fn replace_if_changed(slot: &mut Option<String>, value: &str) -> bool {
    if slot.as_deref() == Some(value) {
        return false;
    }
    *slot = Some(value.to_owned());
    true
}

fn replace_string_if_changed(slot: &mut String, value: &str) -> bool {
    if slot == value {
        return false;
    }
    value.clone_into(slot);
    true
}

// =============================================================
// Engine
// =============================================================

/// The full canvas engine. Wraps `EngineCore` and the live overlay, and owns
/// the browser canvas element.
pub struct Engine {
    canvas: HtmlCanvasElement,
    pub core: EngineCore,
    pub live: LiveOverlay,
}

impl Engine {
    /// Create a new engine bound to the given canvas element.
    #[must_use]
    pub fn new(canvas: HtmlCanvasElement) -> Self {
        Self { canvas, core: EngineCore::new(), live: LiveOverlay::new() }
    }

    pub fn handle_active_element(&mut self, element: NavElement) -> Vec<Action> {
        self.core.handle_active_element(element)
    }

    pub fn on_pointer_down(&mut self, point: Point, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_pointer_down(point, modifiers)
    }

    pub fn on_pointer_move(&mut self, point: Point) -> Vec<Action> {
        self.core.on_pointer_move(point)
    }

    pub fn on_pointer_up(&mut self, point: Point) -> Vec<Action> {
        self.core.on_pointer_up(point)
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        self.core.on_key_down(key, modifiers)
    }

    pub fn load_snapshot(&mut self, map: &Map<String, Value>) -> Vec<Action> {
        self.core.load_snapshot(map)
    }

    pub fn apply_remote_set(&mut self, id: &str, value: &Value) -> Vec<Action> {
        self.core.apply_remote_set(id, value)
    }

    pub fn apply_remote_delete(&mut self, id: &str) -> Vec<Action> {
        self.core.apply_remote_delete(id)
    }

    pub fn apply_remote_reset(&mut self) -> Vec<Action> {
        self.core.apply_remote_reset()
    }

    pub fn apply_remote_patch(&mut self, patch: &Map<String, Value>) -> Vec<Action> {
        self.core.apply_remote_patch(patch)
    }

    /// Resize the backing store to the CSS size times the device pixel ratio.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn on_resize(&mut self, width: f64, height: f64, dpr: f64) -> Vec<Action> {
        self.canvas.set_width((width * dpr).round().max(0.0) as u32);
        self.canvas.set_height((height * dpr).round().max(0.0) as u32);
        self.core.on_resize(width, height)
    }

    /// Draw the board and overlay. `now` ages the reaction markers.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the 2D context is unavailable or a draw call fails.
    pub fn render(&self, dpr: f64, now: f64) -> Result<(), JsValue> {
        let ctx = self
            .canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        let viewport = Viewport {
            width: self.core.viewport_width,
            height: self.core.viewport_height,
            dpr,
        };
        render::draw(&ctx, &self.core.store, &self.core.selection, viewport)?;
        if let Some(points) = self.core.pending_stroke() {
            render::draw_stroke_preview(&ctx, points)?;
        }
        render::draw_overlay(&ctx, &self.live, now)
    }
}
