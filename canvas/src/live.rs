//! Live overlay: cursor chat, reactions, and peer cursors.
//!
//! DESIGN
//! ======
//! The overlay is a small state machine over `CursorMode`, driven by key,
//! pointer, and timer events from the host. Every handler returns the
//! `LiveAction`s the host must carry out (presence updates, reaction
//! broadcasts, undo/redo). Time is always passed in as `now` milliseconds so
//! reaction expiry is deterministic.
//!
//! Reactions are local and short-lived: a held reaction adds one marker per
//! broadcast tick, remote reactions are stamped with the local clock on
//! arrival, and anything older than `REACTION_TTL_MS` is pruned.

#[cfg(test)]
#[path = "live_test.rs"]
mod live_test;

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::consts::{
    CURSOR_COLORS, REACTION_BROADCAST_INTERVAL_MS, REACTION_PRUNE_INTERVAL_MS, REACTION_TTL_MS,
};
use crate::geom::Point;
use crate::input::Key;

// =============================================================
// Types
// =============================================================

/// What the local cursor is doing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CursorMode {
    #[default]
    Hidden,
    /// Typing a chat bubble next to the cursor.
    Chat { message: String, previous_message: Option<String> },
    /// The emoji picker is open.
    ReactionSelector,
    /// A reaction is armed; holding the pointer down emits it.
    Reaction { reaction: String, is_pressed: bool },
}

/// Sparse presence update. `None` leaves a field alone; `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<Option<Point>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Option<String>>,
}

impl PresenceUpdate {
    fn cursor(cursor: Point) -> LiveAction {
        LiveAction::UpdatePresence(Self { cursor: Some(Some(cursor)), message: None })
    }

    fn message(text: impl Into<String>) -> LiveAction {
        LiveAction::UpdatePresence(Self { cursor: None, message: Some(Some(text.into())) })
    }
}

/// Reaction as broadcast to peers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionEvent {
    pub x: f64,
    pub y: f64,
    pub value: String,
}

/// A reaction marker on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Reaction {
    pub point: Point,
    pub value: String,
    /// Local time the marker appeared, in milliseconds.
    pub timestamp: f64,
}

/// A peer's presence as last broadcast by the server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerPresence {
    #[serde(deserialize_with = "connection_number")]
    pub connection_id: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cursor: Option<Point>,
    #[serde(default)]
    pub message: Option<String>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn connection_number<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let n = f64::deserialize(d)?;
    Ok(n.max(0.0).round() as u32)
}

/// Right-click menu entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextMenuItem {
    Chat,
    Reactions,
    Undo,
    Redo,
}

impl ContextMenuItem {
    pub const ALL: [ContextMenuItem; 4] = [Self::Chat, Self::Reactions, Self::Undo, Self::Redo];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Chat => "Chat",
            Self::Reactions => "Reactions",
            Self::Undo => "Undo",
            Self::Redo => "Redo",
        }
    }

    /// Keyboard hint shown next to the entry.
    #[must_use]
    pub fn shortcut(self) -> &'static str {
        match self {
            Self::Chat => "/",
            Self::Reactions => "E",
            Self::Undo => "⌘ + Z",
            Self::Redo => "⌘ + Y",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.name() == name)
    }
}

/// Side effects for the host.
#[derive(Debug, Clone, PartialEq)]
pub enum LiveAction {
    UpdatePresence(PresenceUpdate),
    Broadcast(ReactionEvent),
    PreventDefault,
    Undo,
    Redo,
    RenderNeeded,
}

/// Cursor color for a participant.
#[must_use]
pub fn cursor_color(connection_id: u32) -> &'static str {
    CURSOR_COLORS[connection_id as usize % CURSOR_COLORS.len()]
}

// =============================================================
// Overlay
// =============================================================

#[derive(Debug, Default)]
pub struct LiveOverlay {
    pub mode: CursorMode,
    /// Local cursor, `None` while the pointer is outside the canvas.
    pub cursor: Option<Point>,
    pub reactions: Vec<Reaction>,
    peers: BTreeMap<u32, PeerPresence>,
    last_broadcast: Option<f64>,
    last_prune: Option<f64>,
}

impl LiveOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_chatting(&self) -> bool {
        matches!(self.mode, CursorMode::Chat { .. })
    }

    fn open_chat(&mut self) {
        self.mode = CursorMode::Chat { message: String::new(), previous_message: None };
    }

    // --- Keyboard ---

    pub fn on_key_up(&mut self, key: &Key) -> Vec<LiveAction> {
        // Inside the chat input these are ordinary characters.
        if self.is_chatting() && (key.as_str() == "/" || key.as_str() == "e") {
            return Vec::new();
        }
        match key.as_str() {
            "/" => {
                self.open_chat();
                vec![LiveAction::RenderNeeded]
            }
            "Escape" => {
                self.mode = CursorMode::Hidden;
                vec![PresenceUpdate::message(String::new()), LiveAction::RenderNeeded]
            }
            "e" => {
                self.mode = CursorMode::ReactionSelector;
                vec![LiveAction::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    pub fn on_key_down(&mut self, key: &Key) -> Vec<LiveAction> {
        if key.as_str() == "/" && !self.is_chatting() {
            vec![LiveAction::PreventDefault]
        } else {
            Vec::new()
        }
    }

    // --- Pointer ---

    pub fn on_pointer_move(&mut self, point: Point) -> Vec<LiveAction> {
        // Freeze the cursor while picking an emoji so the picker stays put.
        if self.cursor.is_some() && self.mode == CursorMode::ReactionSelector {
            return Vec::new();
        }
        self.move_cursor(point)
    }

    pub fn on_pointer_leave(&mut self) -> Vec<LiveAction> {
        self.cursor = None;
        vec![LiveAction::UpdatePresence(PresenceUpdate { cursor: Some(None), message: Some(None) })]
    }

    pub fn on_pointer_down(&mut self, point: Point) -> Vec<LiveAction> {
        let actions = self.move_cursor(point);
        if let CursorMode::Reaction { is_pressed, .. } = &mut self.mode {
            *is_pressed = true;
        }
        actions
    }

    pub fn on_pointer_up(&mut self) -> Vec<LiveAction> {
        if let CursorMode::Reaction { is_pressed, .. } = &mut self.mode {
            *is_pressed = false;
        }
        Vec::new()
    }

    fn move_cursor(&mut self, point: Point) -> Vec<LiveAction> {
        self.cursor = Some(point);
        vec![PresenceUpdate::cursor(point)]
    }

    // --- Reactions ---

    pub fn select_reaction(&mut self, emoji: &str) -> Vec<LiveAction> {
        self.mode = CursorMode::Reaction { reaction: emoji.to_owned(), is_pressed: false };
        vec![LiveAction::RenderNeeded]
    }

    /// Emit the held reaction at the cursor.
    pub fn tick_broadcast(&mut self, now: f64) -> Vec<LiveAction> {
        let CursorMode::Reaction { reaction, is_pressed: true } = &self.mode else {
            return Vec::new();
        };
        let Some(cursor) = self.cursor else {
            return Vec::new();
        };
        let value = reaction.clone();
        self.reactions.push(Reaction { point: cursor, value: value.clone(), timestamp: now });
        vec![
            LiveAction::Broadcast(ReactionEvent { x: cursor.x, y: cursor.y, value }),
            LiveAction::RenderNeeded,
        ]
    }

    /// Drop reactions that have been on screen for `REACTION_TTL_MS` or longer.
    pub fn tick_prune(&mut self, now: f64) -> Vec<LiveAction> {
        let before = self.reactions.len();
        self.reactions.retain(|r| r.timestamp > now - REACTION_TTL_MS);
        if self.reactions.len() == before {
            Vec::new()
        } else {
            vec![LiveAction::RenderNeeded]
        }
    }

    /// Run whichever timers are due. For hosts driving the overlay from a
    /// single animation-frame loop instead of two intervals.
    pub fn tick(&mut self, now: f64) -> Vec<LiveAction> {
        let mut actions = Vec::new();
        if self.last_broadcast.is_none_or(|t| now - t >= REACTION_BROADCAST_INTERVAL_MS) {
            self.last_broadcast = Some(now);
            actions.extend(self.tick_broadcast(now));
        }
        if self.last_prune.is_none_or(|t| now - t >= REACTION_PRUNE_INTERVAL_MS) {
            self.last_prune = Some(now);
            actions.extend(self.tick_prune(now));
        }
        actions
    }

    /// A peer's reaction arrived. Malformed events are ignored.
    pub fn on_remote_event(&mut self, event: &Value, now: f64) -> Vec<LiveAction> {
        let Ok(event) = ReactionEvent::deserialize(event) else {
            return Vec::new();
        };
        self.reactions.push(Reaction {
            point: Point::new(event.x, event.y),
            value: event.value,
            timestamp: now,
        });
        vec![LiveAction::RenderNeeded]
    }

    // --- Chat ---

    pub fn on_chat_input(&mut self, text: &str) -> Vec<LiveAction> {
        let CursorMode::Chat { message, .. } = &mut self.mode else {
            return Vec::new();
        };
        text.clone_into(message);
        vec![PresenceUpdate::message(text)]
    }

    pub fn on_chat_key(&mut self, key: &Key) -> Vec<LiveAction> {
        if !self.is_chatting() {
            return Vec::new();
        }
        match key.as_str() {
            "Enter" => {
                if let CursorMode::Chat { message, previous_message } = &mut self.mode {
                    *previous_message = Some(std::mem::take(message));
                }
                vec![LiveAction::RenderNeeded]
            }
            "Escape" => {
                self.mode = CursorMode::Hidden;
                vec![LiveAction::RenderNeeded]
            }
            _ => Vec::new(),
        }
    }

    // --- Context menu ---

    pub fn on_context_menu(&mut self, item: ContextMenuItem) -> Vec<LiveAction> {
        match item {
            ContextMenuItem::Chat => {
                self.open_chat();
                vec![LiveAction::RenderNeeded]
            }
            ContextMenuItem::Reactions => {
                self.mode = CursorMode::ReactionSelector;
                vec![LiveAction::RenderNeeded]
            }
            ContextMenuItem::Undo => vec![LiveAction::Undo],
            ContextMenuItem::Redo => vec![LiveAction::Redo],
        }
    }

    // --- Peers ---

    /// Record a peer's presence view (join broadcast or presence update).
    pub fn on_remote_presence(&mut self, view: &Value) -> Vec<LiveAction> {
        let Ok(peer) = PeerPresence::deserialize(view) else {
            return Vec::new();
        };
        self.peers.insert(peer.connection_id, peer);
        vec![LiveAction::RenderNeeded]
    }

    /// Replace all peers with the `others` list of a join reply.
    pub fn load_peers(&mut self, others: &[Value]) {
        self.peers = others
            .iter()
            .flat_map(|v| PeerPresence::deserialize(v))
            .map(|p| (p.connection_id, p))
            .collect();
    }

    pub fn on_remote_part(&mut self, connection_id: u32) -> Vec<LiveAction> {
        if self.peers.remove(&connection_id).is_some() {
            vec![LiveAction::RenderNeeded]
        } else {
            Vec::new()
        }
    }

    /// Peers ordered by connection id.
    pub fn peers(&self) -> impl Iterator<Item = &PeerPresence> {
        self.peers.values()
    }
}
