//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the room store and a map of live rooms. Each room owns its
//! shared object map, connected clients with their presence, per-client
//! undo/redo history, and dirty/deleted key sets for debounced persistence.
//!
//! Object mutations go through `RoomState::put_object`/`take_object`/
//! `clear_objects` so the dirty bookkeeping can never drift from the map.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::frame::Frame;
use crate::services::history::History;
use crate::store::{MemoryRoomStore, RoomStore, Shapes};

/// Key the server stamps into every stored shape.
pub const OBJECT_ID_FIELD: &str = "objectId";

// =============================================================================
// PRESENCE
// =============================================================================

/// Pointer position in canvas-container coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
}

/// Ephemeral per-participant state broadcast to peers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Presence {
    pub cursor: Option<Cursor>,
    pub message: Option<String>,
    pub previous_message: Option<String>,
}

/// A connected participant of a room.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Small per-room number; picks the cursor color on clients.
    pub connection_id: u32,
    pub name: String,
    pub color: String,
    pub presence: Presence,
}

// =============================================================================
// ROOM STATE
// =============================================================================

/// Per-room live state. Kept in memory while anyone is connected.
pub struct RoomState {
    /// Shared object map: shape key -> shape JSON.
    pub objects: Shapes,
    /// Connected clients: `client_id` -> sender for outgoing frames.
    pub clients: HashMap<Uuid, mpsc::Sender<Frame>>,
    /// Identity and presence of each connected client.
    pub participants: HashMap<Uuid, Participant>,
    /// Undo/redo stacks, one per connected client.
    pub history: HashMap<Uuid, History>,
    /// Keys written since the last successful flush.
    pub dirty: HashSet<String>,
    /// Keys removed since the last successful flush.
    pub deleted: HashSet<String>,
    /// Next connection id handed out on join.
    pub next_connection_id: u32,
}

impl RoomState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            objects: HashMap::new(),
            clients: HashMap::new(),
            participants: HashMap::new(),
            history: HashMap::new(),
            dirty: HashSet::new(),
            deleted: HashSet::new(),
            next_connection_id: 1,
        }
    }

    /// Write or remove one key, keeping dirty bookkeeping in step.
    /// Returns the previous value.
    pub fn put_object(&mut self, key: &str, value: Option<Value>) -> Option<Value> {
        match value {
            Some(shape) => {
                self.deleted.remove(key);
                self.dirty.insert(key.to_owned());
                self.objects.insert(key.to_owned(), shape)
            }
            None => self.take_object(key),
        }
    }

    /// Remove one key. Returns the removed value, `None` if absent.
    pub fn take_object(&mut self, key: &str) -> Option<Value> {
        let previous = self.objects.remove(key)?;
        self.dirty.remove(key);
        self.deleted.insert(key.to_owned());
        Some(previous)
    }

    /// Remove every key. Returns what was removed.
    pub fn clear_objects(&mut self) -> Shapes {
        let removed = std::mem::take(&mut self.objects);
        for key in removed.keys() {
            self.dirty.remove(key);
            self.deleted.insert(key.clone());
        }
        removed
    }

    /// Whether any mutation is waiting to be persisted.
    #[must_use]
    pub fn has_pending_writes(&self) -> bool {
        !self.dirty.is_empty() || !self.deleted.is_empty()
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// APP STATE
// =============================================================================

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<String, RoomState>>>,
    pub store: Arc<dyn RoomStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(store: Arc<dyn RoomStore>, config: ServerConfig) -> Self {
        Self { rooms: Arc::new(RwLock::new(HashMap::new())), store, config: Arc::new(config) }
    }

    /// State backed by a fresh in-memory store.
    #[must_use]
    pub fn in_memory(config: ServerConfig) -> Self {
        Self::new(Arc::new(MemoryRoomStore::new()), config)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;

    /// Create a test `AppState` with an in-memory store and default config.
    #[must_use]
    pub fn test_app_state() -> AppState {
        AppState::in_memory(ServerConfig::default())
    }

    /// Create a test `AppState` and hand back the concrete memory store.
    #[must_use]
    pub fn test_app_state_with_store() -> (AppState, Arc<MemoryRoomStore>) {
        let store = Arc::new(MemoryRoomStore::new());
        let state = AppState::new(store.clone(), ServerConfig::default());
        (state, store)
    }

    /// Seed an empty live room and return its id.
    pub async fn seed_room(state: &AppState) -> String {
        let room_id = format!("room-{}", Uuid::new_v4());
        state.rooms.write().await.insert(room_id.clone(), RoomState::new());
        room_id
    }

    /// Register a client in a seeded room with a fresh history and presence.
    pub async fn seed_client(state: &AppState, room_id: &str) -> (Uuid, mpsc::Receiver<Frame>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(64);
        let mut rooms = state.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_default();
        let connection_id = room.next_connection_id;
        room.next_connection_id += 1;
        room.clients.insert(client_id, tx);
        room.participants.insert(
            client_id,
            Participant {
                connection_id,
                name: format!("Tester {connection_id}"),
                color: "#DC2626".into(),
                presence: Presence::default(),
            },
        );
        room.history.insert(client_id, History::new(state.config.history_limit));
        (client_id, rx)
    }

    /// A rectangle shape JSON as the canvas engine serializes it.
    #[must_use]
    pub fn rect_shape(id: &str, left: f64) -> Value {
        serde_json::json!({
            "type": "rect",
            "objectId": id,
            "left": left,
            "top": 10.0,
            "width": 100.0,
            "height": 100.0,
            "fill": "#aabbcc",
        })
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
