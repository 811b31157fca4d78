//! Room service: join/part, hydration, broadcast, and room listing.
//!
//! DESIGN
//! ======
//! Rooms come into existence on first join and are hydrated from the room
//! store. They stay in memory while any participant is connected. Each
//! participant gets a small connection id (starting at 1) that picks its
//! cursor color on every client.
//!
//! ERROR HANDLING
//! ==============
//! On last-participant part, pending writes are flushed before eviction. If
//! that flush fails, the room is kept in memory with its dirty flags intact
//! so the persistence task can retry instead of losing edits.

use rand::Rng;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::frame::{ErrorCode, Frame};
use crate::services::history::History;
use crate::services::persistence;
use crate::services::presence::{self, PresenceView};
use crate::state::{AppState, Participant, Presence, RoomState};
use crate::store::{Shapes, StoreError};

/// Cursor palette, indexed by `connection_id % len`. Clients use the same table.
pub const COLORS: [&str; 5] = ["#DC2626", "#D97706", "#059669", "#7C3AED", "#DB2777"];

const MAX_ROOM_ID_LEN: usize = 128;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    #[error("invalid room id: {0:?}")]
    InvalidRoomId(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for RoomError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRoomId(_) => "E_INVALID_ROOM_ID",
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::InvalidRoomId(_) => false,
            Self::Store(e) => e.retryable(),
        }
    }
}

/// Everything a participant needs to render the room after joining.
#[derive(Debug, Clone)]
pub struct JoinSnapshot {
    pub objects: Shapes,
    pub others: Vec<PresenceView>,
    pub connection_id: u32,
    pub color: String,
    pub name: String,
}

/// Live room summary for the REST listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomSummary {
    pub id: String,
    pub participants: usize,
    pub objects: usize,
}

/// Identity of a participant that just left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    pub connection_id: u32,
}

// =============================================================================
// JOIN / PART
// =============================================================================

/// Room ids are short, URL-safe, and non-empty.
///
/// # Errors
///
/// Returns `InvalidRoomId` when the id is empty, too long, or has characters
/// outside `[A-Za-z0-9._-]`.
pub fn validate_room_id(room_id: &str) -> Result<(), RoomError> {
    let valid = !room_id.is_empty()
        && room_id.len() <= MAX_ROOM_ID_LEN
        && room_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid { Ok(()) } else { Err(RoomError::InvalidRoomId(room_id.to_owned())) }
}

/// Color for a connection id.
#[must_use]
pub fn color_for(connection_id: u32) -> &'static str {
    COLORS[connection_id as usize % COLORS.len()]
}

/// Join a room, hydrating it from the store if it isn't live yet.
///
/// # Errors
///
/// Returns `InvalidRoomId` for malformed ids and `Store` if hydration fails.
pub async fn join_room(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    name: Option<&str>,
    tx: mpsc::Sender<Frame>,
) -> Result<JoinSnapshot, RoomError> {
    validate_room_id(room_id)?;

    let name = match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_owned(),
        _ => guest_name(),
    };

    // Fetch outside the lock; applied only if the room isn't live. A room
    // evicted between the check and the write lock is loaded again.
    let mut hydrated: Option<Shapes> = None;
    let mut rooms = loop {
        let live = state.rooms.read().await.contains_key(room_id);
        if !live && hydrated.is_none() {
            hydrated = Some(state.store.load(room_id).await?);
        }
        let rooms = state.rooms.write().await;
        if rooms.contains_key(room_id) || hydrated.is_some() {
            break rooms;
        }
    };

    let snapshot = {
        let room = rooms.entry(room_id.to_owned()).or_insert_with(|| {
            let mut room = RoomState::new();
            if let Some(objects) = hydrated {
                info!(%room_id, count = objects.len(), "hydrated room from store");
                room.objects = objects;
            }
            room
        });

        let connection_id = room.next_connection_id;
        room.next_connection_id += 1;
        let color = color_for(connection_id).to_owned();

        room.clients.insert(client_id, tx);
        room.participants.insert(
            client_id,
            Participant {
                connection_id,
                name: name.clone(),
                color: color.clone(),
                presence: Presence::default(),
            },
        );
        room.history
            .insert(client_id, History::new(state.config.history_limit));

        info!(
            %room_id,
            %client_id,
            connection_id,
            clients = room.clients.len(),
            "client joined room"
        );
        JoinSnapshot {
            objects: room.objects.clone(),
            others: Vec::new(),
            connection_id,
            color,
            name,
        }
    };
    drop(rooms);

    let others = presence::others(state, room_id, client_id).await;
    Ok(JoinSnapshot { others, ..snapshot })
}

/// Leave a room. Drops the participant's sender, presence and history. If
/// this was the last participant, flushes pending writes and evicts.
pub async fn part_room(state: &AppState, room_id: &str, client_id: Uuid) -> Option<Departure> {
    let (departure, last) = {
        let mut rooms = state.rooms.write().await;
        let room = rooms.get_mut(room_id)?;

        room.clients.remove(&client_id);
        room.history.remove(&client_id);
        let departure = room
            .participants
            .remove(&client_id)
            .map(|p| Departure { connection_id: p.connection_id });
        info!(%room_id, %client_id, remaining = room.clients.len(), "client left room");

        let last = room.clients.is_empty();
        if last && !room.has_pending_writes() {
            rooms.remove(room_id);
            info!(%room_id, "evicted room from memory");
            return departure;
        }
        (departure, last)
    };

    if last {
        evict_after_flush(state, room_id).await;
    }
    departure
}

async fn evict_after_flush(state: &AppState, room_id: &str) {
    if let Err(e) = persistence::flush_room(state, room_id).await {
        error!(error = %e, %room_id, "final flush failed; room retained for retry");
        return;
    }

    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };
    if !room.clients.is_empty() {
        return;
    }
    if room.has_pending_writes() {
        warn!(%room_id, "retaining room after final flush because newer writes exist");
        return;
    }
    rooms.remove(room_id);
    info!(%room_id, "evicted room from memory");
}

// =============================================================================
// BROADCAST
// =============================================================================

/// Send a frame to every participant of a room, optionally excluding one.
pub async fn broadcast(state: &AppState, room_id: &str, frame: &Frame, exclude: Option<Uuid>) {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return;
    };

    for (client_id, tx) in &room.clients {
        if exclude == Some(*client_id) {
            continue;
        }
        // Best-effort: a full channel drops the frame for that peer.
        if tx.try_send(frame.clone()).is_err() {
            warn!(%room_id, %client_id, syscall = %frame.syscall, "dropped frame for slow client");
        }
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// Live rooms with participant and object counts, ordered by id.
pub async fn list_rooms(state: &AppState) -> Vec<RoomSummary> {
    let rooms = state.rooms.read().await;
    let mut out: Vec<RoomSummary> = rooms
        .iter()
        .map(|(id, room)| RoomSummary {
            id: id.clone(),
            participants: room.clients.len(),
            objects: room.objects.len(),
        })
        .collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

/// Connection id of a participant, if present.
pub async fn connection_id_of(state: &AppState, room_id: &str, client_id: Uuid) -> Option<u32> {
    let rooms = state.rooms.read().await;
    rooms
        .get(room_id)?
        .participants
        .get(&client_id)
        .map(|p| p.connection_id)
}

/// Shapes as a JSON object value, for frame payloads and REST bodies.
#[must_use]
pub fn shapes_to_value(objects: Shapes) -> Value {
    Value::Object(objects.into_iter().collect())
}

fn guest_name() -> String {
    let n: u16 = rand::rng().random_range(1000..10_000);
    format!("Guest {n}")
}

#[cfg(test)]
#[path = "room_test.rs"]
mod tests;
