//! Presence service: ephemeral per-participant cursor and chat state.
//!
//! DESIGN
//! ======
//! Presence is merged, not replaced: a key present in the update overwrites
//! the field, `null` clears it, an absent key leaves it alone. Nothing here
//! is persisted and nothing is undoable. Peers receive the merged record.

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::frame::Data;
use crate::state::{AppState, Cursor, Participant, Presence};

/// Presence record as peers see it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceView {
    pub client_id: Uuid,
    pub connection_id: u32,
    pub name: String,
    pub color: String,
    #[serde(flatten)]
    pub presence: Presence,
}

impl PresenceView {
    #[must_use]
    pub fn new(client_id: Uuid, participant: &Participant) -> Self {
        Self {
            client_id,
            connection_id: participant.connection_id,
            name: participant.name.clone(),
            color: participant.color.clone(),
            presence: participant.presence.clone(),
        }
    }

    /// Flat frame payload for this view.
    #[must_use]
    pub fn to_data(&self) -> Data {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map.into_iter().collect(),
            _ => Data::new(),
        }
    }
}

/// Merge a presence update into the caller's record.
///
/// Returns `None` if the room or participant is gone; updates are cosmetic
/// and dropped silently in that case.
pub async fn update_presence(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    update: &Data,
) -> Option<PresenceView> {
    let mut rooms = state.rooms.write().await;
    let participant = rooms.get_mut(room_id)?.participants.get_mut(&client_id)?;

    if let Some(cursor) = update.get("cursor") {
        participant.presence.cursor = parse_cursor(cursor);
    }
    if let Some(message) = update.get("message") {
        participant.presence.message = message.as_str().map(str::to_owned);
    }
    if let Some(previous) = update.get("previousMessage") {
        participant.presence.previous_message = previous.as_str().map(str::to_owned);
    }

    Some(PresenceView::new(client_id, participant))
}

/// Pointer left the canvas: hide the cursor and any chat bubble.
pub async fn clear_presence(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
) -> Option<PresenceView> {
    let mut update = Data::new();
    update.insert("cursor".into(), Value::Null);
    update.insert("message".into(), Value::Null);
    update_presence(state, room_id, client_id, &update).await
}

/// Presence of one participant.
pub async fn view_of(state: &AppState, room_id: &str, client_id: Uuid) -> Option<PresenceView> {
    let rooms = state.rooms.read().await;
    let participant = rooms.get(room_id)?.participants.get(&client_id)?;
    Some(PresenceView::new(client_id, participant))
}

/// Presence of every participant except `client_id`, ordered by connection id.
pub async fn others(state: &AppState, room_id: &str, client_id: Uuid) -> Vec<PresenceView> {
    let rooms = state.rooms.read().await;
    let Some(room) = rooms.get(room_id) else {
        return Vec::new();
    };
    let mut views: Vec<PresenceView> = room
        .participants
        .iter()
        .filter(|(id, _)| **id != client_id)
        .map(|(id, participant)| PresenceView::new(*id, participant))
        .collect();
    views.sort_by_key(|v| v.connection_id);
    views
}

fn parse_cursor(value: &Value) -> Option<Cursor> {
    let x = value.get("x")?.as_f64()?;
    let y = value.get("y")?.as_f64()?;
    Some(Cursor { x, y })
}

#[cfg(test)]
#[path = "presence_test.rs"]
mod tests;
