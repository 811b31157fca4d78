//! Storage service: the shared object map of a room.
//!
//! DESIGN
//! ======
//! Mutations update in-memory state immediately, mark keys dirty for the
//! persistence task, and record an inverse in the author's history so the
//! edit can be undone. Conflict resolution is last write wins per key: the
//! newest `storage:set` for a key replaces the whole shape.
//!
//! Every stored shape carries its key as `objectId`; the server stamps it on
//! write so peers can rely on the duplication.

use serde_json::Value;
use uuid::Uuid;

use crate::services::history::{Change, History};
use crate::state::{AppState, OBJECT_ID_FIELD, RoomState};
use crate::store::Shapes;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("room not loaded: {0}")]
    RoomNotLoaded(String),
    #[error("shape key must be a non-empty string")]
    InvalidKey,
    #[error("shape for {0} must be a JSON object")]
    InvalidShape(String),
}

impl crate::frame::ErrorCode for StorageError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::RoomNotLoaded(_) => "E_ROOM_NOT_LOADED",
            Self::InvalidKey => "E_INVALID_KEY",
            Self::InvalidShape(_) => "E_INVALID_SHAPE",
        }
    }
}

// =============================================================================
// SET
// =============================================================================

/// Insert or replace one shape. Returns the stored (stamped) shape.
///
/// # Errors
///
/// Returns `InvalidKey`/`InvalidShape` for malformed input and
/// `RoomNotLoaded` if the room isn't live.
pub async fn set_shape(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    key: &str,
    shape: Value,
) -> Result<Value, StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey);
    }
    let Value::Object(mut fields) = shape else {
        return Err(StorageError::InvalidShape(key.to_owned()));
    };
    fields.insert(OBJECT_ID_FIELD.into(), Value::String(key.to_owned()));
    let stamped = Value::Object(fields);

    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;

    let before = room.put_object(key, Some(stamped.clone()));
    history_for(room, client_id, state.config.history_limit).record(Change {
        key: key.to_owned(),
        before,
        after: Some(stamped.clone()),
    });

    Ok(stamped)
}

// =============================================================================
// DELETE
// =============================================================================

/// Remove exactly one key. A missing key is a silent no-op (`Ok(None)`).
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn delete_shape(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
    key: &str,
) -> Result<Option<Value>, StorageError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;

    let Some(removed) = room.take_object(key) else {
        return Ok(None);
    };
    history_for(room, client_id, state.config.history_limit).record(Change {
        key: key.to_owned(),
        before: Some(removed.clone()),
        after: None,
    });

    Ok(Some(removed))
}

// =============================================================================
// RESET
// =============================================================================

/// Clear the whole map as one undoable step. Returns how many shapes were removed.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn reset(
    state: &AppState,
    room_id: &str,
    client_id: Uuid,
) -> Result<usize, StorageError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;

    let removed = room.clear_objects();
    let count = removed.len();
    if count > 0 {
        let mut changes: Vec<Change> = removed
            .into_iter()
            .map(|(key, before)| Change { key, before: Some(before), after: None })
            .collect();
        changes.sort_by(|a, b| a.key.cmp(&b.key));
        history_for(room, client_id, state.config.history_limit).record_batch(changes);
    }

    Ok(count)
}

// =============================================================================
// READ
// =============================================================================

/// Current shared map of a live room.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn snapshot(state: &AppState, room_id: &str) -> Result<Shapes, StorageError> {
    let rooms = state.rooms.read().await;
    rooms
        .get(room_id)
        .map(|room| room.objects.clone())
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))
}

pub(crate) fn history_for(room: &mut RoomState, client_id: Uuid, limit: usize) -> &mut History {
    room.history
        .entry(client_id)
        .or_insert_with(|| History::new(limit))
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
