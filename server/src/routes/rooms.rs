//! Room inspection routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use uuid::Uuid;

use crate::frame::{Data, Frame};
use crate::services::room::{self, RoomSummary};
use crate::services::storage::{self, StorageError};
use crate::state::AppState;

#[derive(Serialize)]
pub struct StorageResponse {
    pub room_id: String,
    pub objects: Value,
}

/// `GET /api/rooms`: live rooms with participant and object counts.
pub async fn list_rooms(State(state): State<AppState>) -> Json<Vec<RoomSummary>> {
    Json(room::list_rooms(&state).await)
}

/// `GET /api/rooms/:id/storage`: current shared map. Rooms that aren't live
/// are read straight from the store.
pub async fn get_storage(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<StorageResponse>, StatusCode> {
    room::validate_room_id(&room_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    let objects = match storage::snapshot(&state, &room_id).await {
        Ok(objects) => objects,
        Err(StorageError::RoomNotLoaded(_)) => state.store.load(&room_id).await.map_err(|e| {
            warn!(error = %e, %room_id, "storage read failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?,
        Err(e) => return Err(storage_error_to_status(&e)),
    };

    Ok(Json(StorageResponse { room_id, objects: room::shapes_to_value(objects) }))
}

/// `DELETE /api/rooms/:id/storage`: clear a room. Live rooms are cleared in
/// memory and their participants told; rooms that aren't live are cleared in
/// the store.
pub async fn reset_storage(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    room::validate_room_id(&room_id).map_err(|_| StatusCode::BAD_REQUEST)?;

    // Administrative resets aren't attributed to any participant's history.
    let removed = match storage::reset(&state, &room_id, Uuid::nil()).await {
        Ok(removed) => removed,
        Err(StorageError::RoomNotLoaded(_)) => return reset_stored(&state, room_id).await,
        Err(e) => return Err(storage_error_to_status(&e)),
    };
    if let Some(live) = state.rooms.write().await.get_mut(&room_id) {
        live.history.remove(&Uuid::nil());
    }

    let frame = Frame::request("storage:reset", Data::new()).with_room_id(room_id.clone());
    room::broadcast(&state, &room_id, &frame, None).await;
    info!(%room_id, removed, "storage reset via REST");

    Ok(Json(json!({ "ok": true, "removed": removed })))
}

/// Delete every persisted key of a room that has no live participants.
async fn reset_stored(state: &AppState, room_id: String) -> Result<Json<Value>, StatusCode> {
    let keys: Vec<String> = state
        .store
        .load(&room_id)
        .await
        .map_err(|e| {
            warn!(error = %e, %room_id, "storage read failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?
        .into_keys()
        .collect();
    if !keys.is_empty() {
        state.store.save(&room_id, &[], &keys).await.map_err(|e| {
            warn!(error = %e, %room_id, "storage reset write failed");
            StatusCode::SERVICE_UNAVAILABLE
        })?;
    }

    let removed = keys.len();
    info!(%room_id, removed, "stored room reset via REST");
    Ok(Json(json!({ "ok": true, "removed": removed })))
}

pub(crate) fn storage_error_to_status(err: &StorageError) -> StatusCode {
    match err {
        StorageError::RoomNotLoaded(_) => StatusCode::NOT_FOUND,
        StorageError::InvalidKey | StorageError::InvalidShape(_) => StatusCode::BAD_REQUEST,
    }
}

#[cfg(test)]
#[path = "rooms_test.rs"]
mod tests;
