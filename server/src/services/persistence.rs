//! Persistence service: background flush of dirty room storage.
//!
//! DESIGN
//! ======
//! A background task wakes every `STORAGE_FLUSH_INTERVAL_MS`, snapshots the
//! dirty and deleted keys of each live room under the lock, releases it,
//! and writes the batch to the room store.
//!
//! ERROR HANDLING
//! ==============
//! Dirty flags are cleared only after a successful write, and only for keys
//! that did not change again while the write was in flight. Repeated upserts
//! are acceptable; silent data loss is not.

use std::time::Duration;

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::state::AppState;
use crate::store::StoreError;

/// Keys captured for one write, with the values they had at capture time.
struct PendingWrite {
    upserts: Vec<(String, Value)>,
    deletes: Vec<String>,
}

/// Spawn the background persistence task. Returns a handle for shutdown.
pub fn spawn_persistence_task(state: AppState) -> JoinHandle<()> {
    let interval_ms = state.config.storage_flush_interval_ms.max(1);
    info!(interval_ms, "storage flush configured");
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            flush_all_dirty(&state).await;
        }
    })
}

/// Flush every live room with pending writes. Failures are logged and retried next tick.
pub async fn flush_all_dirty(state: &AppState) {
    let room_ids: Vec<String> = {
        let rooms = state.rooms.read().await;
        rooms
            .iter()
            .filter(|(_, room)| room.has_pending_writes())
            .map(|(id, _)| id.clone())
            .collect()
    };

    for room_id in room_ids {
        if let Err(e) = flush_room(state, &room_id).await {
            error!(error = %e, %room_id, "storage flush failed");
        }
    }
}

/// Write one room's pending keys to the store.
///
/// # Errors
///
/// Returns the store error; the room keeps its dirty flags for a retry.
pub async fn flush_room(state: &AppState, room_id: &str) -> Result<(), StoreError> {
    let Some(pending) = capture(state, room_id).await else {
        return Ok(());
    };

    state
        .store
        .save(room_id, &pending.upserts, &pending.deletes)
        .await?;

    let mut rooms = state.rooms.write().await;
    let Some(room) = rooms.get_mut(room_id) else {
        return Ok(());
    };
    for (key, flushed) in &pending.upserts {
        if room.objects.get(key) == Some(flushed) {
            room.dirty.remove(key);
        }
    }
    for key in &pending.deletes {
        if !room.objects.contains_key(key) {
            room.deleted.remove(key);
        }
    }
    info!(
        %room_id,
        upserts = pending.upserts.len(),
        deletes = pending.deletes.len(),
        "flushed room storage"
    );
    Ok(())
}

async fn capture(state: &AppState, room_id: &str) -> Option<PendingWrite> {
    let rooms = state.rooms.read().await;
    let room = rooms.get(room_id)?;
    if !room.has_pending_writes() {
        return None;
    }

    let upserts = room
        .dirty
        .iter()
        .filter_map(|key| room.objects.get(key).map(|v| (key.clone(), v.clone())))
        .collect();
    let deletes = room.deleted.iter().cloned().collect();
    Some(PendingWrite { upserts, deletes })
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
