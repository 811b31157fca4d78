//! History service: per-participant undo/redo over the shared map.
//!
//! DESIGN
//! ======
//! Each connected client owns a `History`: an undo stack and a redo stack of
//! batches, where a batch lists `(key, before, after)` for every key it
//! touched. Undo writes the `before` values back (newest change first) and
//! moves the batch to redo; redo writes the `after` values. Applying history
//! is itself last write wins: if a peer edited the key since, undo still
//! overwrites it.
//!
//! While paused, changes accumulate into one pending batch so a whole drag
//! gesture undoes in a single step. Undo and redo commit a pending batch
//! first. Stacks are capped; the oldest entries fall off.

use std::collections::{BTreeSet, HashMap, VecDeque};

use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::services::storage::{StorageError, history_for};
use crate::state::{AppState, RoomState};

// =============================================================================
// TYPES
// =============================================================================

/// One key's transition inside a history batch.
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub key: String,
    /// Value before the edit; `None` means the key did not exist.
    pub before: Option<Value>,
    /// Value after the edit; `None` means the key was removed.
    pub after: Option<Value>,
}

/// Final state of every key touched by an undo or redo, ready to broadcast.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Patch {
    pub set: HashMap<String, Value>,
    pub deleted: Vec<String>,
}

impl Patch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty() && self.deleted.is_empty()
    }
}

/// Undo/redo stacks for one participant.
#[derive(Debug, Clone)]
pub struct History {
    undo: VecDeque<Vec<Change>>,
    redo: VecDeque<Vec<Change>>,
    pending: Option<Vec<Change>>,
    limit: usize,
}

impl History {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self { undo: VecDeque::new(), redo: VecDeque::new(), pending: None, limit: limit.max(1) }
    }

    /// Record a single-key edit.
    pub fn record(&mut self, change: Change) {
        self.record_batch(vec![change]);
    }

    /// Record edits that undo together. Clears the redo stack.
    pub fn record_batch(&mut self, changes: Vec<Change>) {
        let changes: Vec<Change> = changes.into_iter().filter(|c| c.before != c.after).collect();
        if changes.is_empty() {
            return;
        }
        self.redo.clear();

        match &mut self.pending {
            Some(pending) => {
                for change in changes {
                    merge_change(pending, change);
                }
            }
            None => push_capped(&mut self.undo, changes, self.limit),
        }
    }

    /// Start accumulating changes into one batch. Idempotent.
    pub fn pause(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(Vec::new());
        }
    }

    /// Commit the pending batch, if any.
    pub fn resume(&mut self) {
        if let Some(batch) = self.pending.take() {
            if !batch.is_empty() {
                push_capped(&mut self.undo, batch, self.limit);
            }
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_paused(&self) -> bool {
        self.pending.is_some()
    }

    #[cfg(test)]
    #[must_use]
    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    fn take_undo(&mut self) -> Option<Vec<Change>> {
        self.resume();
        self.undo.pop_back()
    }

    fn take_redo(&mut self) -> Option<Vec<Change>> {
        self.resume();
        self.redo.pop_back()
    }
}

fn push_capped(stack: &mut VecDeque<Vec<Change>>, batch: Vec<Change>, limit: usize) {
    stack.push_back(batch);
    while stack.len() > limit {
        stack.pop_front();
    }
}

/// Fold a change into a pending batch: the first `before` and the last `after` win.
fn merge_change(pending: &mut Vec<Change>, change: Change) {
    if let Some(pos) = pending.iter().position(|c| c.key == change.key) {
        pending[pos].after = change.after;
        if pending[pos].before == pending[pos].after {
            pending.remove(pos);
        }
    } else {
        pending.push(change);
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Undo the caller's newest batch. An empty stack yields an empty patch.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn undo(state: &AppState, room_id: &str, client_id: Uuid) -> Result<Patch, StorageError> {
    let limit = state.config.history_limit;
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;

    let Some(batch) = history_for(room, client_id, limit).take_undo() else {
        return Ok(Patch::default());
    };
    for change in batch.iter().rev() {
        room.put_object(&change.key, change.before.clone());
    }
    let patch = patch_for(room, &batch);
    push_capped(&mut history_for(room, client_id, limit).redo, batch, limit);

    Ok(patch)
}

/// Re-apply the caller's newest undone batch. An empty stack yields an empty patch.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn redo(state: &AppState, room_id: &str, client_id: Uuid) -> Result<Patch, StorageError> {
    let limit = state.config.history_limit;
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;

    let Some(batch) = history_for(room, client_id, limit).take_redo() else {
        return Ok(Patch::default());
    };
    for change in &batch {
        room.put_object(&change.key, change.after.clone());
    }
    let patch = patch_for(room, &batch);
    push_capped(&mut history_for(room, client_id, limit).undo, batch, limit);

    Ok(patch)
}

/// Begin batching the caller's edits into one undo step.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn pause(state: &AppState, room_id: &str, client_id: Uuid) -> Result<(), StorageError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;
    history_for(room, client_id, state.config.history_limit).pause();
    Ok(())
}

/// Commit the caller's batched edits as one undo step.
///
/// # Errors
///
/// Returns `RoomNotLoaded` if the room isn't live.
pub async fn resume(state: &AppState, room_id: &str, client_id: Uuid) -> Result<(), StorageError> {
    let mut rooms = state.rooms.write().await;
    let room = rooms
        .get_mut(room_id)
        .ok_or_else(|| StorageError::RoomNotLoaded(room_id.to_owned()))?;
    history_for(room, client_id, state.config.history_limit).resume();
    Ok(())
}

fn patch_for(room: &RoomState, batch: &[Change]) -> Patch {
    let mut patch = Patch::default();
    let mut deleted = BTreeSet::new();
    for change in batch {
        match room.objects.get(&change.key) {
            Some(shape) => {
                patch.set.insert(change.key.clone(), shape.clone());
            }
            None => {
                deleted.insert(change.key.clone());
            }
        }
    }
    patch.deleted = deleted.into_iter().collect();
    patch
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
