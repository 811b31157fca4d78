//! Room storage backends.
//!
//! DESIGN
//! ======
//! Live room state is kept in memory; a `RoomStore` only hydrates a room on
//! first join and receives batched writes from the persistence task. The
//! trait is the seam between the Postgres backend and the in-memory backend
//! used when no database is configured (and in tests).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::frame::ErrorCode;

/// Shared object map of one room: shape key -> shape JSON.
pub type Shapes = HashMap<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Database(_) => "E_DATABASE",
            Self::Unavailable(_) => "E_STORE_UNAVAILABLE",
        }
    }

    fn retryable(&self) -> bool {
        true
    }
}

/// Durable home of room storage.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Load the full shared map for a room. Unknown rooms load empty.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the backend cannot be read.
    async fn load(&self, room_id: &str) -> Result<Shapes, StoreError>;

    /// Apply a batch of upserts and deletes for one room.
    ///
    /// # Errors
    ///
    /// Returns a [`StoreError`] if the write fails. Nothing is assumed
    /// persisted on error.
    async fn save(
        &self,
        room_id: &str,
        upserts: &[(String, Value)],
        deletes: &[String],
    ) -> Result<(), StoreError>;
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Process-local store. Rooms survive eviction but not a restart.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: Mutex<HashMap<String, Shapes>>,
    fail_saves: AtomicBool,
}

impl MemoryRoomStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    /// Make subsequent saves fail (or succeed again). Used to exercise the
    /// retain-on-failure path.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Copy of what has been persisted for a room.
    pub async fn persisted(&self, room_id: &str) -> Shapes {
        self.rooms
            .lock()
            .await
            .get(room_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn load(&self, room_id: &str) -> Result<Shapes, StoreError> {
        Ok(self.persisted(room_id).await)
    }

    async fn save(
        &self,
        room_id: &str,
        upserts: &[(String, Value)],
        deletes: &[String],
    ) -> Result<(), StoreError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store saves disabled".into()));
        }
        let mut rooms = self.rooms.lock().await;
        let room = rooms.entry(room_id.to_owned()).or_default();
        for key in deletes {
            room.remove(key);
        }
        for (key, shape) in upserts {
            room.insert(key.clone(), shape.clone());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod tests;
