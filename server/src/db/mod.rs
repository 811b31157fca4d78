//! Postgres pool setup and the Postgres-backed room store.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module only when `DATABASE_URL` is set. Migrations run
//! before the listener accepts websocket traffic.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::store::{RoomStore, Shapes, StoreError};

/// Initialize the `PostgreSQL` connection pool and run migrations.
///
/// # Errors
///
/// Returns an error if the connection or migrations fail.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}

/// Room storage in the `room_objects` table, one row per shape key.
pub struct PgRoomStore {
    pool: PgPool,
}

impl PgRoomStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoomStore for PgRoomStore {
    async fn load(&self, room_id: &str) -> Result<Shapes, StoreError> {
        let rows = sqlx::query_as::<_, (String, Value)>(
            "SELECT object_id, shape FROM room_objects WHERE room_id = $1",
        )
        .bind(room_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn save(
        &self,
        room_id: &str,
        upserts: &[(String, Value)],
        deletes: &[String],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        if !deletes.is_empty() {
            sqlx::query("DELETE FROM room_objects WHERE room_id = $1 AND object_id = ANY($2)")
                .bind(room_id)
                .bind(deletes)
                .execute(&mut *tx)
                .await?;
        }

        for (object_id, shape) in upserts {
            sqlx::query(
                "INSERT INTO room_objects (room_id, object_id, shape, updated_at) \
                 VALUES ($1, $2, $3, now()) \
                 ON CONFLICT (room_id, object_id) DO UPDATE SET \
                     shape = EXCLUDED.shape, updated_at = now()",
            )
            .bind(room_id)
            .bind(object_id)
            .bind(shape)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
