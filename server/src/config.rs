//! Server configuration loaded from environment variables.
//!
//! Every knob has a default so a bare `cargo run -p server` starts an
//! in-memory room server on port 3000. `DATABASE_URL` switches storage to
//! Postgres.

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_STORAGE_FLUSH_INTERVAL_MS: u64 = 1000;
const DEFAULT_HISTORY_LIMIT: usize = 100;
const DEFAULT_CLIENT_CHANNEL_CAPACITY: usize = 256;

/// Typed server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Pool size for the Postgres store.
    pub db_max_connections: u32,
    /// Interval between background storage flushes, in milliseconds.
    pub storage_flush_interval_ms: u64,
    /// Maximum undo (and redo) entries kept per participant.
    pub history_limit: usize,
    /// Outgoing frame queue capacity per connection.
    pub client_channel_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_url: None,
            db_max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            storage_flush_interval_ms: DEFAULT_STORAGE_FLUSH_INTERVAL_MS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            client_channel_capacity: DEFAULT_CLIENT_CHANNEL_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Build configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            port: env_parse("PORT", DEFAULT_PORT),
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            storage_flush_interval_ms: env_parse(
                "STORAGE_FLUSH_INTERVAL_MS",
                DEFAULT_STORAGE_FLUSH_INTERVAL_MS,
            ),
            history_limit: env_parse("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT).max(1),
            client_channel_capacity: env_parse(
                "CLIENT_CHANNEL_CAPACITY",
                DEFAULT_CLIENT_CHANNEL_CAPACITY,
            )
            .max(1),
        }
    }
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
