//! Per-device cache of the registrant profile and the last match report.
//!
//! One row per (device, key), plain JSON, no expiry. Values are written and
//! read back verbatim under fixed keys; a malformed entry reads as absent.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Cache key for the registrant profile.
pub const PROFILE_KEY: &str = "nief-user";
/// Cache key for the face-match report.
pub const MATCHES_KEY: &str = "imagedData";

pub struct DeviceCache {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS device_cache (
        device_id TEXT NOT NULL,
        key       TEXT NOT NULL,
        value     TEXT NOT NULL,
        PRIMARY KEY (device_id, key)
    );
";

impl DeviceCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open device cache database")?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\nPRAGMA busy_timeout=5000;\n{SCHEMA}"
        ))
        .context("Failed to initialize device cache schema")?;
        info!("DeviceCache opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Store a serializable value under (device, key), replacing any prior value.
    pub async fn put<T: serde::Serialize>(&self, device_id: &str, key: &str, value: &T) -> Result<()> {
        let json = serde_json::to_string(value)?;
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR REPLACE INTO device_cache (device_id, key, value) VALUES (?1, ?2, ?3)",
            params![device_id, key, json],
        )?;
        Ok(())
    }

    /// Fetch and deserialize a cached value.
    ///
    /// A malformed cached blob is logged and treated as absent; the caller
    /// renders its empty state rather than an error.
    pub async fn get<T: serde::de::DeserializeOwned>(
        &self,
        device_id: &str,
        key: &str,
    ) -> Result<Option<T>> {
        let conn = self.conn.lock().await;
        let raw: Option<String> = conn
            .query_row(
                "SELECT value FROM device_cache WHERE device_id = ?1 AND key = ?2",
                params![device_id, key],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            None => Ok(None),
            Some(json) => match serde_json::from_str(&json) {
                Ok(value) => Ok(Some(value)),
                Err(e) => {
                    warn!(device_id, key, error = %e, "Discarding malformed cache entry");
                    Ok(None)
                }
            },
        }
    }
}
