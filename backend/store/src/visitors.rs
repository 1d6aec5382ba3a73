//! SQLite-backed visitor records with a live broadcast feed.
//!
//! Records are append-only: created on staff confirmation, never updated or
//! deleted. Every successful insert is pushed on a broadcast channel so the
//! welcome display picks up arrivals without polling.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};
use uuid::Uuid;

use eventlens_core::{VisitorFields, VisitorRecord};

use crate::registrations::millis_to_datetime;

pub struct VisitorStore {
    conn: Mutex<Connection>,
    events: broadcast::Sender<VisitorRecord>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS visitors (
        id          TEXT PRIMARY KEY,
        name        TEXT,
        designation TEXT,
        company     TEXT,
        email       TEXT,
        phone       TEXT,
        website     TEXT,
        created_at  INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_visitors_created ON visitors(created_at);
";

impl VisitorStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open visitors database")?;
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\nPRAGMA busy_timeout=5000;\n{SCHEMA}"
        ))
        .context("Failed to initialize visitors schema")?;
        info!("VisitorStore opened at {:?}", path.as_ref());
        let (events, _) = broadcast::channel(64);
        Ok(Self { conn: Mutex::new(conn), events })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        let (events, _) = broadcast::channel(64);
        Ok(Self { conn: Mutex::new(conn), events })
    }

    /// Subscribe to records as they are persisted.
    pub fn subscribe(&self) -> broadcast::Receiver<VisitorRecord> {
        self.events.subscribe()
    }

    /// Persist a confirmed visitor record. The store assigns id and timestamp.
    pub async fn insert(&self, fields: VisitorFields) -> Result<VisitorRecord> {
        let record = VisitorRecord {
            id: Uuid::new_v4(),
            fields,
            created_at: chrono::Utc::now(),
        };
        {
            let conn = self.conn.lock().await;
            conn.execute(
                "INSERT INTO visitors (id, name, designation, company, email, phone, website, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.to_string(),
                    record.fields.name,
                    record.fields.designation,
                    record.fields.company,
                    record.fields.email,
                    record.fields.phone,
                    record.fields.website,
                    record.created_at.timestamp_millis(),
                ],
            )?;
        }
        debug!(id = %record.id, "Inserted visitor record");

        // No subscribers is fine; the welcome display may not be up yet.
        let _ = self.events.send(record.clone());
        Ok(record)
    }

    /// Newest-first visitor feed, as the welcome display consumes it.
    pub async fn recent(&self, limit: usize) -> Result<Vec<VisitorRecord>> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, name, designation, company, email, phone, website, created_at
             FROM visitors ORDER BY created_at DESC, id LIMIT ?1",
        )?;
        let mut rows = Vec::new();
        for row in stmt.query_map(params![limit as i64], row_to_record)? {
            match row {
                Ok(record) => rows.push(record),
                // Degrade with a log line; one bad row must not empty the feed.
                Err(e) => warn!(error = %e, "Skipping undecodable visitor row"),
            }
        }
        Ok(rows)
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let n: u64 = conn.query_row("SELECT COUNT(*) FROM visitors", [], |r| r.get(0))?;
        Ok(n)
    }
}

fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<VisitorRecord> {
    let id_str: String = row.get(0)?;
    let created_ms: i64 = row.get(7)?;
    Ok(VisitorRecord {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?,
        fields: VisitorFields {
            name: row.get(1)?,
            designation: row.get(2)?,
            company: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            website: row.get(6)?,
        },
        created_at: millis_to_datetime(created_ms),
    })
}
