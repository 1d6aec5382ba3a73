//! SQLite-backed registrant storage.
//!
//! Uniqueness by contact field is enforced here, not by the callers: a unique
//! index on email plus a single conditional write replaces the original
//! lookup-then-overwrite flow, so concurrent submissions of the same address
//! cannot duplicate a row.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use eventlens_core::{NewRegistrant, Registrant};

pub struct RegistrationStore {
    conn: Mutex<Connection>,
}

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS registrations (
        id         TEXT PRIMARY KEY,
        name       TEXT NOT NULL,
        email      TEXT NOT NULL UNIQUE,
        phone      TEXT NOT NULL,
        image_url  TEXT NOT NULL,
        created_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_registrations_phone ON registrations(phone);
";

impl RegistrationStore {
    /// Create or open a database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path.as_ref())
            .context("Failed to open registrations database")?;
        // The stores share one database file over separate connections; the
        // busy timeout keeps a concurrent writer from failing outright.
        conn.execute_batch(&format!(
            "PRAGMA journal_mode=WAL;\nPRAGMA busy_timeout=5000;\n{SCHEMA}"
        ))
        .context("Failed to initialize registrations schema")?;
        info!("RegistrationStore opened at {:?}", path.as_ref());
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Open an in-memory database (for tests).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// Insert a registrant, or overwrite the existing row sharing the same
    /// email. The write is a single conditional statement; the existing row's
    /// id survives an overwrite, everything else (timestamp included) is
    /// replaced, matching a re-registration.
    pub async fn upsert(&self, reg: &NewRegistrant) -> Result<Registrant> {
        let conn = self.conn.lock().await;
        let id = Uuid::new_v4();
        let now = Utc::now();
        conn.execute(
            "INSERT INTO registrations (id, name, email, phone, image_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(email) DO UPDATE SET
                 name = excluded.name,
                 phone = excluded.phone,
                 image_url = excluded.image_url,
                 created_at = excluded.created_at",
            params![
                id.to_string(),
                reg.name,
                reg.email,
                reg.phone,
                reg.image_url,
                now.timestamp_millis(),
            ],
        )?;
        debug!(email = %reg.email, "Upserted registrant");

        // Read back: on conflict the stored id is the original one.
        self.find_by_email(&reg.email, &conn)?
            .context("registrant missing immediately after upsert")
    }

    /// Look up a registrant by email.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<Registrant>> {
        let conn = self.conn.lock().await;
        self.find_by_email(email, &conn)
    }

    /// Look up a registrant by phone number.
    pub async fn get_by_phone(&self, phone: &str) -> Result<Option<Registrant>> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT id, name, email, phone, image_url, created_at
                 FROM registrations WHERE phone = ?1 LIMIT 1",
                params![phone],
                row_to_registrant,
            )
            .optional()?;
        Ok(row)
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let n: u64 = conn.query_row("SELECT COUNT(*) FROM registrations", [], |r| r.get(0))?;
        Ok(n)
    }

    fn find_by_email(&self, email: &str, conn: &Connection) -> Result<Option<Registrant>> {
        let row = conn
            .query_row(
                "SELECT id, name, email, phone, image_url, created_at
                 FROM registrations WHERE email = ?1",
                params![email],
                row_to_registrant,
            )
            .optional()?;
        Ok(row)
    }
}

fn row_to_registrant(row: &rusqlite::Row) -> rusqlite::Result<Registrant> {
    let id_str: String = row.get(0)?;
    let created_ms: i64 = row.get(5)?;
    Ok(Registrant {
        id: Uuid::parse_str(&id_str)
            .map_err(|e| rusqlite::Error::InvalidParameterName(e.to_string()))?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        image_url: row.get(4)?,
        created_at: millis_to_datetime(created_ms),
    })
}

pub(crate) fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reg(name: &str, email: &str, phone: &str) -> NewRegistrant {
        NewRegistrant {
            name: name.into(),
            email: email.into(),
            phone: phone.into(),
            image_url: "data:image/jpeg;base64,eA==".into(),
        }
    }

    #[tokio::test]
    async fn test_new_email_creates_one_row() {
        let store = RegistrationStore::in_memory().unwrap();
        let saved = store.upsert(&reg("Ada", "ada@example.com", "111")).await.unwrap();
        assert_eq!(saved.name, "Ada");
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_same_email_overwrites_instead_of_duplicating() {
        let store = RegistrationStore::in_memory().unwrap();
        let first = store.upsert(&reg("Ada", "ada@example.com", "111")).await.unwrap();
        let second = store
            .upsert(&reg("Ada Lovelace", "ada@example.com", "222"))
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        assert_eq!(second.id, first.id);
        assert_eq!(second.name, "Ada Lovelace");
        assert_eq!(second.phone, "222");
    }

    #[tokio::test]
    async fn test_lookup_by_phone_and_email() {
        let store = RegistrationStore::in_memory().unwrap();
        store.upsert(&reg("Ada", "ada@example.com", "111")).await.unwrap();

        let by_phone = store.get_by_phone("111").await.unwrap().unwrap();
        assert_eq!(by_phone.email, "ada@example.com");
        let by_email = store.get_by_email("ada@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.phone, "111");
        assert!(store.get_by_email("nobody@example.com").await.unwrap().is_none());
    }
}
