//! SQLite-backed response cache, shared by every process that opens the same file.

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use reqwest::StatusCode;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

use super::CacheStore;
use crate::http::HttpResponse;

#[derive(Debug)]
pub struct SqliteCacheStore {
    conn: Mutex<Connection>,
}

impl SqliteCacheStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open response cache: {}", path.display()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory response cache")?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS responses (
                cache_key TEXT PRIMARY KEY,
                status INTEGER NOT NULL,
                body TEXT NOT NULL,
                stored_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_responses_stored_at ON responses(stored_at);
            "#,
        )
        .context("Failed to initialize response cache schema")?;
        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl CacheStore for SqliteCacheStore {
    fn get(&self, key: &str, fresh_after: DateTime<Utc>) -> Result<Option<HttpResponse>> {
        let row = self
            .conn
            .lock()
            .query_row(
                "SELECT status, body FROM responses WHERE cache_key = ?1 AND stored_at > ?2",
                params![key, fresh_after.timestamp_millis()],
                |row| Ok((row.get::<_, u16>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .context("Failed to read cached response")?;

        row.map(|(status, body)| {
            let status = StatusCode::from_u16(status)
                .map_err(|_| anyhow!("cached response has invalid status {status}"))?;
            Ok(HttpResponse::new(status, body))
        })
        .transpose()
    }

    fn put(&self, key: &str, response: &HttpResponse, stored_at: DateTime<Utc>) -> Result<()> {
        self.conn
            .lock()
            .execute(
                "INSERT OR REPLACE INTO responses (cache_key, status, body, stored_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key, response.status.as_u16(), response.body, stored_at.timestamp_millis()],
            )
            .context("Failed to store cached response")?;
        Ok(())
    }

    fn purge(&self, fresh_after: DateTime<Utc>) -> Result<usize> {
        self.conn
            .lock()
            .execute(
                "DELETE FROM responses WHERE stored_at <= ?1",
                params![fresh_after.timestamp_millis()],
            )
            .context("Failed to purge cached responses")
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .lock()
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))
            .context("Failed to count cached responses")?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
