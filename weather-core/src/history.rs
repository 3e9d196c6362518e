//! SQLite-backed users and search history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// How many successful lookups a city has had across all users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CityCount {
    pub city_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub user_id: Uuid,
    pub city_name: String,
    pub date_request: DateTime<Utc>,
}

pub struct SearchHistoryStore {
    conn: Connection,
}

impl SearchHistoryStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open history database: {}", path.display()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory history database")?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS users (
                    user_id TEXT PRIMARY KEY
                );

                CREATE TABLE IF NOT EXISTS search_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL REFERENCES users(user_id) ON DELETE CASCADE,
                    city_name TEXT NOT NULL,
                    date_request TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_search_city ON search_history(city_name);
                "#,
            )
            .context("Failed to initialize history schema")?;
        Ok(())
    }

    pub fn create_user(&self) -> Result<Uuid> {
        let user_id = Uuid::new_v4();
        self.conn
            .execute("INSERT INTO users (user_id) VALUES (?1)", params![user_id.to_string()])
            .context("Failed to create user")?;
        tracing::debug!(%user_id, "created user");
        Ok(user_id)
    }

    pub fn user_exists(&self, user_id: Uuid) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM users WHERE user_id = ?1",
                params![user_id.to_string()],
                |_| Ok(()),
            )
            .optional()
            .context("Failed to look up user")?;
        Ok(found.is_some())
    }

    /// Returns the known user, or creates a new one when the id is absent or unknown.
    pub fn resolve_user(&self, candidate: Option<Uuid>) -> Result<Uuid> {
        match candidate {
            Some(id) if self.user_exists(id)? => Ok(id),
            Some(id) => {
                tracing::info!(%id, "unknown user id, creating a new user");
                self.create_user()
            }
            None => self.create_user(),
        }
    }

    pub fn record_search(&self, user_id: Uuid, city_name: &str) -> Result<()> {
        self.record_search_at(user_id, city_name, Utc::now())
    }

    pub fn record_search_at(&self, user_id: Uuid, city_name: &str, at: DateTime<Utc>) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO search_history (user_id, city_name, date_request) VALUES (?1, ?2, ?3)",
                params![user_id.to_string(), city_name, at.to_rfc3339()],
            )
            .with_context(|| format!("Failed to record search for '{city_name}'"))?;
        Ok(())
    }

    pub fn searches_for(&self, user_id: Uuid) -> Result<Vec<SearchRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT city_name, date_request FROM search_history WHERE user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![user_id.to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (city_name, date) = row?;
            let date_request = DateTime::parse_from_rfc3339(&date)
                .with_context(|| format!("Bad timestamp in search history: {date}"))?
                .with_timezone(&Utc);
            out.push(SearchRecord { user_id, city_name, date_request });
        }
        Ok(out)
    }

    /// Per-city totals, most searched first; ties ordered by name.
    pub fn city_search_counts(&self) -> Result<Vec<CityCount>> {
        let mut stmt = self.conn.prepare(
            "SELECT city_name, COUNT(*) AS count FROM search_history
             GROUP BY city_name ORDER BY count DESC, city_name ASC",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CityCount { city_name: row.get(0)?, count: row.get::<_, i64>(1)? as u64 })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().context("Failed to aggregate search counts")
    }

    /// The search-count report as a JSON array of `{city_name, count}`.
    pub fn report_json(&self) -> Result<String> {
        let counts = self.city_search_counts()?;
        serde_json::to_string(&counts).context("Failed to serialize search counts")
    }
}
