//! File-backed stand-in for browser cookies, so repeated runs behave like
//! repeated visits from the same client.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::PathBuf, time::Duration};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct CookieJar {
    path: PathBuf,
    cookies: HashMap<String, StoredCookie>,
}

impl CookieJar {
    /// Reads the jar, starting empty when the file is missing or unreadable.
    pub fn load(path: PathBuf) -> Self {
        let cookies = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt cookie jar");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self { path, cookies }
    }

    /// Value of a cookie that has not expired yet.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_at(name, Utc::now())
    }

    fn get_at(&self, name: &str, now: DateTime<Utc>) -> Option<&str> {
        self.cookies
            .get(name)
            .filter(|c| c.expires_at > now)
            .map(|c| c.value.as_str())
    }

    pub fn set(&mut self, name: &str, value: String, max_age: Duration) {
        let max_age = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        let expires_at = Utc::now().checked_add_signed(max_age).unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.cookies.insert(name.to_string(), StoredCookie { value, expires_at });
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
        }
        let now = Utc::now();
        let live: HashMap<&String, &StoredCookie> =
            self.cookies.iter().filter(|(_, c)| c.expires_at > now).collect();
        let json = serde_json::to_string_pretty(&live).context("Failed to serialize cookies")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write cookie jar: {}", self.path.display()))?;
        Ok(())
    }
}
