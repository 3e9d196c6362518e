use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::{collections::HashMap, fmt::Debug, time::Duration};

use super::{HttpClient, HttpRequest, HttpResponse};
use crate::error::HttpError;

mod sqlite;

pub use sqlite::SqliteCacheStore;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

/// Where cached responses live.
///
/// `fresh_after` is the cutoff: entries stored at or before it are stale.
pub trait CacheStore: Send + Sync + Debug {
    fn get(&self, key: &str, fresh_after: DateTime<Utc>) -> Result<Option<HttpResponse>>;

    fn put(&self, key: &str, response: &HttpResponse, stored_at: DateTime<Utc>) -> Result<()>;

    /// Drops stale entries and returns how many were removed.
    fn purge(&self, fresh_after: DateTime<Utc>) -> Result<usize>;

    fn len(&self) -> Result<usize>;
}

#[derive(Debug, Clone)]
struct Entry {
    stored_at: DateTime<Utc>,
    response: HttpResponse,
}

/// Per-process store.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCacheStore {
    fn get(&self, key: &str, fresh_after: DateTime<Utc>) -> Result<Option<HttpResponse>> {
        Ok(self
            .entries
            .lock()
            .get(key)
            .filter(|e| e.stored_at > fresh_after)
            .map(|e| e.response.clone()))
    }

    fn put(&self, key: &str, response: &HttpResponse, stored_at: DateTime<Utc>) -> Result<()> {
        self.entries
            .lock()
            .insert(key.to_string(), Entry { stored_at, response: response.clone() });
        Ok(())
    }

    fn purge(&self, fresh_after: DateTime<Utc>) -> Result<usize> {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, e| e.stored_at > fresh_after);
        Ok(before - entries.len())
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries.lock().len())
    }
}

/// Keeps successful responses for `ttl`, keyed by request.
///
/// Stale entries are purged whenever a new response is stored. A failing
/// store is logged and treated as a miss.
#[derive(Debug)]
pub struct CachingClient<C> {
    inner: C,
    ttl: Duration,
    store: Box<dyn CacheStore>,
}

impl<C: HttpClient> CachingClient<C> {
    pub fn new(inner: C) -> Self {
        Self::with_ttl(inner, DEFAULT_TTL)
    }

    pub fn with_ttl(inner: C, ttl: Duration) -> Self {
        Self::with_store(inner, ttl, Box::new(MemoryCacheStore::new()))
    }

    pub fn with_store(inner: C, ttl: Duration, store: Box<dyn CacheStore>) -> Self {
        Self { inner, ttl, store }
    }

    pub fn len(&self) -> usize {
        self.store.len().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fresh_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        chrono::Duration::from_std(self.ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for CachingClient<C> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let key = request.cache_key();

        match self.store.get(&key, self.fresh_after(Utc::now())) {
            Ok(Some(hit)) => {
                tracing::debug!(%key, "response cache hit");
                return Ok(hit);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(%key, error = %e, "response cache read failed"),
        }

        let response = self.inner.execute(request).await?;

        if response.is_success() {
            let now = Utc::now();
            match self.store.purge(self.fresh_after(now)) {
                Ok(0) => {}
                Ok(purged) => tracing::debug!(purged, "dropped stale cache entries"),
                Err(e) => tracing::warn!(error = %e, "response cache purge failed"),
            }
            if let Err(e) = self.store.put(&key, &response, now) {
                tracing::warn!(%key, error = %e, "response cache write failed");
            }
        }

        Ok(response)
    }
}
