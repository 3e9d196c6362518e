//! Minimal HTTP capability used by the resolver and the forecast fetcher.
//!
//! `HttpClient` is the seam: the reqwest-backed client does the I/O, while
//! [`cache::CachingClient`] and [`retry::RetryingClient`] wrap any other client
//! to add response caching and backoff retries.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::{fmt::Debug, time::Duration};

use crate::error::HttpError;

pub mod cache;
pub mod retry;

pub use cache::{CacheStore, CachingClient, MemoryCacheStore, SqliteCacheStore};
pub use retry::{RetryPolicy, RetryingClient};

const USER_AGENT: &str = concat!("cityweather/", env!("CARGO_PKG_VERSION"));

/// A read-only GET request.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpRequest {
    pub url: String,
    pub query: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self { url: url.into(), query: Vec::new() }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Stable identity of the request, used as the cache key.
    pub fn cache_key(&self) -> String {
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("GET {}?{}", self.url, query)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: StatusCode, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

#[async_trait]
pub trait HttpClient: Send + Sync + Debug {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError>;
}

#[async_trait]
impl<T: HttpClient + ?Sized> HttpClient for std::sync::Arc<T> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        (**self).execute(request).await
    }
}

/// Plain reqwest client, one attempt per call.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: Client,
}

impl ReqwestClient {
    pub fn new(timeout: Duration) -> Result<Self, HttpError> {
        let http = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        tracing::debug!(url = %request.url, "sending GET request");

        let res = self.http.get(&request.url).query(&request.query).send().await?;
        let status = res.status();
        let body = res.text().await?;

        Ok(HttpResponse { status, body })
    }
}

/// Shortens a response body for log and error messages.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Scripted client: answers with queued results and counts calls.
    #[derive(Debug, Default)]
    pub struct ScriptedClient {
        replies: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedClient {
        pub fn new(replies: Vec<Result<HttpResponse, HttpError>>) -> Self {
            Self { replies: Mutex::new(replies.into()), calls: Mutex::new(0) }
        }

        pub fn calls(&self) -> usize {
            *self.calls.lock()
        }
    }

    #[async_trait]
    impl HttpClient for ScriptedClient {
        async fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, HttpError> {
            *self.calls.lock() += 1;
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(HttpError::Transport("script exhausted".into())))
        }
    }
}
