//! Exponential backoff around any [`HttpClient`].
//!
//! Retried:
//! - timeouts and connection failures
//! - 500, 502, 503 and 504 responses
//!
//! Everything else (4xx, malformed requests) is returned on the first attempt.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{HttpClient, HttpRequest, HttpResponse};
use crate::error::HttpError;

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const DEFAULT_BACKOFF_FACTOR_SECS: f64 = 0.2;

const RETRY_STATUSES: [StatusCode; 4] = [
    StatusCode::INTERNAL_SERVER_ERROR,
    StatusCode::BAD_GATEWAY,
    StatusCode::SERVICE_UNAVAILABLE,
    StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Attempts after the first one.
    pub max_retries: u32,
    /// Delay before retry `n` is `backoff_factor_secs * 2^(n - 1)`.
    pub backoff_factor_secs: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: DEFAULT_MAX_RETRIES, backoff_factor_secs: DEFAULT_BACKOFF_FACTOR_SECS }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_factor_secs: f64) -> Self {
        Self { max_retries, backoff_factor_secs }
    }

    /// Delay before the given retry (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        let secs = self.backoff_factor_secs.max(0.0) * f64::from(1u32 << exponent);
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn is_retryable_status(status: StatusCode) -> bool {
        RETRY_STATUSES.contains(&status)
    }
}

#[derive(Debug)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl<C: HttpClient> HttpClient for RetryingClient<C> {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut retry = 0;

        loop {
            let result = self.inner.execute(request).await;
            let exhausted = retry >= self.policy.max_retries;

            match result {
                Ok(response) if Self::should_retry_response(&response) && !exhausted => {
                    tracing::warn!(
                        url = %request.url,
                        status = %response.status,
                        attempt = retry + 1,
                        "retryable status from upstream"
                    );
                }
                Err(err) if err.is_transient() && !exhausted => {
                    tracing::warn!(url = %request.url, attempt = retry + 1, error = %err, "transient request failure");
                }
                Ok(response) => {
                    if retry > 0 {
                        tracing::debug!(url = %request.url, retries = retry, "request finished after retries");
                    }
                    return Ok(response);
                }
                Err(err) => {
                    if exhausted && err.is_transient() {
                        tracing::error!(url = %request.url, attempts = retry + 1, "all retry attempts exhausted");
                    }
                    return Err(err);
                }
            }

            retry += 1;
            let delay = self.policy.delay_for_retry(retry);
            tracing::debug!(retry, ?delay, "backing off");
            tokio::time::sleep(delay).await;
        }
    }
}

impl<C> RetryingClient<C> {
    fn should_retry_response(response: &HttpResponse) -> bool {
        RetryPolicy::is_retryable_status(response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::testing::ScriptedClient;
    use std::sync::Arc;

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, 0.001)
    }

    #[test]
    fn default_delays_double_from_point_two_seconds() {
        let policy = RetryPolicy::default();
        let delays: Vec<u128> = (1..=5).map(|n| policy.delay_for_retry(n).as_millis()).collect();

        assert_eq!(policy.max_retries, 5);
        assert_eq!(delays, vec![200, 400, 800, 1600, 3200]);
    }

    #[test]
    fn retryable_statuses() {
        assert!(RetryPolicy::is_retryable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(RetryPolicy::is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(RetryPolicy::is_retryable_status(StatusCode::SERVICE_UNAVAILABLE));
        assert!(RetryPolicy::is_retryable_status(StatusCode::GATEWAY_TIMEOUT));

        assert!(!RetryPolicy::is_retryable_status(StatusCode::OK));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::NOT_FOUND));
        assert!(!RetryPolicy::is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let inner = Arc::new(ScriptedClient::new(vec![
            Err(HttpError::Timeout("slow".into())),
            Ok(HttpResponse::new(StatusCode::BAD_GATEWAY, "")),
            Ok(HttpResponse::new(StatusCode::OK, "done")),
        ]));
        let client = RetryingClient::new(inner.clone(), fast_policy(5));

        let res = client.execute(&HttpRequest::get("http://x")).await.unwrap();

        assert_eq!(res.body, "done");
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let replies = (0..10).map(|_| Err(HttpError::Connect("refused".into()))).collect();
        let inner = Arc::new(ScriptedClient::new(replies));
        let client = RetryingClient::new(inner.clone(), fast_policy(5));

        let err = client.execute(&HttpRequest::get("http://x")).await.unwrap_err();

        assert!(matches!(err, HttpError::Connect(_)));
        assert_eq!(inner.calls(), 6);
    }

    #[tokio::test]
    async fn returns_last_retryable_response_when_exhausted() {
        let replies = (0..4)
            .map(|_| Ok(HttpResponse::new(StatusCode::SERVICE_UNAVAILABLE, "busy")))
            .collect();
        let inner = Arc::new(ScriptedClient::new(replies));
        let client = RetryingClient::new(inner.clone(), fast_policy(2));

        let res = client.execute(&HttpRequest::get("http://x")).await.unwrap();

        assert_eq!(res.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let inner = Arc::new(ScriptedClient::new(vec![
            Ok(HttpResponse::new(StatusCode::NOT_FOUND, "")),
            Ok(HttpResponse::new(StatusCode::OK, "unused")),
        ]));
        let client = RetryingClient::new(inner.clone(), fast_policy(5));

        let res = client.execute(&HttpRequest::get("http://x")).await.unwrap();

        assert_eq!(res.status, StatusCode::NOT_FOUND);
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test]
    async fn non_transient_errors_are_not_retried() {
        let inner = Arc::new(ScriptedClient::new(vec![Err(HttpError::InvalidRequest("bad url".into()))]));
        let client = RetryingClient::new(inner.clone(), fast_policy(5));

        let err = client.execute(&HttpRequest::get("http://x")).await.unwrap_err();

        assert!(matches!(err, HttpError::InvalidRequest(_)));
        assert_eq!(inner.calls(), 1);
    }
}
