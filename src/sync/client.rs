//! Memos API client.
//!
//! Fetches one page of memos with `GET {endpoint}?limit=&offset=&rowStatus=NORMAL`.
//! A successful call returns the JSON array as-is. Transport errors, non-2xx
//! statuses and error objects (`{"message": ...}`) are retried with
//! exponential backoff before the page is given up on.

use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{Error, Result};
use crate::model::RemoteRecord;

/// `User-Agent` sent with every request.
pub const USER_AGENT: &str = concat!("memosync/", env!("CARGO_PKG_VERSION"));

/// Where the orchestrator gets its pages from.
///
/// Implemented by [`MemosClient`]; tests substitute in-memory sources.
pub trait RecordSource: Send + Sync {
    /// Fetch up to `limit` records starting at `offset`, newest first.
    fn fetch_page(
        &self,
        limit: u32,
        offset: u32,
    ) -> impl Future<Output = Result<Vec<RemoteRecord>>> + Send;

    /// Refresh any state derived from the configuration (auth header,
    /// endpoint, timeout).
    fn rebuild(&mut self, config: &SyncConfig) -> Result<()> {
        let _ = config;
        Ok(())
    }
}

/// How often and how patiently a page is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Delay unit; the wait after failed attempt `n` is `base_delay * 2^n`
    pub base_delay: Duration,
}

impl RetryPolicy {
    #[must_use]
    pub const fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Wait before the next attempt, after `failed` attempts so far.
    #[must_use]
    pub fn delay_after(&self, failed: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(failed)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_ATTEMPTS, Duration::from_secs(1))
    }
}

/// HTTP client for the Memos list endpoint.
#[derive(Debug, Clone)]
pub struct MemosClient {
    client: reqwest::Client,
    endpoint: String,
    retry: RetryPolicy,
}

impl MemosClient {
    /// Build a client with bearer auth and the configured timeout.
    ///
    /// # Errors
    ///
    /// Returns a `Config` error if the token is not a valid header value,
    /// or an HTTP error if the client cannot be built.
    pub fn new(config: &SyncConfig) -> Result<Self> {
        Ok(Self {
            client: build_http_client(config)?,
            endpoint: config.endpoint.trim().to_string(),
            retry: RetryPolicy::new(config.max_attempts.max(1), Duration::from_secs(1)),
        })
    }

    /// Override the retry policy.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn fetch_once(&self, limit: u32, offset: u32) -> Result<Vec<RemoteRecord>> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
                ("rowStatus", "NORMAL".to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        let value: Value = serde_json::from_str(&body).map_err(|e| {
            Error::MalformedResponse(format!("HTTP {status}: body is not JSON ({e})"))
        })?;

        if !status.is_success() {
            return Err(Error::MalformedResponse(format!(
                "HTTP {status}: {}",
                error_message(&value)
            )));
        }

        match value {
            Value::Array(_) => Ok(serde_json::from_value(value)?),
            other => Err(Error::MalformedResponse(error_message(&other))),
        }
    }
}

impl RecordSource for MemosClient {
    async fn fetch_page(&self, limit: u32, offset: u32) -> Result<Vec<RemoteRecord>> {
        let mut failed = 0;

        loop {
            match self.fetch_once(limit, offset).await {
                Ok(records) => {
                    debug!(offset, count = records.len(), "Fetched page");
                    return Ok(records);
                }
                Err(e) => {
                    failed += 1;
                    if failed >= self.retry.max_attempts {
                        return Err(Error::Fetch {
                            attempts: failed,
                            message: e.to_string(),
                        });
                    }

                    let delay = self.retry.delay_after(failed);
                    warn!(offset, attempt = failed, ?delay, error = %e, "Fetch failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn rebuild(&mut self, config: &SyncConfig) -> Result<()> {
        self.client = build_http_client(config)?;
        self.endpoint = config.endpoint.trim().to_string();
        self.retry.max_attempts = config.max_attempts.max(1);
        Ok(())
    }
}

fn build_http_client(config: &SyncConfig) -> Result<reqwest::Client> {
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.access_token.trim()))
        .map_err(|_| Error::Config("access_token contains characters not allowed in a header".into()))?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .user_agent(USER_AGENT)
        .timeout(config.request_timeout())
        .build()?)
}

/// Pull a human-readable message out of an error object.
fn error_message(value: &Value) -> String {
    ["message", "msg", "error"]
        .iter()
        .find_map(|field| match value.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        })
        .unwrap_or_else(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> SyncConfig {
        SyncConfig {
            endpoint: format!("{}/api/v1/memo", server.uri()),
            access_token: "tok-123".into(),
            heading_title: "Journal".into(),
            ..SyncConfig::default()
        }
    }

    fn client_for(server: &MockServer) -> MemosClient {
        MemosClient::new(&config_for(server))
            .unwrap()
            .with_retry(RetryPolicy::new(3, Duration::ZERO))
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn test_error_message_fields() {
        assert_eq!(error_message(&serde_json::json!({"message": "bad token"})), "bad token");
        assert_eq!(error_message(&serde_json::json!({"msg": "nope"})), "nope");
        assert_eq!(error_message(&serde_json::json!({"error": "denied"})), "denied");
        assert_eq!(error_message(&serde_json::json!({"code": 5})), "{\"code\":5}");
    }

    #[tokio::test]
    async fn test_fetch_page_sends_query_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/memo"))
            .and(query_param("limit", "50"))
            .and(query_param("offset", "100"))
            .and(query_param("rowStatus", "NORMAL"))
            .and(header("authorization", "Bearer tok-123"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"content": "hello", "createdTs": 1_700_000_000, "resourceList": []},
                {"content": "", "createdTs": 1_699_999_000}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let records = client_for(&server).fetch_page(50, 100).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].content, "hello");
        assert_eq!(records[1].created_ts, 1_699_999_000);
    }

    #[tokio::test]
    async fn test_error_object_is_retried_then_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "token expired"})),
            )
            .expect(3)
            .mount(&server)
            .await;

        let err = client_for(&server).fetch_page(50, 0).await.unwrap_err();
        match err {
            Error::Fetch { attempts, message } => {
                assert_eq!(attempts, 3);
                assert!(message.contains("token expired"));
            }
            other => panic!("expected fetch error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transient_failure_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_json(serde_json::json!({"error": "busy"})))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let records = client_for(&server).fetch_page(50, 0).await.unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_rebuild_switches_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("authorization", "Bearer tok-new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server).with_retry(RetryPolicy::new(1, Duration::ZERO));
        let mut config = config_for(&server);
        config.access_token = "tok-new".into();
        config.max_attempts = 1;
        client.rebuild(&config).unwrap();

        assert!(client.fetch_page(10, 0).await.is_ok());
    }

    #[test]
    fn test_invalid_token_is_config_error() {
        let config = SyncConfig {
            access_token: "bad\ntoken".into(),
            ..SyncConfig::default()
        };
        assert!(matches!(MemosClient::new(&config), Err(Error::Config(_))));
    }
}
