// src/ingest/fetch.rs
//! Transport abstraction plus the per-adapter retry loop.

use async_trait::async_trait;
use metrics::counter;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;

use crate::ingest::types::FetchTarget;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("no fetch attempt allowed (max_retries = 0)")]
    NoAttempts,
}

impl FetchError {
    /// Timeouts and transport failures are worth another attempt; a status
    /// code is the server's answer and is not retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Timeout(_) | FetchError::Transport(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(s) => FetchError::Status(s.as_u16()),
            None => FetchError::Transport(e.to_string()),
        }
    }
}

/// Retry/timeout knobs for one adapter fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Total number of attempts (0 disables fetching).
    pub max_retries: u32,
    pub timeout: Duration,
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            backoff: Duration::from_secs(1),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// One GET of the target; returns the body text.
    async fn get(&self, target: &FetchTarget) -> Result<String, FetchError>;
}

/// reqwest-backed transport shared by all adapters.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(user_agent: &str) -> anyhow::Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_static("zh-CN,zh;q=0.8,zh-TW;q=0.7,zh-HK;q=0.5,en-US;q=0.3,en;q=0.2"),
        );
        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, target: &FetchTarget) -> Result<String, FetchError> {
        let mut req = self.client.get(&target.url);
        for (name, value) in &target.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(n), Ok(v)) => req = req.header(n, v),
                _ => tracing::debug!(header = %name, "skipping invalid header"),
            }
        }

        let resp = req.send().await?;
        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }
        // Some sources mislabel their charset; decode lossily instead of failing.
        let bytes = resp.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Fetch `target` with up to `policy.max_retries` attempts, each bounded by
/// `policy.timeout`. Retryable failures sleep `policy.backoff` before the next
/// attempt; there is no sleep after the last one.
pub async fn fetch_with_retry(
    transport: &dyn Transport,
    adapter: &str,
    target: &FetchTarget,
    policy: &FetchPolicy,
) -> Result<String, FetchError> {
    let mut last = FetchError::NoAttempts;

    for attempt in 1..=policy.max_retries {
        counter!("fetch_attempts_total").increment(1);
        let outcome = match tokio::time::timeout(policy.timeout, transport.get(target)).await {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(policy.timeout)),
        };

        match outcome {
            Ok(body) => return Ok(body),
            Err(e) if e.is_retryable() => {
                tracing::warn!(
                    adapter,
                    url = %target.url,
                    attempt,
                    max_attempts = policy.max_retries,
                    error = %e,
                    "fetch attempt failed"
                );
                last = e;
                if attempt < policy.max_retries {
                    tokio::time::sleep(policy.backoff).await;
                }
            }
            Err(e) => {
                tracing::warn!(adapter, url = %target.url, error = %e, "fetch rejected");
                return Err(e);
            }
        }
    }

    Err(last)
}
