use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;

use super::{markdown, Notifier};
use crate::ingest::types::Item;

type HmacSha256 = Hmac<Sha256>;

/// DingTalk custom-robot webhook. With a secret, every request carries a
/// fresh `timestamp` + `sign` pair.
#[derive(Clone)]
pub struct DingTalkNotifier {
    webhook: String,
    secret: Option<String>,
    client: Client,
    timeout: Duration,
    max_retries: u8,
}

impl DingTalkNotifier {
    pub fn new(webhook: impl Into<String>, secret: Option<String>) -> Self {
        Self {
            webhook: webhook.into(),
            secret: secret.filter(|s| !s.trim().is_empty()),
            client: Client::new(),
            timeout: Duration::from_secs(10),
            max_retries: 3,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    pub fn with_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries.max(1);
        self
    }

    fn signed_url(&self) -> Result<String> {
        let Some(secret) = &self.secret else {
            return Ok(self.webhook.clone());
        };
        let ts = chrono::Utc::now().timestamp_millis();
        let sign = sign(ts, secret)?;
        let sep = if self.webhook.contains('?') { '&' } else { '?' };
        Ok(format!("{}{sep}timestamp={ts}&sign={sign}", self.webhook))
    }
}

/// 500ms doubling per attempt, capped at 32s.
fn retry_delay(attempt: u8) -> Duration {
    let shift = attempt.saturating_sub(1).min(MAX_BACKOFF_SHIFT);
    Duration::from_millis(500u64 << shift)
}

const MAX_BACKOFF_SHIFT: u8 = 6;

/// URL-encoded base64 of HMAC-SHA256(secret, "{ts}\n{secret}").
pub fn sign(timestamp_ms: i64, secret: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| anyhow!("invalid DingTalk secret: {e}"))?;
    mac.update(format!("{timestamp_ms}\n{secret}").as_bytes());
    let b64 = B64.encode(mac.finalize().into_bytes());
    Ok(encode_query_value(&b64))
}

/// Form-style encoding of a base64 string (`+` `/` `=` are the only specials).
fn encode_query_value(s: &str) -> String {
    s.replace('+', "%2B").replace('/', "%2F").replace('=', "%3D")
}

#[derive(Serialize)]
struct MarkdownBody<'a> {
    title: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct At {
    #[serde(rename = "isAtAll")]
    is_at_all: bool,
}

#[derive(Serialize)]
struct RobotMessage<'a> {
    msgtype: &'static str,
    markdown: MarkdownBody<'a>,
    at: At,
}

#[derive(Debug, Deserialize)]
struct RobotReply {
    #[serde(default = "unknown_errcode")]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

fn unknown_errcode() -> i64 {
    -1
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    fn name(&self) -> &str {
        "dingtalk"
    }

    async fn send(&self, items: &[Item]) -> Result<()> {
        let digest = markdown::render(items, chrono::Local::now());
        let payload = RobotMessage {
            msgtype: "markdown",
            markdown: MarkdownBody {
                title: &digest.title,
                text: &digest.text,
            },
            at: At { is_at_all: false },
        };

        let mut attempt: u8 = 0;
        loop {
            attempt += 1;
            let url = self.signed_url()?;
            let res = self
                .client
                .post(&url)
                .timeout(self.timeout)
                .json(&payload)
                .send()
                .await;

            let err = match res {
                Ok(rsp) => match rsp.error_for_status() {
                    Ok(rsp) => {
                        let reply: RobotReply =
                            rsp.json().await.context("decoding DingTalk reply")?;
                        // Application-level rejection (bad sign, keyword filter) is final.
                        if reply.errcode != 0 {
                            return Err(anyhow!(
                                "DingTalk rejected message: errcode={} errmsg={}",
                                reply.errcode,
                                reply.errmsg
                            ));
                        }
                        tracing::info!(items = items.len(), "DingTalk message sent");
                        return Ok(());
                    }
                    Err(e) => anyhow!("DingTalk webhook HTTP error: {e}"),
                },
                Err(e) => anyhow!("DingTalk webhook request failed: {e}"),
            };

            if attempt >= self.max_retries {
                return Err(err);
            }
            tracing::warn!(attempt, error = %err, "DingTalk send failed; retrying");
            tokio::time::sleep(retry_delay(attempt)).await;
        }
    }
}
