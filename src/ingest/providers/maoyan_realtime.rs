// src/ingest/providers/maoyan_realtime.rs
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine as _;
use md5::{Digest, Md5};
use serde_json::Value;

use super::labels;
use crate::ingest::fetch::DEFAULT_USER_AGENT;
use crate::ingest::format::{JsonSource, SourceInfo};
use crate::ingest::types::{FetchTarget, Item};

const API: &str = "https://piaofang.maoyan.com/dashboard-ajax/movie";
const DASHBOARD: &str = "https://piaofang.maoyan.com/dashboard/movie";
const CHANNEL_ID: &str = "40009";
const S_VERSION: &str = "2";
const SIGN_KEY: &str = "A013F70DB97834C0A5492378BD76C53A";

/// Maoyan real-time box office dashboard. The API wants a signed query, so
/// every call to `target` produces a fresh timestamp and signature.
pub struct MaoyanRealtime {
    user_agent: String,
}

impl Default for MaoyanRealtime {
    fn default() -> Self {
        Self::new(DEFAULT_USER_AGENT)
    }
}

impl MaoyanRealtime {
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            user_agent: user_agent.into(),
        }
    }
}

/// MD5 over the canonical query string, hex encoded.
pub(crate) fn sign(timestamp_ms: i64, ua_b64: &str, index: u32) -> String {
    let content = format!(
        "method=GET&timeStamp={timestamp_ms}&User-Agent={ua_b64}&index={index}&channelId={CHANNEL_ID}&sVersion={S_VERSION}&key={SIGN_KEY}"
    );
    let digest = Md5::digest(content.as_bytes());
    let mut out = String::with_capacity(32);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

impl SourceInfo for MaoyanRealtime {
    fn name(&self) -> &str {
        "maoyan_realtime"
    }

    fn target(&self) -> Option<FetchTarget> {
        let ts = chrono::Utc::now().timestamp_millis();
        let ua_b64 = B64.encode(self.user_agent.as_bytes());
        let index: u32 = rand::random_range(0..=1000);
        let sign_key = sign(ts, &ua_b64, index);

        let url = match reqwest::Url::parse_with_params(
            API,
            &[
                ("timeStamp", ts.to_string()),
                ("User-Agent", ua_b64),
                ("index", index.to_string()),
                ("signKey", sign_key),
                ("channelId", CHANNEL_ID.to_string()),
                ("sVersion", S_VERSION.to_string()),
            ],
        ) {
            Ok(u) => u,
            Err(e) => {
                tracing::warn!(adapter = "maoyan_realtime", error = %e, "cannot build signed url");
                return None;
            }
        };

        Some(
            FetchTarget::new(url.to_string())
                .header("User-Agent", self.user_agent.clone())
                .header("Referer", DASHBOARD)
                .header("Accept", "application/json, text/plain, */*"),
        )
    }
}

impl JsonSource for MaoyanRealtime {
    fn extract(&self, doc: &Value) -> Vec<Item> {
        let Some(list) = doc.pointer("/movieList/list").and_then(Value::as_array) else {
            tracing::warn!(adapter = "maoyan_realtime", "response has no movieList.list");
            return Vec::new();
        };
        // Box office rows carry no rating; score stays 0.
        list.iter()
            .filter_map(|row| {
                let name = row.pointer("/movieInfo/movieName").and_then(Value::as_str)?;
                Item::new(name, 0.0, DASHBOARD, labels::MAOYAN_REALTIME)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::format::JsonAdapter;
    use crate::ingest::types::SourceAdapter;

    #[test]
    fn signature_is_stable_hex() {
        let a = sign(1_700_000_000_000, "VUE=", 42);
        let b = sign(1_700_000_000_000, "VUE=", 42);
        assert_eq!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, sign(1_700_000_000_001, "VUE=", 42));
    }

    #[test]
    fn target_carries_signed_query() {
        let t = MaoyanRealtime::new("UA/1.0").target().unwrap();
        assert!(t.url.starts_with(API));
        for key in ["timeStamp=", "signKey=", "index=", "channelId=40009", "sVersion=2"] {
            assert!(t.url.contains(key), "missing {key} in {}", t.url);
        }
        assert!(t.headers.iter().any(|(k, v)| k == "User-Agent" && v == "UA/1.0"));
    }

    #[test]
    fn parses_box_office_rows() {
        let body = r#"{"movieList":{"list":[
            {"movieInfo":{"movieName":"热辣滚烫"},"boxRate":"40%"},
            {"movieInfo":{"movieName":"  "}},
            {"boxRate":"1%"},
            {"movieInfo":{"movieName":"飞驰人生2"}}
        ]}}"#;
        let items = JsonAdapter(MaoyanRealtime::default()).parse(body);
        let titles: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
        assert_eq!(titles, vec!["热辣滚烫", "飞驰人生2"]);
        assert!(items.iter().all(|i| i.score == 0.0 && i.url == DASHBOARD));
    }
}
