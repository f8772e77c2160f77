// src/ingest/format.rs
//! Payload-shape variants for adapters.
//!
//! A source implements exactly one of [`HtmlSource`], [`JsonSource`] or
//! [`TextSource`] and is wrapped in the matching adapter type, which does the
//! decoding and exposes the uniform [`SourceAdapter`] surface to the
//! orchestrator.

use scraper::Html;
use serde_json::Value;

use crate::ingest::types::{FetchTarget, Item, SourceAdapter};

/// Identity and request shaping shared by every source.
pub trait SourceInfo: Send + Sync {
    fn name(&self) -> &str;
    fn target(&self) -> Option<FetchTarget>;
}

/// Sources whose payload is an HTML page.
pub trait HtmlSource: SourceInfo {
    fn extract(&self, doc: &Html) -> Vec<Item>;
}

/// Sources whose payload is a JSON document.
pub trait JsonSource: SourceInfo {
    fn extract(&self, doc: &Value) -> Vec<Item>;
}

/// Sources scraped from raw text with regular expressions.
pub trait TextSource: SourceInfo {
    fn extract(&self, body: &str) -> Vec<Item>;
}

pub struct HtmlAdapter<S>(pub S);
pub struct JsonAdapter<S>(pub S);
pub struct RegexAdapter<S>(pub S);

impl<S: HtmlSource> SourceAdapter for HtmlAdapter<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn target(&self) -> Option<FetchTarget> {
        self.0.target()
    }

    fn parse(&self, raw: &str) -> Vec<Item> {
        let doc = Html::parse_document(raw);
        self.0.extract(&doc)
    }
}

impl<S: JsonSource> SourceAdapter for JsonAdapter<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn target(&self) -> Option<FetchTarget> {
        self.0.target()
    }

    fn parse(&self, raw: &str) -> Vec<Item> {
        match serde_json::from_str::<Value>(raw) {
            Ok(doc) => self.0.extract(&doc),
            Err(e) => {
                tracing::warn!(
                    adapter = self.0.name(),
                    error = %e,
                    preview = %preview(raw, 200),
                    "payload is not valid JSON"
                );
                Vec::new()
            }
        }
    }
}

impl<S: TextSource> SourceAdapter for RegexAdapter<S> {
    fn name(&self) -> &str {
        self.0.name()
    }

    fn target(&self) -> Option<FetchTarget> {
        self.0.target()
    }

    fn parse(&self, raw: &str) -> Vec<Item> {
        self.0.extract(raw)
    }
}

/// Read a score that sources publish either as a number or a numeric string.
/// `"0"`, empty strings and garbage all read as 0.
pub(crate) fn score_value(v: Option<&Value>) -> f64 {
    match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Non-empty trimmed string field.
pub(crate) fn str_field<'a>(v: &'a Value, key: &str) -> Option<&'a str> {
    v.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub(crate) fn preview(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
