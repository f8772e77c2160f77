// src/ingest/providers/tencent_video.rs
//! Tencent Video movie channel. The page has no stable API, so extraction
//! runs three strategies in order: embedded JSON blobs, title/vid regex
//! pairs, and (only when both found nothing) a class-name fallback.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;

use super::{clean_text, labels};
use crate::ingest::format::{SourceInfo, TextSource};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str = "https://v.qq.com/channel/movie";
const DEFAULT_DESCRIPTION: &str = "腾讯视频热门电影";
const REGEX_SCORE: f64 = 7.5;
const FALLBACK_SCORE: f64 = 7.0;
const UNPARSABLE_SCORE: f64 = 7.0;
const MAX_REGEX_ITEMS: usize = 20;
const MAX_FALLBACK_ITEMS: usize = 15;

static JSON_BLOBS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?s)window\.__INITIAL_STATE__\s*=\s*(\{.*?\});",
        r#"(?s)"movieList":\s*(\[.*?\])"#,
        r#"(?s)"videoList":\s*(\[.*?\])"#,
        r#"(?s)"items":\s*(\[.*?\])"#,
        r#"(?s)"list":\s*(\[.*?\])"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// (pattern, title group, vid group)
static PAIRS: Lazy<Vec<(Regex, usize, usize)>> = Lazy::new(|| {
    vec![
        (Regex::new(r#""title":"([^"]+)".*?"vid":"([^"]+)""#).unwrap(), 1, 2),
        (Regex::new(r#""title":"([^"]+)".*?"videoId":"([^"]+)""#).unwrap(), 1, 2),
        (Regex::new(r#"data-title="([^"]+)".*?data-vid="([^"]+)""#).unwrap(), 1, 2),
        (
            Regex::new(r#"<a[^>]*href="[^"]*cover/([^"/]+)\.html"[^>]*title="([^"]+)""#).unwrap(),
            2,
            1,
        ),
    ]
});

static FALLBACK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<[^>]*class="[^"]*(?:title|name)[^"]*"[^>]*>([^<]+)</[^>]*>"#).unwrap()
});

static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+\.?\d*)").unwrap());
static TRAILING_OBJ_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\}").unwrap());
static TRAILING_ARR_COMMA: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*\]").unwrap());

const NAV_WORDS: [&str; 5] = ["首页", "登录", "注册", "搜索", "热门"];

pub struct TencentVideo;

impl SourceInfo for TencentVideo {
    fn name(&self) -> &str {
        "tencent_video"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(
            FetchTarget::new(URL)
                .header("Referer", "https://v.qq.com/")
                .header("Origin", "https://v.qq.com")
                .header("Accept-Language", "zh-CN,zh;q=0.9,en;q=0.8")
                .header("Sec-Fetch-Dest", "document")
                .header("Sec-Fetch-Mode", "navigate")
                .header("Sec-Fetch-Site", "same-site"),
        )
    }
}

impl TextSource for TencentVideo {
    fn extract(&self, body: &str) -> Vec<Item> {
        let mut items = from_embedded_json(body);
        items.extend(from_pairs(body));
        if items.is_empty() {
            items = from_fallback(body);
        }
        unique_by_title(items)
    }
}

fn from_embedded_json(body: &str) -> Vec<Item> {
    let mut out = Vec::new();
    for re in JSON_BLOBS.iter() {
        for cap in re.captures_iter(body) {
            if let Some(doc) = cap.get(1).and_then(|m| decode_blob(m.as_str())) {
                collect_movies(&doc, &mut out);
            }
        }
    }
    out
}

/// Parse a scraped JSON fragment, retrying once with escaped quotes and
/// trailing commas repaired.
fn decode_blob(raw: &str) -> Option<Value> {
    if let Ok(v) = serde_json::from_str(raw) {
        return Some(v);
    }
    let unescaped = raw.replace("\\\"", "\"").replace("\\'", "'");
    let repaired = TRAILING_OBJ_COMMA.replace_all(&unescaped, "}");
    let repaired = TRAILING_ARR_COMMA.replace_all(&repaired, "]");
    serde_json::from_str(&repaired).ok()
}

fn collect_movies(v: &Value, out: &mut Vec<Item>) {
    match v {
        Value::Array(list) => out.extend(
            list.iter()
                .filter_map(Value::as_object)
                .filter_map(movie_from_object),
        ),
        Value::Object(map) => {
            for child in map.values() {
                collect_movies(child, out);
            }
        }
        _ => {}
    }
}

fn first_str<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// Like `first_str`, but also accepts numeric ids.
fn first_id(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match obj.get(*k) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn movie_from_object(obj: &Map<String, Value>) -> Option<Item> {
    let title = clean_text(first_str(obj, &["title", "name", "videoTitle", "albumName"])?);
    if title.chars().count() < 2 {
        return None;
    }

    let score = ["score", "rating", "scoreStr", "formatScore"]
        .iter()
        .find_map(|k| obj.get(*k))
        .map(|v| match v {
            Value::Number(n) => n.as_f64().unwrap_or(UNPARSABLE_SCORE),
            Value::String(s) => NUMBER
                .captures(s)
                .and_then(|c| c[1].parse::<f64>().ok())
                .unwrap_or(UNPARSABLE_SCORE),
            _ => UNPARSABLE_SCORE,
        })
        .unwrap_or(0.0)
        .clamp(6.0, 10.0);

    let url = match first_id(obj, &["vid", "videoId", "id", "albumId"]) {
        Some(vid) => format!("https://v.qq.com/x/cover/{vid}.html"),
        None => URL.to_string(),
    };

    let mut description = first_str(obj, &["description", "intro", "subTitle"])
        .unwrap_or(DEFAULT_DESCRIPTION)
        .to_string();
    if let Some(views) = first_id(obj, &["viewCount", "playCount", "hotValue"]) {
        description.push_str(&format!(" | 播放量: {views}"));
    }
    let description: String = description.chars().take(100).collect();

    Some(Item::new(title, score, url, labels::TENCENT_VIDEO)?.with_description(description))
}

fn from_pairs(body: &str) -> Vec<Item> {
    let mut out = Vec::new();
    for (re, title_group, vid_group) in PAIRS.iter() {
        for cap in re.captures_iter(body) {
            let (Some(title), Some(vid)) = (cap.get(*title_group), cap.get(*vid_group)) else {
                continue;
            };
            let title = clean_text(title.as_str());
            if title.chars().count() < 2 {
                continue;
            }
            let url = format!("https://v.qq.com/x/cover/{}.html", vid.as_str());
            if let Some(item) = Item::new(title, REGEX_SCORE, url, labels::TENCENT_VIDEO) {
                out.push(item.with_description(DEFAULT_DESCRIPTION));
            }
        }
    }
    out.truncate(MAX_REGEX_ITEMS);
    out
}

fn from_fallback(body: &str) -> Vec<Item> {
    FALLBACK
        .captures_iter(body)
        .take(MAX_FALLBACK_ITEMS)
        .filter_map(|cap| {
            let title = clean_text(&cap[1]);
            let len = title.chars().count();
            let is_nav = NAV_WORDS.iter().any(|w| title.contains(w));
            if len <= 2 || len >= 50 || is_nav {
                return None;
            }
            Item::new(title, FALLBACK_SCORE, URL, labels::TENCENT_VIDEO)
        })
        .collect()
}

/// The strategies overlap heavily; keep the first item per lowercased title.
fn unique_by_title(items: Vec<Item>) -> Vec<Item> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|it| seen.insert(it.title.trim().to_lowercase()))
        .collect()
}
