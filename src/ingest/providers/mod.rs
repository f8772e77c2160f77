// src/ingest/providers/mod.rs
pub mod bilibili_movie;
pub mod douban_hot;
pub mod douban_latest;
pub mod douban_top250;
pub mod maoyan_realtime;
pub mod maoyan_top100;
pub mod tencent_video;

use once_cell::sync::OnceCell;
use regex::Regex;
use std::sync::Arc;

use crate::ingest::format::{HtmlAdapter, JsonAdapter, RegexAdapter};
use crate::ingest::types::SourceAdapter;

/// Source labels stamped on items. They double as credibility-table keys.
pub mod labels {
    pub const DOUBAN_TOP250: &str = "豆瓣Top250";
    pub const DOUBAN_HOT: &str = "豆瓣热门";
    pub const DOUBAN_LATEST: &str = "豆瓣最新";
    pub const MAOYAN_TOP100: &str = "猫眼TOP100";
    pub const MAOYAN_REALTIME: &str = "猫眼实时票房";
    pub const BILIBILI_MOVIE: &str = "B站电影热门";
    pub const TENCENT_VIDEO: &str = "腾讯视频热门";
}

/// Every built-in adapter, wrapped in its payload variant.
pub fn all() -> Vec<Arc<dyn SourceAdapter>> {
    vec![
        Arc::new(HtmlAdapter(douban_top250::DoubanTop250)),
        Arc::new(JsonAdapter(douban_hot::DoubanHot)),
        Arc::new(JsonAdapter(douban_latest::DoubanLatest)),
        Arc::new(RegexAdapter(maoyan_top100::MaoyanTop100)),
        Arc::new(JsonAdapter(maoyan_realtime::MaoyanRealtime::default())),
        Arc::new(JsonAdapter(bilibili_movie::BilibiliMovie)),
        Arc::new(RegexAdapter(tencent_video::TencentVideo)),
    ]
}

/// Clean scraped text: decode HTML entities, strip tags, collapse whitespace.
pub fn clean_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);

    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let stripped = re_tags.replace_all(&decoded, "");

    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());
    re_ws.replace_all(&stripped, " ").trim().to_string()
}
