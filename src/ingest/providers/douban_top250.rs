// src/ingest/providers/douban_top250.rs
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use super::{clean_text, labels};
use crate::ingest::format::{HtmlSource, SourceInfo};
use crate::ingest::types::{FetchTarget, Item};

const URL: &str = "https://movie.douban.com/top250";

static ITEM: Lazy<Selector> = Lazy::new(|| Selector::parse("div.item").unwrap());
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("span.title").unwrap());
static RATING: Lazy<Selector> = Lazy::new(|| Selector::parse("span.rating_num").unwrap());
static LINK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.hd > a[href]").unwrap());

/// Douban Top 250 list page (first page, 25 films).
pub struct DoubanTop250;

impl SourceInfo for DoubanTop250 {
    fn name(&self) -> &str {
        "douban_top250"
    }

    fn target(&self) -> Option<FetchTarget> {
        Some(FetchTarget::new(URL).header("Referer", "https://movie.douban.com/"))
    }
}

impl HtmlSource for DoubanTop250 {
    fn extract(&self, doc: &Html) -> Vec<Item> {
        doc.select(&ITEM).filter_map(parse_entry).collect()
    }
}

fn parse_entry(entry: ElementRef<'_>) -> Option<Item> {
    // The first span.title is the Chinese title; later ones are aliases.
    let title = entry
        .select(&TITLE)
        .next()
        .map(|t| clean_text(&t.text().collect::<String>()))?;
    let score = entry
        .select(&RATING)
        .next()
        .and_then(|r| r.text().collect::<String>().trim().parse::<f64>().ok())
        .unwrap_or(0.0);
    let url = entry.select(&LINK).next()?.value().attr("href")?;

    let item = Item::new(title, score, url, labels::DOUBAN_TOP250);
    if item.is_none() {
        tracing::debug!(adapter = "douban_top250", "skipping entry without title/url");
    }
    item
}
