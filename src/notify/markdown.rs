// src/notify/markdown.rs
//! Markdown digest of a ranked run result.

use chrono::{DateTime, Local};
use std::fmt::Write as _;

use crate::ingest::providers::labels;
use crate::ingest::types::Item;

/// Rendered message: a short title plus the markdown body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Digest {
    pub title: String,
    pub text: String,
}

fn rank_icon(rank: usize) -> String {
    match rank {
        1 => "🥇".to_string(),
        2 => "🥈".to_string(),
        3 => "🥉".to_string(),
        n => format!("{n}."),
    }
}

/// Five-slot star bar on a 10-point scale: one full star per 2 points,
/// a half star for a remainder of at least 1.
pub fn star_bar(score: f64) -> String {
    let s = score.clamp(0.0, 10.0);
    let full = (s / 2.0).floor() as usize;
    let half = usize::from(s % 2.0 >= 1.0);
    let empty = 5usize.saturating_sub(full + half);
    format!("{}{}{}", "⭐".repeat(full), "✨".repeat(half), "☆".repeat(empty))
}

fn source_tag(source: &str) -> String {
    let tag = match source {
        labels::DOUBAN_TOP250 => "🔸 经典",
        labels::DOUBAN_HOT => "🔴 热门",
        labels::DOUBAN_LATEST => "🟢 最新",
        labels::MAOYAN_TOP100 => "🟡 榜单",
        labels::MAOYAN_REALTIME => "💰 票房",
        labels::BILIBILI_MOVIE => "📺 视频",
        labels::TENCENT_VIDEO => "💻 平台",
        other => return format!("📌 {other}"),
    };
    tag.to_string()
}

fn display_score(it: &Item) -> f64 {
    it.composite_score.unwrap_or(it.score)
}

/// Render `items` (already ranked) as a digest stamped with `now`.
pub fn render(items: &[Item], now: DateTime<Local>) -> Digest {
    if items.is_empty() {
        return Digest {
            title: "🎬 今日电影热点".to_string(),
            text: "## 🎬 今日电影热点\n\n暂无热门电影数据".to_string(),
        };
    }

    let mut text = String::new();
    let _ = write!(
        text,
        "## 🎬 今日热门电影推荐\n\n**📊 共推荐 {} 部热门电影**\n\n---\n\n",
        items.len()
    );

    for (i, it) in items.iter().enumerate() {
        let title = it.title.replace(['\n', '\r'], " ");
        let score = display_score(it);
        let _ = write!(
            text,
            "{} {}  \n   {} `{:.1}`  \n   {}  \n   🔗 [查看详情]({})  \n\n",
            rank_icon(i + 1),
            title.trim(),
            star_bar(score),
            score,
            source_tag(&it.source),
            it.url
        );
    }

    text.push_str("---\n\n### 📈 来源分布统计\n\n");
    for (source, count) in distribution(items) {
        let pct = count as f64 / items.len() as f64 * 100.0;
        let bar = "█".repeat((pct / 5.0) as usize);
        let _ = writeln!(text, "- **{source}**: {count}部 {bar} ({pct:.1}%)  ");
    }

    let _ = write!(
        text,
        "\n---\n\n### 💡 推荐说明  \n🎯 **推荐算法**: 基于多维度综合评分，综合考量影片热度、时效性和平台权重  \n⏰ **更新时间**: {}  \n📱 **数据来源**: 豆瓣、猫眼、B站、腾讯视频等主流影视平台  \n\n> 💝 每日精选推荐，发现好电影！",
        now.format("%Y-%m-%d %H:%M:%S")
    );

    Digest {
        title: format!("🎬 热门电影推荐 {}", now.format("%m-%d")),
        text,
    }
}

/// (source, count), most frequent first; ties in first-appearance order.
pub fn distribution(items: &[Item]) -> Vec<(&str, usize)> {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for it in items {
        match counts.iter_mut().find(|(s, _)| *s == it.source) {
            Some((_, n)) => *n += 1,
            None => counts.push((it.source.as_str(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts
}
