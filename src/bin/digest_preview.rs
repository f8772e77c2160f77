//! Render a digest from a few canned items (stdout), or push it through the
//! configured notifier with `--send`.

use anyhow::Result;
use chrono::Local;

use movie_tracker::ingest::providers::labels;
use movie_tracker::notify::{self, render};
use movie_tracker::{Aggregator, Item, TrackerConfig};

fn sample() -> Vec<Item> {
    [
        ("肖申克的救赎", 9.7, "https://movie.douban.com/subject/1292052/", labels::DOUBAN_TOP250),
        ("奥本海默", 8.8, "https://movie.douban.com/subject/35593344/", labels::DOUBAN_HOT),
        ("热辣滚烫", 0.0, "https://piaofang.maoyan.com/dashboard/movie", labels::MAOYAN_REALTIME),
        ("我不是药神", 9.6, "https://www.maoyan.com/films/1200486", labels::MAOYAN_TOP100),
        ("流浪地球2", 8.3, "https://v.qq.com/x/cover/mzc00200abc.html", labels::TENCENT_VIDEO),
    ]
    .into_iter()
    .filter_map(|(t, s, u, src)| Item::new(t, s, u, src))
    .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_target(false).init();

    let ranked = Aggregator::default().aggregate(sample());

    if std::env::args().any(|a| a == "--send") {
        let cfg = TrackerConfig::load(None)?;
        let notifier = notify::from_settings(&cfg.notify);
        notifier.send(&ranked).await?;
        println!("digest sent via {}", notifier.name());
    } else {
        let digest = render(&ranked, Local::now());
        println!("# {}\n\n{}", digest.title, digest.text);
    }
    Ok(())
}
