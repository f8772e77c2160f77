// src/notify/mod.rs
pub mod dingtalk;
pub mod markdown;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::NotifySection;
use crate::ingest::types::Item;
pub use dingtalk::DingTalkNotifier;
pub use markdown::{render, Digest};

/// Delivery of a run's ranked result.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, items: &[Item]) -> Result<()>;
}

/// Writes the digest to the log only. Used when no webhook is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, items: &[Item]) -> Result<()> {
        let digest = render(items, chrono::Local::now());
        tracing::info!(items = items.len(), title = %digest.title, "digest ready");
        for (rank, it) in items.iter().enumerate() {
            tracing::info!(
                rank = rank + 1,
                title = %it.title,
                source = %it.source,
                composite = it.composite_score.unwrap_or(it.score),
                url = %it.url,
                "recommended"
            );
        }
        Ok(())
    }
}

/// DingTalk when a webhook is set, otherwise the log.
pub fn from_settings(cfg: &NotifySection) -> Arc<dyn Notifier> {
    let webhook = cfg.dingtalk_webhook.as_deref().map(str::trim);
    match webhook.filter(|w| !w.is_empty()) {
        Some(w) => Arc::new(
            DingTalkNotifier::new(w, cfg.dingtalk_secret.clone())
                .with_timeout(cfg.timeout_seconds)
                .with_retries(cfg.max_retries),
        ),
        None => {
            tracing::info!("no DingTalk webhook configured; digest goes to the log");
            Arc::new(LogNotifier)
        }
    }
}
