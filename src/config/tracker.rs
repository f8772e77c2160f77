// src/config/tracker.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::analyze::{SelectionPolicy, WeightUpdate};
use crate::ingest::fetch::{FetchPolicy, DEFAULT_USER_AGENT};

pub const ENV_CONFIG_PATH: &str = "TRACKER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/tracker.toml";
pub const ENV_DINGTALK_WEBHOOK: &str = "DINGTALK_WEBHOOK";
pub const ENV_DINGTALK_SECRET: &str = "DINGTALK_SECRET";

fn default_max_retries() -> u32 {
    3
}
fn default_fetch_timeout() -> u64 {
    30
}
fn default_backoff() -> u64 {
    1
}
fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}
fn default_namespace() -> String {
    crate::dedup::DEFAULT_NAMESPACE.to_string()
}
fn default_store_dir() -> PathBuf {
    PathBuf::from("data/dedup")
}
fn default_interval() -> u64 {
    3600
}
fn default_notify_timeout() -> u64 {
    10
}
fn default_notify_retries() -> u8 {
    3
}

/// Whole-file configuration (`config/tracker.toml`). Every section and key is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub fetch: FetchSection,
    pub selection: SelectionPolicy,
    pub weights: WeightUpdate,
    /// Source label → credibility override (clamped to [0, 1.2]).
    pub credibility: HashMap<String, f64>,
    pub dedup: DedupSection,
    pub sources: SourcesSection,
    pub schedule: ScheduleSection,
    pub notify: NotifySection,
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchSection {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_seconds: u64,
    #[serde(default = "default_backoff")]
    pub retry_backoff_seconds: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            fetch_timeout_seconds: default_fetch_timeout(),
            retry_backoff_seconds: default_backoff(),
            user_agent: default_user_agent(),
        }
    }
}

impl FetchSection {
    pub fn policy(&self) -> FetchPolicy {
        FetchPolicy {
            max_retries: self.max_retries,
            timeout: Duration::from_secs(self.fetch_timeout_seconds),
            backoff: Duration::from_secs(self.retry_backoff_seconds),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DedupSection {
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub backend: StoreBackend,
    /// Directory of the `file` backend.
    #[serde(default = "default_store_dir")]
    pub dir: PathBuf,
    /// Fixed run id shared across invocations; unset means a fresh id per run.
    #[serde(default)]
    pub run_id: Option<String>,
    /// Skip cleanup so a shared run id keeps its fingerprints.
    #[serde(default)]
    pub keep_after_run: bool,
}

impl Default for DedupSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            backend: StoreBackend::default(),
            dir: default_store_dir(),
            run_id: None,
            keep_after_run: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourcesSection {
    /// Adapter names to run (case-insensitive); empty runs every built-in.
    pub enabled: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSection {
    #[serde(default = "default_interval")]
    pub interval_seconds: u64,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            interval_seconds: default_interval(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotifySection {
    #[serde(default)]
    pub dingtalk_webhook: Option<String>,
    #[serde(default)]
    pub dingtalk_secret: Option<String>,
    #[serde(default = "default_notify_timeout")]
    pub timeout_seconds: u64,
    #[serde(default = "default_notify_retries")]
    pub max_retries: u8,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            dingtalk_webhook: None,
            dingtalk_secret: None,
            timeout_seconds: default_notify_timeout(),
            max_retries: default_notify_retries(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    /// `host:port` for the Prometheus scrape endpoint; unset disables the exporter.
    pub listen: Option<String>,
}

impl TrackerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: TrackerConfig = toml::from_str(s).context("parsing tracker config")?;
        cfg.sanitize();
        Ok(cfg)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading tracker config from {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("in {}", path.display()))
    }

    /// Load using explicit path + env var + fallbacks:
    /// 1) `explicit` (e.g. `--config`)
    /// 2) $TRACKER_CONFIG_PATH (must exist)
    /// 3) config/tracker.toml
    /// 4) built-in defaults
    ///
    /// Secrets from the environment override whatever the file says.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut cfg = match explicit {
            Some(p) => Self::load_from(p)?,
            None => Self::load_default()?,
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            } else {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
        }
        let default_p = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default_p.exists() {
            return Self::load_from(&default_p);
        }
        tracing::debug!("no tracker config found; using defaults");
        Ok(Self::default())
    }

    fn apply_env_overrides(&mut self) {
        if let Some(w) = non_empty_env(ENV_DINGTALK_WEBHOOK) {
            self.notify.dingtalk_webhook = Some(w);
        }
        if let Some(s) = non_empty_env(ENV_DINGTALK_SECRET) {
            self.notify.dingtalk_secret = Some(s);
        }
    }

    fn sanitize(&mut self) {
        if self.schedule.interval_seconds == 0 {
            tracing::warn!("schedule.interval_seconds = 0; using default");
            self.schedule.interval_seconds = default_interval();
        }
        if self.dedup.namespace.trim().is_empty() {
            self.dedup.namespace = default_namespace();
        }
        self.dedup.run_id = self
            .dedup
            .run_id
            .take()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        self.sources.enabled = clean_list(std::mem::take(&mut self.sources.enabled));
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn clean_list(items: Vec<String>) -> Vec<String> {
    use std::collections::BTreeSet;
    let mut set = BTreeSet::new();
    for it in items {
        let t = it.trim();
        if !t.is_empty() {
            set.insert(t.to_string());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = TrackerConfig::from_toml_str("").unwrap();
        assert_eq!(cfg.fetch.policy(), FetchPolicy::default());
        assert_eq!(cfg.selection, SelectionPolicy::default());
        assert!(cfg.weights.is_empty());
        assert_eq!(cfg.dedup.namespace, "movie_tracker");
        assert_eq!(cfg.dedup.backend, StoreBackend::Memory);
        assert_eq!(cfg.schedule.interval_seconds, 3600);
        assert!(cfg.metrics.listen.is_none());
    }

    #[test]
    fn sections_parse_and_sanitize() {
        let cfg = TrackerConfig::from_toml_str(
            r#"
[fetch]
max_retries = 5
fetch_timeout_seconds = 2

[selection]
selection_cap = 10

[weights]
recency_bonus = 0.0

[credibility]
"My Source" = 1.1

[dedup]
backend = "file"
dir = "/tmp/x"
run_id = "  "

[sources]
enabled = [" douban_hot ", "", "douban_hot", "maoyan_top100"]

[schedule]
interval_seconds = 0
"#,
        )
        .unwrap();
        assert_eq!(cfg.fetch.max_retries, 5);
        assert_eq!(cfg.fetch.policy().timeout, Duration::from_secs(2));
        assert_eq!(cfg.fetch.retry_backoff_seconds, 1);
        assert_eq!(cfg.selection.cap, 10);
        assert_eq!(cfg.selection.min_per_source, 3);
        assert_eq!(cfg.weights.recency_bonus, Some(0.0));
        assert_eq!(cfg.credibility.get("My Source"), Some(&1.1));
        assert_eq!(cfg.dedup.backend, StoreBackend::File);
        assert!(cfg.dedup.run_id.is_none());
        assert_eq!(cfg.sources.enabled, vec!["douban_hot", "maoyan_top100"]);
        assert_eq!(cfg.schedule.interval_seconds, 3600);
    }

    #[test]
    fn example_file_parses() {
        let cfg =
            TrackerConfig::from_toml_str(include_str!("../../config/tracker.example.toml")).unwrap();
        assert_eq!(cfg.selection, SelectionPolicy::default());
        assert_eq!(cfg.credibility.get("豆瓣Top250"), Some(&0.8));
        assert!(cfg.sources.enabled.is_empty());
        assert!(cfg.notify.dingtalk_webhook.is_none());
    }

    #[test]
    fn unknown_weight_key_is_rejected() {
        assert!(TrackerConfig::from_toml_str("[weights]\nbase = 1.0").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);
        env::remove_var(ENV_DINGTALK_WEBHOOK);
        env::remove_var(ENV_DINGTALK_SECRET);

        // No files → defaults.
        let cfg = TrackerConfig::load(None).unwrap();
        assert_eq!(cfg.fetch.max_retries, 3);

        // config/tracker.toml in CWD.
        fs::create_dir_all("config").unwrap();
        fs::write(DEFAULT_CONFIG_PATH, "[fetch]\nmax_retries = 7\n").unwrap();
        assert_eq!(TrackerConfig::load(None).unwrap().fetch.max_retries, 7);

        // Env path wins over the default file.
        let p = tmp.path().join("other.toml");
        fs::write(&p, "[fetch]\nmax_retries = 1\n").unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(TrackerConfig::load(None).unwrap().fetch.max_retries, 1);

        // Env path must exist.
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml").display().to_string());
        assert!(TrackerConfig::load(None).is_err());
        env::remove_var(ENV_CONFIG_PATH);

        // Explicit path wins over everything.
        assert_eq!(TrackerConfig::load(Some(p.as_path())).unwrap().fetch.max_retries, 1);

        env::set_current_dir(&old).unwrap();
    }

    #[serial_test::serial]
    #[test]
    fn env_secrets_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        let p = tmp.path().join("t.toml");
        fs::write(&p, "[notify]\ndingtalk_webhook = \"https://file.test\"\n").unwrap();

        env::set_var(ENV_DINGTALK_WEBHOOK, "https://env.test");
        env::set_var(ENV_DINGTALK_SECRET, "SECenv");
        let cfg = TrackerConfig::load(Some(p.as_path())).unwrap();
        env::remove_var(ENV_DINGTALK_WEBHOOK);
        env::remove_var(ENV_DINGTALK_SECRET);

        assert_eq!(cfg.notify.dingtalk_webhook.as_deref(), Some("https://env.test"));
        assert_eq!(cfg.notify.dingtalk_secret.as_deref(), Some("SECenv"));
    }
}
