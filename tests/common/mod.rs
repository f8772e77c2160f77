// tests/common/mod.rs
// Test doubles shared by the integration tests.
#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use movie_tracker::notify::Notifier;
use movie_tracker::{FetchError, FetchTarget, Item, SourceAdapter, Transport};

#[derive(Clone, Debug)]
pub enum Step {
    Body(String),
    Fail,
    Status(u16),
    Hang,
}

/// Transport answering from a per-URL script. The last step repeats once the
/// script runs out; unknown URLs fail like a refused connection.
#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, url: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(url.to_string(), steps.into());
        self
    }

    pub fn calls(&self, url: &str) -> usize {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    fn next_step(&self, url: &str) -> Option<Step> {
        *self.calls.lock().unwrap().entry(url.to_string()).or_default() += 1;
        let mut scripts = self.scripts.lock().unwrap();
        let queue = scripts.get_mut(url)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, target: &FetchTarget) -> Result<String, FetchError> {
        let step = self.next_step(&target.url);
        match step {
            Some(Step::Body(b)) => Ok(b),
            Some(Step::Fail) | None => Err(FetchError::Transport("connection refused".into())),
            Some(Step::Status(code)) => Err(FetchError::Status(code)),
            Some(Step::Hang) => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(FetchError::Transport("hung request returned".into()))
            }
        }
    }
}

/// Adapter whose payload is `title|score` lines.
pub struct LineAdapter {
    pub name: &'static str,
    pub url: Option<&'static str>,
    pub source: &'static str,
    pub panic_on_parse: bool,
}

impl LineAdapter {
    pub fn new(name: &'static str, url: &'static str, source: &'static str) -> Self {
        Self {
            name,
            url: Some(url),
            source,
            panic_on_parse: false,
        }
    }
}

impl SourceAdapter for LineAdapter {
    fn name(&self) -> &str {
        self.name
    }

    fn target(&self) -> Option<FetchTarget> {
        self.url.map(FetchTarget::new)
    }

    fn parse(&self, raw: &str) -> Vec<Item> {
        if self.panic_on_parse {
            panic!("parser exploded");
        }
        raw.lines()
            .filter_map(|line| {
                let (title, score) = line.split_once('|')?;
                let score = score.trim().parse().unwrap_or(0.0);
                let url = format!("https://{}.test/{}", self.name, title.trim());
                Item::new(title, score, url, self.source)
            })
            .collect()
    }
}

/// Notifier that remembers every delivery; optionally fails.
#[derive(Default)]
pub struct RecordingNotifier {
    pub deliveries: Mutex<Vec<Vec<Item>>>,
    pub sends: AtomicUsize,
    pub fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let n = Self::default();
        n.fail.store(true, Ordering::SeqCst);
        n
    }

    pub fn count(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn last(&self) -> Option<Vec<Item>> {
        self.deliveries.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn send(&self, items: &[Item]) -> Result<()> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        self.deliveries.lock().unwrap().push(items.to_vec());
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("webhook unavailable"));
        }
        Ok(())
    }
}

pub fn item(title: &str, score: f64, source: &str) -> Item {
    Item::new(title, score, format!("https://x.test/{title}"), source).unwrap()
}

pub fn arc<T: SourceAdapter + 'static>(a: T) -> Arc<dyn SourceAdapter> {
    Arc::new(a)
}
