// tests/pipeline_e2e.rs
mod common;

use anyhow::{bail, Result};
use async_trait::async_trait;
use common::{arc, LineAdapter, RecordingNotifier, ScriptedTransport, Step};
use movie_tracker::notify::Notifier;
use movie_tracker::scheduler::spawn_scheduler;
use movie_tracker::{
    AdapterRegistry, Aggregator, Deduplicator, FetchPolicy, Item, MembershipStore, MemoryStore,
    Orchestrator, RunOutcome, Tracker,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const DOUBAN: &str = "https://douban.test/hot";
const MAOYAN: &str = "https://maoyan.test/board";

struct Fixture {
    tracker: Tracker,
    store: Arc<MemoryStore>,
    notifier: Arc<RecordingNotifier>,
}

fn fixture(transport: ScriptedTransport, notifier: RecordingNotifier) -> Fixture {
    let registry = registry();
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(notifier);
    let policy = FetchPolicy {
        max_retries: 2,
        timeout: Duration::from_secs(5),
        backoff: Duration::from_millis(10),
    };
    let tracker = Tracker::new(
        registry,
        Orchestrator::new(Arc::new(transport), policy),
        Deduplicator::new(store.clone()),
        Aggregator::default(),
        notifier.clone(),
    );
    Fixture {
        tracker,
        store,
        notifier,
    }
}

fn registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();
    registry.register(arc(LineAdapter::new("douban", DOUBAN, "豆瓣热门")));
    registry.register(arc(LineAdapter::new("maoyan", MAOYAN, "猫眼TOP100")));
    registry
}

fn lines(ls: &[&str]) -> Step {
    Step::Body(ls.join("\n"))
}

fn healthy_transport() -> ScriptedTransport {
    ScriptedTransport::new()
        .script(DOUBAN, vec![lines(&["奥本海默|8.8", "Heat|8.3", "Alien|8.5"])])
        .script(MAOYAN, vec![lines(&["heat |9.0", "霸王别姬|9.6"])])
}

#[tokio::test]
async fn full_pass_dedups_ranks_notifies_and_cleans_up() {
    let f = fixture(healthy_transport(), RecordingNotifier::default());
    let report = f.tracker.run_once().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(report.fetched, 5);
    assert_eq!(report.unique, 4);
    assert_eq!(report.selected(), 4);
    assert!(report.notified);
    assert_eq!(report.run_id.len(), 8);

    let delivered = f.notifier.last().unwrap();
    assert_eq!(delivered, report.items);
    assert!(delivered.iter().all(|i| i.composite_score.is_some()));
    assert_eq!(delivered.iter().filter(|i| i.title.eq_ignore_ascii_case("heat")).count(), 1);

    // Run-scoped state is gone after the pass.
    let key = format!("movie_tracker:{}:hashes", report.run_id);
    assert_eq!(f.store.cardinality(&key).unwrap(), 0);
}

#[tokio::test]
async fn nothing_fetched_is_a_no_op() {
    let transport = ScriptedTransport::new()
        .script(DOUBAN, vec![Step::Fail])
        .script(MAOYAN, vec![Step::Status(403)]);
    let f = fixture(transport, RecordingNotifier::default());

    let report = f.tracker.run_once().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::NoItems);
    assert_eq!(report.fetched, 0);
    assert!(report.items.is_empty());
    assert_eq!(f.notifier.count(), 0);
}

#[tokio::test]
async fn empty_pipeline_stages_accept_empty_input() {
    let orchestrator = Orchestrator::new(Arc::new(ScriptedTransport::new()), FetchPolicy::default());
    let pooled = orchestrator.run_all(&AdapterRegistry::new()).await;
    assert!(pooled.is_empty());

    let dedup = Deduplicator::new(Arc::new(MemoryStore::new()));
    let unique = dedup.filter(pooled, "r").unwrap();
    assert!(unique.is_empty());

    assert!(Aggregator::default().aggregate(unique).is_empty());
}

#[tokio::test]
async fn notifier_failure_does_not_fail_the_run() {
    let f = fixture(healthy_transport(), RecordingNotifier::failing());
    let report = f.tracker.run_once().await.unwrap();

    assert_eq!(report.outcome, RunOutcome::NotifyFailed);
    assert!(!report.notified);
    assert_eq!(report.selected(), 4);
    assert_eq!(f.notifier.count(), 1);
}

#[tokio::test]
async fn shared_run_id_suppresses_repeats_across_passes() {
    let Fixture {
        tracker,
        store,
        notifier,
    } = fixture(healthy_transport(), RecordingNotifier::default());
    let tracker = tracker
        .with_run_id(Some("daily".into()))
        .keep_after_run(true);

    let first = tracker.run_once().await.unwrap();
    assert_eq!(first.run_id, "daily");
    assert_eq!(first.unique, 4);

    let second = tracker.run_once().await.unwrap();
    assert_eq!(second.fetched, 5);
    assert_eq!(second.unique, 0);
    assert!(second.items.is_empty());
    // An empty result is still delivered.
    assert_eq!(second.outcome, RunOutcome::Completed);
    assert_eq!(notifier.count(), 2);
    assert_eq!(notifier.last().unwrap().len(), 0);

    assert_eq!(store.cardinality("movie_tracker:daily:hashes").unwrap(), 4);
}

#[tokio::test]
async fn fresh_run_ids_do_not_share_state() {
    let f = fixture(healthy_transport(), RecordingNotifier::default());
    let a = f.tracker.run_once().await.unwrap();
    let b = f.tracker.run_once().await.unwrap();
    assert_ne!(a.run_id, b.run_id);
    assert_eq!(a.unique, b.unique);
}

/// Records how many fingerprints the run's set holds at delivery time.
struct StoreWatcher {
    store: Arc<MemoryStore>,
    key: String,
    seen: Mutex<Vec<usize>>,
}

#[async_trait]
impl Notifier for StoreWatcher {
    fn name(&self) -> &str {
        "watcher"
    }

    async fn send(&self, _items: &[Item]) -> Result<()> {
        let n = self.store.cardinality(&self.key)?;
        self.seen.lock().unwrap().push(n);
        Ok(())
    }
}

#[tokio::test]
async fn cleanup_happens_after_delivery() {
    let store = Arc::new(MemoryStore::new());
    let watcher = Arc::new(StoreWatcher {
        store: store.clone(),
        key: "movie_tracker:r1:hashes".into(),
        seen: Mutex::new(Vec::new()),
    });
    let tracker = Tracker::new(
        registry(),
        Orchestrator::new(Arc::new(healthy_transport()), FetchPolicy::default()),
        Deduplicator::new(store.clone()),
        Aggregator::default(),
        watcher.clone(),
    )
    .with_run_id(Some("r1".into()));

    let report = tracker.run_once().await.unwrap();
    assert_eq!(report.outcome, RunOutcome::Completed);
    assert_eq!(*watcher.seen.lock().unwrap(), vec![4]);
    assert_eq!(store.cardinality("movie_tracker:r1:hashes").unwrap(), 0);
}

/// Store where every operation fails.
struct BrokenStore;

impl MembershipStore for BrokenStore {
    fn insert_if_absent(&self, _key: &str, _member: &str) -> Result<bool> {
        bail!("insert rejected by store")
    }

    fn remove(&self, _key: &str, _member: &str) -> Result<bool> {
        bail!("remove rejected by store")
    }

    fn cardinality(&self, _key: &str) -> Result<usize> {
        bail!("cardinality rejected by store")
    }

    fn remove_prefix(&self, _prefix: &str) -> Result<usize> {
        bail!("prefix removal rejected by store")
    }
}

#[tokio::test]
async fn dedup_error_survives_failed_cleanup() {
    let notifier = Arc::new(RecordingNotifier::default());
    let tracker = Tracker::new(
        registry(),
        Orchestrator::new(Arc::new(healthy_transport()), FetchPolicy::default()),
        Deduplicator::new(Arc::new(BrokenStore)),
        Aggregator::default(),
        notifier.clone(),
    );

    let err = tracker.run_once().await.unwrap_err();
    let chain = format!("{err:#}");
    assert!(chain.contains("insert rejected by store"), "{chain}");
    assert!(chain.contains("prefix removal rejected by store"), "{chain}");
    assert_eq!(err.root_cause().to_string(), "insert rejected by store");
    assert_eq!(notifier.count(), 0);
}

#[tokio::test(start_paused = true)]
async fn scheduler_runs_on_every_tick() {
    let f = fixture(healthy_transport(), RecordingNotifier::default());
    let notifier = f.notifier.clone();
    let handle = spawn_scheduler(Arc::new(f.tracker), Duration::from_secs(10));

    // Ticks at t = 0, 10, 20.
    tokio::time::sleep(Duration::from_secs(25)).await;
    handle.abort();

    assert_eq!(notifier.count(), 3);
}
