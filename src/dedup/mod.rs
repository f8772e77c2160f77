// src/dedup/mod.rs
//! Run-scoped duplicate suppression keyed by a fingerprint of the normalized title.

pub mod store;

use anyhow::{Context, Result};
use metrics::counter;
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::ingest::types::Item;
pub use store::{FileStore, MembershipStore, MemoryStore};

pub const DEFAULT_NAMESPACE: &str = "movie_tracker";

/// Identity form of a title: trimmed, then lowercased.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// SHA-256 hex of the normalized title.
pub fn fingerprint(title: &str) -> String {
    let digest = Sha256::digest(normalize_title(title).as_bytes());
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Clone)]
pub struct Deduplicator {
    store: Arc<dyn MembershipStore>,
    namespace: String,
}

impl Deduplicator {
    pub fn new(store: Arc<dyn MembershipStore>) -> Self {
        Self::with_namespace(store, DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(store: Arc<dyn MembershipStore>, namespace: impl Into<String>) -> Self {
        Self {
            store,
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// `{namespace}:{run_id}:hashes`
    pub fn set_key(&self, run_id: &str) -> String {
        format!("{}:{}:hashes", self.namespace, run_id)
    }

    fn run_prefix(&self, run_id: &str) -> String {
        format!("{}:{}:", self.namespace, run_id)
    }

    /// Keep the first item per normalized title, in input order, and drop every
    /// item whose fingerprint is already in the run's set (including ones
    /// recorded by earlier calls with the same `run_id`).
    ///
    /// On a store error the fingerprints this call already recorded are taken
    /// back out, so titles that were never delivered are not suppressed later.
    pub fn filter(&self, items: Vec<Item>, run_id: &str) -> Result<Vec<Item>> {
        let key = self.set_key(run_id);
        let total = items.len();
        let mut kept = Vec::with_capacity(total);
        let mut recorded: Vec<String> = Vec::new();

        for item in items {
            let fp = fingerprint(&item.title);
            let fresh = match self.store.insert_if_absent(&key, &fp) {
                Ok(fresh) => fresh,
                Err(e) => {
                    self.roll_back(&key, &recorded);
                    return Err(e).with_context(|| format!("recording fingerprint in {key}"));
                }
            };
            if fresh {
                recorded.push(fp);
                kept.push(item);
            } else {
                tracing::debug!(run_id, title = %item.title, source = %item.source, "duplicate dropped");
            }
        }

        let dropped = total - kept.len();
        counter!("dedup_kept_total").increment(kept.len() as u64);
        counter!("dedup_duplicates_total").increment(dropped as u64);

        let rate = if total == 0 {
            0.0
        } else {
            dropped as f64 / total as f64 * 100.0
        };
        tracing::info!(
            run_id,
            input = total,
            kept = kept.len(),
            duplicates = dropped,
            duplicate_pct = (rate * 10.0).round() / 10.0,
            "dedup complete"
        );
        Ok(kept)
    }

    fn roll_back(&self, key: &str, fingerprints: &[String]) {
        let mut undone = 0;
        for fp in fingerprints {
            match self.store.remove(key, fp) {
                Ok(_) => undone += 1,
                Err(e) => {
                    tracing::warn!(key, error = ?e, "cannot roll back fingerprint; title stays suppressed")
                }
            }
        }
        tracing::warn!(key, undone, total = fingerprints.len(), "dedup aborted; rolled back fingerprints");
    }

    /// Discard every key under `{namespace}:{run_id}:`. A no-op when nothing exists.
    pub fn cleanup(&self, run_id: &str) -> Result<usize> {
        let prefix = self.run_prefix(run_id);
        let removed = self
            .store
            .remove_prefix(&prefix)
            .with_context(|| format!("cleaning up dedup keys under {prefix}"))?;
        tracing::debug!(run_id, removed, "dedup state cleaned up");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, source: &str) -> Item {
        Item::new(title, 8.0, "https://x.test", source).unwrap()
    }

    #[test]
    fn fingerprint_ignores_case_and_outer_whitespace() {
        assert_eq!(fingerprint("Inception"), fingerprint(" inception "));
        assert_eq!(fingerprint("Inception"), fingerprint("INCEPTION"));
        assert_ne!(fingerprint("Inception"), fingerprint("In ception"));
        assert_eq!(fingerprint("x").len(), 64);
    }

    #[test]
    fn keys_follow_namespace_layout() {
        let d = Deduplicator::new(Arc::new(MemoryStore::new()));
        assert_eq!(d.set_key("ab12cd34"), "movie_tracker:ab12cd34:hashes");
    }

    #[test]
    fn first_occurrence_wins() {
        let d = Deduplicator::new(Arc::new(MemoryStore::new()));
        let out = d
            .filter(vec![item("Movie", "X"), item("movie ", "Y"), item("Other", "Y")], "r")
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].source, "X");
        assert_eq!(out[1].title, "Other");
    }

    /// Memory store whose inserts start failing after `ok_inserts` successes.
    struct FailingAfter {
        inner: MemoryStore,
        ok_inserts: std::sync::atomic::AtomicUsize,
    }

    impl FailingAfter {
        fn new(ok_inserts: usize) -> Self {
            Self {
                inner: MemoryStore::new(),
                ok_inserts: ok_inserts.into(),
            }
        }
    }

    impl MembershipStore for FailingAfter {
        fn insert_if_absent(&self, key: &str, member: &str) -> Result<bool> {
            use std::sync::atomic::Ordering;
            let left = self.ok_inserts.load(Ordering::SeqCst);
            if left == 0 {
                anyhow::bail!("disk full");
            }
            self.ok_inserts.store(left - 1, Ordering::SeqCst);
            self.inner.insert_if_absent(key, member)
        }

        fn remove(&self, key: &str, member: &str) -> Result<bool> {
            self.inner.remove(key, member)
        }

        fn cardinality(&self, key: &str) -> Result<usize> {
            self.inner.cardinality(key)
        }

        fn remove_prefix(&self, prefix: &str) -> Result<usize> {
            self.inner.remove_prefix(prefix)
        }
    }

    #[test]
    fn store_failure_mid_batch_rolls_back_this_call_only() {
        let store = Arc::new(FailingAfter::new(4));
        let d = Deduplicator::new(store.clone());
        let key = d.set_key("shared");

        // One fingerprint from an earlier, successful call.
        d.filter(vec![item("Heat", "X")], "shared").unwrap();

        let err = d
            .filter(
                vec![item("Alien", "X"), item("heat", "Y"), item("Ran", "X"), item("Up", "X")],
                "shared",
            )
            .unwrap_err();
        assert!(format!("{err:#}").contains("disk full"));

        // "Alien" and "Ran" were taken back out; "Heat" from the earlier call stays.
        assert_eq!(store.cardinality(&key).unwrap(), 1);
        assert!(!store.inner.remove(&key, &fingerprint("Alien")).unwrap());
        assert!(!store.inner.remove(&key, &fingerprint("Ran")).unwrap());
        assert!(store.inner.remove(&key, &fingerprint("Heat")).unwrap());
    }

    #[test]
    fn empty_input_is_fine() {
        let d = Deduplicator::new(Arc::new(MemoryStore::new()));
        assert!(d.filter(Vec::new(), "r").unwrap().is_empty());
        assert_eq!(d.cleanup("r").unwrap(), 0);
    }
}
