// src/dedup/store.rs
//! Membership-set backends for run-scoped dedup state.

use anyhow::{anyhow, Context, Result};
use std::collections::{HashMap, HashSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A keyed collection of string sets.
///
/// `insert_if_absent` is the only way to populate a set and must be atomic:
/// two concurrent callers inserting the same member never both see `true`.
pub trait MembershipStore: Send + Sync {
    /// Add `member` to the set at `key`; `true` if it was not there before.
    fn insert_if_absent(&self, key: &str, member: &str) -> Result<bool>;

    /// Take `member` out of the set at `key`; `true` if it was present.
    /// A set left empty is deleted.
    fn remove(&self, key: &str, member: &str) -> Result<bool>;

    /// Number of members in the set at `key` (0 if the key does not exist).
    fn cardinality(&self, key: &str) -> Result<usize>;

    /// Delete every key starting with `prefix`; returns how many were removed.
    fn remove_prefix(&self, prefix: &str) -> Result<usize>;
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MembershipStore for MemoryStore {
    fn insert_if_absent(&self, key: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    fn remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut sets = self.sets.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        let Some(set) = sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    fn cardinality(&self, key: &str) -> Result<usize> {
        let sets = self.sets.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        Ok(sets.get(key).map_or(0, HashSet::len))
    }

    fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let mut sets = self.sets.lock().map_err(|_| anyhow!("memory store poisoned"))?;
        let before = sets.len();
        sets.retain(|k, _| !k.starts_with(prefix));
        Ok(before - sets.len())
    }
}

/// Durable store: one append-only file per key under `dir`, one member per line.
///
/// Sets are loaded lazily and cached; the in-process lock makes
/// `insert_if_absent` atomic for every caller sharing this instance.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, HashSet<String>>>,
}

const SET_EXT: &str = "set";

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)
            .with_context(|| format!("creating dedup store dir {}", dir.display()))?;
        Ok(Self {
            dir,
            cache: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.{SET_EXT}", encode_key(key)))
    }

    fn load(&self, key: &str) -> Result<HashSet<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(s) => Ok(s
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(HashSet::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }
}

impl MembershipStore for FileStore {
    fn insert_if_absent(&self, key: &str, member: &str) -> Result<bool> {
        let mut cache = self.cache.lock().map_err(|_| anyhow!("file store poisoned"))?;
        if !cache.contains_key(key) {
            let loaded = self.load(key)?;
            cache.insert(key.to_string(), loaded);
        }
        let Some(set) = cache.get_mut(key) else {
            return Err(anyhow!("dedup set {key} vanished from cache"));
        };
        if set.contains(member) {
            return Ok(false);
        }

        let path = self.path_for(key);
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("opening {}", path.display()))?;
        writeln!(f, "{member}").with_context(|| format!("appending to {}", path.display()))?;

        set.insert(member.to_string());
        Ok(true)
    }

    fn remove(&self, key: &str, member: &str) -> Result<bool> {
        let mut cache = self.cache.lock().map_err(|_| anyhow!("file store poisoned"))?;
        let mut set = match cache.remove(key) {
            Some(set) => set,
            None => self.load(key)?,
        };
        if !set.remove(member) {
            cache.insert(key.to_string(), set);
            return Ok(false);
        }

        // Rewrite the whole file without the member.
        let path = self.path_for(key);
        if set.is_empty() {
            fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        } else {
            let mut body = String::new();
            for m in &set {
                body.push_str(m);
                body.push('\n');
            }
            fs::write(&path, body).with_context(|| format!("rewriting {}", path.display()))?;
            cache.insert(key.to_string(), set);
        }
        Ok(true)
    }

    fn cardinality(&self, key: &str) -> Result<usize> {
        let cache = self.cache.lock().map_err(|_| anyhow!("file store poisoned"))?;
        match cache.get(key) {
            Some(set) => Ok(set.len()),
            None => Ok(self.load(key)?.len()),
        }
    }

    fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let mut cache = self.cache.lock().map_err(|_| anyhow!("file store poisoned"))?;
        cache.retain(|k, _| !k.starts_with(prefix));

        let encoded = encode_key(prefix);
        let mut removed = 0;
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("listing {}", self.dir.display()))?;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_set = path.extension().and_then(|s| s.to_str()) == Some(SET_EXT);
            let matches = path
                .file_stem()
                .and_then(|s| s.to_str())
                .is_some_and(|stem| stem.starts_with(&encoded));
            if is_set && matches {
                fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

/// Filename-safe, prefix-preserving key encoding (`:` → `%3A`, etc.).
fn encode_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for ch in key.chars() {
        match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' => out.push(ch),
            other => {
                let mut buf = [0u8; 4];
                for b in other.encode_utf8(&mut buf).bytes() {
                    out.push_str(&format!("%{b:02X}"));
                }
            }
        }
    }
    out
}
