// src/ingest/registry.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::ingest::providers;
use crate::ingest::types::SourceAdapter;

/// Explicit adapter set: adapter name → adapter instance, built once at startup.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn SourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in adapter.
    pub fn builtin() -> Self {
        let mut reg = Self::new();
        for adapter in providers::all() {
            reg.register(adapter);
        }
        reg
    }

    /// Built-ins restricted to `enabled` (case-insensitive); an empty list keeps all.
    pub fn builtin_enabled(enabled: &[String]) -> Self {
        let mut reg = Self::builtin();
        if !enabled.is_empty() {
            reg.retain(|name| is_enabled(name, enabled));
            for wanted in enabled {
                if !reg.adapters.keys().any(|k| k.eq_ignore_ascii_case(wanted)) {
                    tracing::warn!(adapter = %wanted, "enabled adapter is not a known source");
                }
            }
        }
        reg
    }

    /// Register an adapter under its own name, returning the one it replaced.
    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) -> Option<Arc<dyn SourceAdapter>> {
        let name = adapter.name().to_string();
        let prev = self.adapters.insert(name.clone(), adapter);
        if prev.is_some() {
            tracing::warn!(adapter = %name, "adapter registered twice; keeping the latest");
        }
        prev
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.adapters.retain(|name, _| keep(name));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SourceAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

pub fn is_enabled<S: AsRef<str>>(name: S, enabled: &[String]) -> bool {
    let s = name.as_ref();
    enabled.iter().any(|w| w.trim().eq_ignore_ascii_case(s))
}
