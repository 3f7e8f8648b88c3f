//! Compiled-template store.
//!
//! [`TemplateStore`] maps a template key (file name with extension) to a shared
//! [`CompiledTemplate`]. Entries are added on first use and never evicted or
//! replaced.
//!
//! # Compile Once
//!
//! [`TemplateStore::get_or_compile`] is a single-flight lookup:
//!
//! ```text
//! read lock ── hit ─────────────────────────────────────▶ Arc<CompiledTemplate>
//!    │
//!   miss
//!    │
//! write lock ── re-check hit (another caller compiled) ─▶ Arc<CompiledTemplate>
//!    │
//!   still missing
//!    │
//! compile + insert ─────────────────────────────────────▶ Arc<CompiledTemplate>
//! ```
//!
//! Compilation runs while the write lock is held, so callers racing on the same
//! missing key wait for the first one and then take the re-check path. A failed
//! compile inserts nothing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::template::CompiledTemplate;

/// Snapshot of store counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered by an existing entry.
    pub hits: u64,
    /// Lookups that found no entry under the read lock.
    pub misses: u64,
    /// Successful compiles. A parse that fails is counted as a miss only.
    pub compiles: u64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    compiles: AtomicU64,
}

/// Name-keyed, process-lifetime cache of compiled templates.
#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: RwLock<HashMap<String, Arc<CompiledTemplate>>>,
    counters: Counters,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<CompiledTemplate>> {
        self.templates.read().get(key).cloned()
    }

    /// Returns the entry for `key`, compiling and inserting it on first use.
    ///
    /// `compile` runs at most once per key across all callers, as long as it
    /// succeeds. Its error is returned as-is and nothing is stored.
    pub fn get_or_compile<F>(&self, key: &str, compile: F) -> Result<Arc<CompiledTemplate>>
    where
        F: FnOnce() -> Result<CompiledTemplate>,
    {
        if let Some(found) = self.templates.read().get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key, "template cache hit");
            return Ok(Arc::clone(found));
        }
        self.counters.misses.fetch_add(1, Ordering::Relaxed);

        let mut templates = self.templates.write();
        if let Some(found) = templates.get(key) {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(key, "template compiled by another caller");
            return Ok(Arc::clone(found));
        }

        let compiled = Arc::new(compile()?);
        self.counters.compiles.fetch_add(1, Ordering::Relaxed);
        templates.insert(key.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Records a compile that bypassed the store (reload mode).
    pub(crate) fn record_uncached_compile(&self) {
        self.counters.compiles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.templates.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.templates.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.read().is_empty()
    }

    /// Returns all stored keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.templates.read().keys().cloned().collect();
        keys.sort_unstable();
        keys
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            compiles: self.counters.compiles.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RenderError;
    use crate::options::Delimiters;
    use crate::template::SubstitutionEngine;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    fn compile(key: &str, source: &str) -> Result<CompiledTemplate> {
        CompiledTemplate::compile(&SubstitutionEngine::new(), key, source, &Delimiters::default())
    }

    #[test]
    fn test_miss_then_hit() {
        let store = TemplateStore::new();
        let first = store.get_or_compile("a.html", || compile("a.html", "A")).unwrap();
        let second = store
            .get_or_compile("a.html", || panic!("must not compile twice"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &store.get("a.html").unwrap()));
        assert!(store.get("b.html").is_none());
        assert_eq!(
            store.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                compiles: 1
            }
        );
        assert_eq!(store.keys(), vec!["a.html".to_string()]);
    }

    #[test]
    fn test_failed_compile_stores_nothing() {
        let store = TemplateStore::new();
        let err = store
            .get_or_compile("bad.html", || compile("bad.html", "{{.x"))
            .unwrap_err();
        assert!(matches!(err, RenderError::ParseError { .. }));
        assert!(!store.contains("bad.html"));
        assert!(store.is_empty());
        assert_eq!(
            store.stats(),
            CacheStats {
                hits: 0,
                misses: 1,
                compiles: 0
            }
        );

        // A later successful compile is stored.
        store
            .get_or_compile("bad.html", || compile("bad.html", "fixed"))
            .unwrap();
        assert!(store.contains("bad.html"));
        assert_eq!(store.stats().compiles, 1);
    }

    #[test]
    fn test_concurrent_first_access_compiles_once() {
        const THREADS: usize = 16;

        let store = Arc::new(TemplateStore::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let store = Arc::clone(&store);
                let calls = Arc::clone(&calls);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    store
                        .get_or_compile("race.html", || {
                            calls.fetch_add(1, Ordering::SeqCst);
                            thread::sleep(std::time::Duration::from_millis(10));
                            compile("race.html", "{{.n}}")
                        })
                        .unwrap()
                })
            })
            .collect();

        let results: Vec<Arc<CompiledTemplate>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|t| Arc::ptr_eq(t, &results[0])));
        assert_eq!(store.len(), 1);

        let stats = store.stats();
        assert_eq!(stats.compiles, 1);
        assert_eq!(stats.hits + 1, THREADS as u64);
    }
}
