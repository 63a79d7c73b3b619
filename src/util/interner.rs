//! Component-name interning
//!
//! Component names are cloned into every edge, ready set, pending-input map
//! and event. Interning keeps one allocation per name and makes those clones
//! a refcount bump.
//!
//! The interner never keeps a name alive on its own: once the table has
//! doubled since the last sweep, names held by nobody else are dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;

static NAMES: Lazy<Interner> = Lazy::new(Interner::new);

/// Table size that triggers the first sweep
const MIN_SWEEP_AT: usize = 1024;

/// Thread-safe string interner backed by DashMap
pub struct Interner {
    strings: DashMap<Arc<str>, ()>,
    sweep_at: AtomicUsize,
}

impl Default for Interner {
    fn default() -> Self {
        Self {
            strings: DashMap::new(),
            sweep_at: AtomicUsize::new(MIN_SWEEP_AT),
        }
    }
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the shared `Arc<str>` for `s`, allocating it on first sight
    pub fn intern(&self, s: &str) -> Arc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Arc::clone(existing.key());
        }
        // entry() holds the shard lock, so two racing callers agree on one Arc
        let interned = {
            let entry = self.strings.entry(Arc::from(s)).or_insert(());
            Arc::clone(entry.key())
        };
        if self.strings.len() >= self.sweep_at.load(Ordering::Relaxed) {
            self.sweep();
        }
        interned
    }

    /// Drop names that only the interner still holds
    pub fn sweep(&self) {
        self.strings.retain(|name, _| Arc::strong_count(name) > 1);
        let next = (self.strings.len() * 2).max(MIN_SWEEP_AT);
        self.sweep_at.store(next, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// Intern a component name in the process-wide interner
#[inline]
pub fn intern(s: &str) -> Arc<str> {
    NAMES.intern(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_same_arc() {
        let interner = Interner::new();
        let a = interner.intern("retriever");
        let b = interner.intern("retriever");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 1);
    }

    #[test]
    fn different_names_different_arcs() {
        let interner = Interner::new();
        let a = interner.intern("gen");
        let b = interner.intern("tools");
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(interner.len(), 2);
    }

    #[test]
    fn sweep_drops_unused_names() {
        let interner = Interner::new();
        let kept = interner.intern("kept");
        interner.intern("dropped");
        assert_eq!(interner.len(), 2);

        interner.sweep();
        assert_eq!(interner.len(), 1);
        assert!(Arc::ptr_eq(&kept, &interner.intern("kept")));
    }

    #[test]
    fn table_stays_bounded_by_live_names() {
        let interner = Interner::new();
        let live: Vec<Arc<str>> = (0..10).map(|i| interner.intern(&format!("live{i}"))).collect();
        for i in 0..50_000 {
            interner.intern(&format!("graph{i}"));
        }
        assert!(interner.len() <= 2 * MIN_SWEEP_AT);
        for name in &live {
            assert!(Arc::ptr_eq(name, &interner.intern(name)));
        }
    }

    #[test]
    fn global_intern_is_shared() {
        assert!(Arc::ptr_eq(&intern("global_name"), &intern("global_name")));
    }

    #[test]
    fn racing_threads_agree_on_one_arc() {
        let interner = Arc::new(Interner::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let interner = Arc::clone(&interner);
                std::thread::spawn(move || interner.intern("shared"))
            })
            .collect();
        let arcs: Vec<Arc<str>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(arcs.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(interner.len(), 1);
    }
}
