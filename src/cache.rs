//! Cache of compiled templates, keyed by identity.
//!
//! Each identity gets its own slot guarded by a mutex, so concurrent first
//! requests for the same template compile it once while the others wait.
//! Lookups of different identities only contend on the map's read lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, TryLockError};

use tracing::debug;

use crate::types::template::CompiledTemplate;
use crate::Result;

type Slot = Arc<Mutex<Option<Arc<CompiledTemplate>>>>;

#[derive(Default)]
pub(crate) struct Cache {
    slots: RwLock<HashMap<String, Slot>>,
}

impl Cache {
    /// Returns the cached template for `identity`, compiling it on a miss.
    ///
    /// Failed compilations are not cached. A `nested` request, one made
    /// while compiling another template, does not wait for a slot that is
    /// busy: it compiles the template without caching it instead. Waiting
    /// there could deadlock two threads compiling opposite ends of a cyclic
    /// `extends` chain.
    pub(crate) fn get_or_compile<F>(
        &self,
        identity: &str,
        nested: bool,
        compile: F,
    ) -> Result<Arc<CompiledTemplate>>
    where
        F: FnOnce() -> Result<CompiledTemplate>,
    {
        let slot = self.slot(identity);
        let mut entry = if nested {
            match slot.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(err)) => err.into_inner(),
                Err(TryLockError::WouldBlock) => {
                    debug!(identity, "cache slot busy, compiling uncached");
                    return compile().map(Arc::new);
                }
            }
        } else {
            slot.lock().unwrap_or_else(PoisonError::into_inner)
        };

        if let Some(template) = &*entry {
            debug!(identity, "cache hit");
            return Ok(template.clone());
        }
        debug!(identity, "cache miss");
        let template = Arc::new(compile()?);
        *entry = Some(template.clone());
        Ok(template)
    }

    fn slot(&self, identity: &str) -> Slot {
        if let Some(slot) = self
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(identity)
        {
            return slot.clone();
        }
        self.slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(identity.to_owned())
            .or_default()
            .clone()
    }

    /// Drops every cached template.
    pub(crate) fn clear(&self) {
        let mut slots = self.slots.write().unwrap_or_else(PoisonError::into_inner);
        debug!(count = slots.len(), "cache cleared");
        slots.clear();
    }

    /// Drops the cached template for `identity`, returning whether there was
    /// one.
    ///
    /// Templates that extend it keep their compiled copy until they are
    /// invalidated themselves.
    pub(crate) fn invalidate(&self, identity: &str) -> bool {
        let removed = self
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(identity);
        let cached = removed
            .map(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .unwrap_or(false);
        debug!(identity, cached, "cache entry invalidated");
        cached
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;
    use crate::types::ast::NodeList;
    use crate::types::span::Origin;
    use crate::Options;

    fn template(identity: &str) -> CompiledTemplate {
        let origin = Arc::new(Origin::new(identity, "", true));
        CompiledTemplate::new(origin, NodeList::default(), Vec::new(), None, Options::default())
    }

    #[test]
    fn compiles_once_under_contention() {
        let cache = Cache::default();
        let compiles = AtomicUsize::new(0);
        let results: Vec<_> = thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    s.spawn(|| {
                        cache
                            .get_or_compile("page", false, || {
                                compiles.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(std::time::Duration::from_millis(20));
                                Ok(template("page"))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(compiles.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = Cache::default();
        let origin = Arc::new(Origin::new("x", "", false));
        let pos = crate::types::span::Position::new(&origin, crate::types::span::Span::default());
        let err = cache.get_or_compile("x", false, || Err(crate::Error::compile("boom", &pos)));
        assert!(err.is_err());
        let ok = cache.get_or_compile("x", false, || Ok(template("x")));
        assert!(ok.is_ok());
    }

    #[test]
    fn invalidate_and_clear() {
        let cache = Cache::default();
        let first = cache.get_or_compile("a", false, || Ok(template("a"))).unwrap();
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        let second = cache.get_or_compile("a", false, || Ok(template("a"))).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        cache.clear();
        let third = cache.get_or_compile("a", false, || Ok(template("a"))).unwrap();
        assert!(!Arc::ptr_eq(&second, &third));
    }

    #[test]
    fn nested_request_on_busy_slot_compiles_uncached() {
        let cache = Cache::default();
        let outer = cache
            .get_or_compile("a", false, || {
                let inner = cache.get_or_compile("a", true, || Ok(template("a")))?;
                assert_eq!(inner.identity(), "a");
                Ok(template("a"))
            })
            .unwrap();
        let again = cache.get_or_compile("a", false, || unreachable!()).unwrap();
        assert!(Arc::ptr_eq(&outer, &again));
    }
}
