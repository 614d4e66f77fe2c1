use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::{debug, info};

use super::chain::FilterChain;
use super::mapping::DispatchType;

/// Default bound for each per-dispatch-type chain cache.
pub const DEFAULT_MAX_CACHED_CHAINS: usize = 512;

/// Bounded cache of pre-built filter chains, one map per dispatch type.
///
/// Keys are the request path for path-based dispatch and the handler
/// name for name-based dispatch. Eviction is approximate: a concurrent
/// FIFO queue remembers keys in insertion order (not access order), and
/// an inserting writer that finds the cache at or over its bound pops
/// queued keys and removes their entries. The queue and the map are not
/// updated atomically with each other; a writer that drains the queue
/// while the map still reports full clears the whole map and moves on.
///
/// Lookup is a single concurrent-map read and never blocks on writers.
pub struct ChainCache {
    caches: [DashMap<String, Arc<FilterChain>>; DispatchType::COUNT],
    queues: [Mutex<VecDeque<String>>; DispatchType::COUNT],
    max_entries: AtomicUsize,
}

impl ChainCache {
    /// A cache bounded at `max_entries` per dispatch type. Zero means
    /// unbounded.
    pub fn new(max_entries: usize) -> Self {
        ChainCache {
            caches: std::array::from_fn(|_| DashMap::new()),
            queues: std::array::from_fn(|_| Mutex::new(VecDeque::new())),
            max_entries: AtomicUsize::new(max_entries),
        }
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries.load(Ordering::Acquire)
    }

    pub fn set_max_entries(&self, max_entries: usize) {
        self.max_entries.store(max_entries, Ordering::Release);
    }

    /// Look up a cached chain. Wait-free on the read path.
    pub fn get(&self, dispatch: DispatchType, key: &str) -> Option<Arc<FilterChain>> {
        self.caches[dispatch.index()]
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Insert a freshly built chain, then shed the oldest entries while
    /// the cache sits at or over its bound. If the queue runs dry while
    /// the map still reports full (a concurrent writer drained it), the
    /// map is cleared wholesale.
    pub fn insert(&self, dispatch: DispatchType, key: &str, chain: Arc<FilterChain>) {
        let cache = &self.caches[dispatch.index()];
        let queue = &self.queues[dispatch.index()];

        cache.insert(key.to_string(), chain);
        queue.lock().push_back(key.to_string());

        let max_entries = self.max_entries.load(Ordering::Acquire);
        while max_entries > 0 && cache.len() >= max_entries {
            let evicted = queue.lock().pop_front();
            match evicted {
                Some(old_key) => {
                    cache.remove(&old_key);
                    debug!(dispatch = %dispatch, key = %old_key, "Evicted cached chain");
                }
                None => {
                    cache.clear();
                    debug!(dispatch = %dispatch, "Eviction queue empty while cache full, cleared cache");
                    break;
                }
            }
        }
    }

    /// Number of cached chains for one dispatch type.
    pub fn len(&self, dispatch: DispatchType) -> usize {
        self.caches[dispatch.index()].len()
    }

    pub fn is_empty(&self, dispatch: DispatchType) -> bool {
        self.caches[dispatch.index()].is_empty()
    }

    pub fn contains(&self, dispatch: DispatchType, key: &str) -> bool {
        self.caches[dispatch.index()].contains_key(key)
    }

    /// Drop every cached chain and queued key for all dispatch types.
    /// Called after any configuration change.
    pub fn invalidate(&self) {
        for dispatch in DispatchType::ALL {
            self.queues[dispatch.index()].lock().clear();
            self.caches[dispatch.index()].clear();
        }
        info!("Chain cache invalidated");
    }
}
