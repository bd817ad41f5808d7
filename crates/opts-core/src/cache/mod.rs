//! Result cache for built options
//!
//! Caches are owned by the caller and passed to the cached registry queries.
//! Each cache records the snapshot generation its entries were computed
//! under: a lookup from a newer snapshot clears it, and a result computed
//! against an older snapshot is never stored.
//!
//! | Mode                  | Type             | Sharing                     |
//! |-----------------------|------------------|-----------------------------|
//! | [`CacheMode::Exclusive`] | [`ExclusiveCache`] | single owner, no locking |
//! | [`CacheMode::Shared`]    | [`SharedCache`]    | `Sync`, internal mutex   |

mod store;

use crate::Result;
use parking_lot::Mutex;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use store::{CacheStore, Freshness};

/// Value stored for a cached options request.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Concurrency mode of a cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// No internal locking; the cache must not be shared between threads
    #[default]
    Exclusive,
    /// Internal locking; safe for concurrent callers
    Shared,
}

/// Settings fixed when a cache is created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheInitOptions {
    /// `None` for an unbounded cache, otherwise LRU eviction past this size
    pub max_size: Option<NonZeroUsize>,
    pub mode: CacheMode,
}

impl CacheInitOptions {
    /// An unbounded cache in the given mode.
    pub fn unbounded(mode: CacheMode) -> Self {
        Self {
            max_size: None,
            mode,
        }
    }

    /// An LRU cache holding at most `max_size` entries.
    pub fn lru(max_size: NonZeroUsize, mode: CacheMode) -> Self {
        Self {
            max_size: Some(max_size),
            mode,
        }
    }
}

/// Identity of a cached options request.
///
/// Constraints are not part of the key: two requests whose constraints
/// select the same features produce the same value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub key: String,
    /// Canonical names after constraint filtering, in merge order
    pub features: Vec<String>,
    pub configurable_strings: bool,
    /// Target type the value was decoded into
    pub shape: TypeId,
}

/// A memoizing store for computed values.
pub trait ResultCache<K, V> {
    /// Return the value cached for `key`, computing and storing it on a miss.
    ///
    /// Errors from `compute` are returned and never cached.
    fn get_or_compute<F>(&self, generation: u64, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>;

    /// Drop every entry.
    fn clear(&self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Eagerly clears a cache when a new snapshot is published.
pub trait Invalidate: Send + Sync {
    /// Drop every entry and reject results from before `generation`.
    fn invalidate(&self, generation: u64);
}

/// Cache for a single owner.
pub struct ExclusiveCache<K: Hash + Eq, V> {
    store: RefCell<CacheStore<K, V>>,
}

impl<K: Hash + Eq, V: Clone> ExclusiveCache<K, V> {
    pub fn new(max_size: Option<NonZeroUsize>) -> Self {
        Self {
            store: RefCell::new(CacheStore::new(max_size)),
        }
    }
}

impl<K: Hash + Eq, V: Clone> ResultCache<K, V> for ExclusiveCache<K, V> {
    fn get_or_compute<F>(&self, generation: u64, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        {
            let mut store = self.store.borrow_mut();
            if store.advance(generation) == Freshness::Stale {
                drop(store);
                return compute();
            }
            if let Some(hit) = store.get(&key) {
                return Ok(hit);
            }
        }

        let value = compute()?;
        self.store
            .borrow_mut()
            .insert(generation, key, value.clone());
        Ok(value)
    }

    fn clear(&self) {
        self.store.borrow_mut().clear();
    }

    fn len(&self) -> usize {
        self.store.borrow().len()
    }
}

/// Cache safe to share between threads.
///
/// The value is computed outside the lock, so concurrent misses on one key
/// may both compute; the last insert wins.
pub struct SharedCache<K: Hash + Eq, V> {
    store: Mutex<CacheStore<K, V>>,
}

impl<K: Hash + Eq, V: Clone> SharedCache<K, V> {
    pub fn new(max_size: Option<NonZeroUsize>) -> Self {
        Self {
            store: Mutex::new(CacheStore::new(max_size)),
        }
    }
}

impl<K: Hash + Eq, V: Clone> ResultCache<K, V> for SharedCache<K, V> {
    fn get_or_compute<F>(&self, generation: u64, key: K, compute: F) -> Result<V>
    where
        F: FnOnce() -> Result<V>,
    {
        {
            let mut store = self.store.lock();
            if store.advance(generation) == Freshness::Stale {
                drop(store);
                return compute();
            }
            if let Some(hit) = store.get(&key) {
                return Ok(hit);
            }
        }

        let value = compute()?;
        self.store.lock().insert(generation, key, value.clone());
        Ok(value)
    }

    fn clear(&self) {
        self.store.lock().clear();
    }

    fn len(&self) -> usize {
        self.store.lock().len()
    }
}

impl<K, V> Invalidate for SharedCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn invalidate(&self, generation: u64) {
        let mut store = self.store.lock();
        store.advance(generation);
        store.clear();
    }
}

/// An options cache whose mode is chosen at runtime.
pub enum OptionsCache {
    Exclusive(ExclusiveCache<CacheKey, CachedValue>),
    Shared(SharedCache<CacheKey, CachedValue>),
}

impl OptionsCache {
    pub fn new(options: CacheInitOptions) -> Self {
        match options.mode {
            CacheMode::Exclusive => Self::Exclusive(ExclusiveCache::new(options.max_size)),
            CacheMode::Shared => Self::Shared(SharedCache::new(options.max_size)),
        }
    }
}

impl ResultCache<CacheKey, CachedValue> for OptionsCache {
    fn get_or_compute<F>(&self, generation: u64, key: CacheKey, compute: F) -> Result<CachedValue>
    where
        F: FnOnce() -> Result<CachedValue>,
    {
        match self {
            Self::Exclusive(cache) => cache.get_or_compute(generation, key, compute),
            Self::Shared(cache) => cache.get_or_compute(generation, key, compute),
        }
    }

    fn clear(&self) {
        match self {
            Self::Exclusive(cache) => cache.clear(),
            Self::Shared(cache) => cache.clear(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Self::Exclusive(cache) => cache.len(),
            Self::Shared(cache) => cache.len(),
        }
    }
}
