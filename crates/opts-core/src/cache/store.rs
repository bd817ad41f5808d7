use lru::LruCache;
use std::collections::HashMap;
use std::hash::Hash;
use std::num::NonZeroUsize;

enum Entries<K: Hash + Eq, V> {
    Unbounded(HashMap<K, V>),
    Lru(LruCache<K, V>),
}

/// Entry storage tagged with the snapshot generation it was filled under.
pub(crate) struct CacheStore<K: Hash + Eq, V> {
    entries: Entries<K, V>,
    generation: Option<u64>,
}

/// How a lookup relates to the generation the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Freshness {
    /// Entries belong to the requested generation
    Current,
    /// The request comes from an older snapshot; bypass the store entirely
    Stale,
}

impl<K: Hash + Eq, V: Clone> CacheStore<K, V> {
    pub(crate) fn new(max_size: Option<NonZeroUsize>) -> Self {
        let entries = match max_size {
            Some(capacity) => Entries::Lru(LruCache::new(capacity)),
            None => Entries::Unbounded(HashMap::new()),
        };
        Self {
            entries,
            generation: None,
        }
    }

    /// Move the store to `generation` if it is newer, dropping every entry.
    pub(crate) fn advance(&mut self, generation: u64) -> Freshness {
        match self.generation {
            Some(current) if generation < current => Freshness::Stale,
            Some(current) if generation == current => Freshness::Current,
            _ => {
                self.clear();
                self.generation = Some(generation);
                Freshness::Current
            }
        }
    }

    /// Look up an entry, marking it most recently used.
    pub(crate) fn get(&mut self, key: &K) -> Option<V> {
        match &mut self.entries {
            Entries::Unbounded(map) => map.get(key).cloned(),
            Entries::Lru(lru) => lru.get(key).cloned(),
        }
    }

    /// Insert an entry computed under `generation`; results from any other
    /// generation are dropped.
    pub(crate) fn insert(&mut self, generation: u64, key: K, value: V) {
        if self.generation != Some(generation) {
            return;
        }
        match &mut self.entries {
            Entries::Unbounded(map) => {
                map.insert(key, value);
            }
            Entries::Lru(lru) => {
                lru.put(key, value);
            }
        }
    }

    pub(crate) fn clear(&mut self) {
        match &mut self.entries {
            Entries::Unbounded(map) => map.clear(),
            Entries::Lru(lru) => lru.clear(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        match &self.entries {
            Entries::Unbounded(map) => map.len(),
            Entries::Lru(lru) => lru.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn generation(&self) -> Option<u64> {
        self.generation
    }
}
