//! HashMap-backed concurrent containers.
//!
//! ## Architecture
//! - Keys are stored in `HashMap<K, Arc<V>>` for O(1) lookup.
//! - No capacity is enforced here; the buffer's bound lives in the
//!   [`AdmissionController`](crate::admission::AdmissionController).
//! - `ConcurrentHashMapStore` uses one `RwLock`; `ShardedHashMapStore` uses
//!   one `RwLock` per shard so writers on different keys rarely contend.
//!
//! ## Key Components
//! - `ConcurrentHashMapStore`: thread-safe store with a global `RwLock`.
//! - `ShardedHashMapStore`: thread-safe store with per-shard locks.
//!
//! Both implement [`ConcurrentStore`] (buffer storage) and
//! [`KeyValueStore`] with `Error = Infallible`, so either can also stand in
//! as an in-memory delegate.
//!
//! ## Core Operations
//! - `insert`: insert or update by key, returning the previous value.
//! - `get`: fetch by key (updates hit/miss metrics).
//! - `remove`: delete by key, returning the removed value.
//! - `segment_entries`: clone out one shard for weakly consistent iteration.
//!
//! ## Example Usage
//! ```rust
//! use std::sync::Arc;
//!
//! use spillcache::store::hashmap::ShardedHashMapStore;
//!
//! let store: ShardedHashMapStore<u64, String> = ShardedHashMapStore::new(4);
//! store.insert(1, Arc::new("a".to_string()));
//! assert!(store.contains(&1));
//! assert_eq!(store.remove(&1).as_deref().map(String::as_str), Some("a"));
//! ```
//!
//! ## Type Constraints
//! - `K: Eq + Hash + Clone` for lookup and snapshot iteration.
//! - `S: BuildHasher` for custom hashers (defaults to `RandomState`).
//!
//! ## Implementation Notes
//! - Sharded store uses the configured hasher to pick shards.
//! - Metrics are tracked with relaxed atomics.
//! - Inherent methods mirror the trait methods, so call sites that have both
//!   traits in scope still resolve unambiguously.
use std::collections::HashMap;
use std::collections::hash_map::RandomState;
use std::convert::Infallible;
use std::hash::{BuildHasher, Hash};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::RwLock;

use crate::store::traits::{ConcurrentStore, KeyValueStore, StoreIter, StoreMetrics};

/// Store metrics counters for concurrent hash map stores.
#[derive(Debug, Default)]
struct ConcurrentStoreCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    removes: AtomicU64,
}

impl ConcurrentStoreCounters {
    /// Snapshot current store metrics.
    fn snapshot(&self) -> StoreMetrics {
        StoreMetrics {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            removes: self.removes.load(Ordering::Relaxed),
        }
    }

    fn record_lookup(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_insert(&self, replaced: bool) {
        if replaced {
            self.updates.fetch_add(1, Ordering::Relaxed);
        } else {
            self.inserts.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_remove(&self) {
        self.removes.fetch_add(1, Ordering::Relaxed);
    }
}

/// Concurrent HashMap-backed store using a single lock.
#[derive(Debug)]
pub struct ConcurrentHashMapStore<K, V, S = RandomState> {
    map: RwLock<HashMap<K, Arc<V>, S>>,
    metrics: ConcurrentStoreCounters,
}

impl<K, V> ConcurrentHashMapStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create an empty store with the default hasher.
    pub fn new() -> Self {
        Self::with_capacity_and_hasher(0, RandomState::new())
    }

    /// Create a store pre-sized for `capacity` entries.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, RandomState::new())
    }
}

impl<K, V> Default for ConcurrentHashMapStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ConcurrentHashMapStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create a store pre-sized for `capacity` entries with a custom hasher.
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        Self {
            map: RwLock::new(HashMap::with_capacity_and_hasher(capacity, hasher)),
            metrics: ConcurrentStoreCounters::default(),
        }
    }

    /// Fetch a value by key.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let found = self.map.read().get(key).cloned();
        self.metrics.record_lookup(found.is_some());
        found
    }

    /// Check whether a key exists.
    pub fn contains(&self, key: &K) -> bool {
        self.map.read().contains_key(key)
    }

    /// Insert or update an entry. Returns the previous value if present.
    pub fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let previous = self.map.write().insert(key, value);
        self.metrics.record_insert(previous.is_some());
        previous
    }

    /// Replace the value of a present key. Returns `Err(value)` if absent.
    pub fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        let replaced = match self.map.write().get_mut(key) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(value),
        };
        if replaced.is_ok() {
            self.metrics.record_insert(true);
        }
        replaced
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let removed = self.map.write().remove(key);
        if removed.is_some() {
            self.metrics.record_remove();
        }
        removed
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    pub fn clear(&self) {
        self.map.write().clear();
    }

    /// Snapshot store metrics.
    pub fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}

impl<K, V, S> ConcurrentStore<K, V> for ConcurrentHashMapStore<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        self.get(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.insert(key, value)
    }

    fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        self.replace(key, value)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.remove(key)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn clear(&self) {
        self.clear()
    }

    fn segment_count(&self) -> usize {
        1
    }

    fn segment_entries(&self, index: usize) -> Vec<(K, Arc<V>)> {
        if index != 0 {
            return Vec::new();
        }
        self.map
            .read()
            .iter()
            .map(|(key, value)| (key.clone(), Arc::clone(value)))
            .collect()
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics()
    }
}

impl<K, V, S> KeyValueStore<K, V> for ConcurrentHashMapStore<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Send + Sync,
{
    type Error = Infallible;

    fn get(&self, key: &K) -> Result<Option<Arc<V>>, Infallible> {
        Ok(self.get(key))
    }

    fn put(&self, key: K, value: Arc<V>) -> Result<(), Infallible> {
        self.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.remove(key).is_some())
    }

    fn contains_key(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.contains(key))
    }

    fn iter(&self) -> StoreIter<'_, K, V, Infallible> {
        Box::new(self.entries().map(Ok))
    }
}

/// Concurrent HashMap-backed store with sharded locking.
#[derive(Debug)]
pub struct ShardedHashMapStore<K, V, S = RandomState> {
    shards: Vec<RwLock<HashMap<K, Arc<V>, S>>>,
    size: AtomicUsize,
    metrics: ConcurrentStoreCounters,
    hasher: S,
}

impl<K, V> ShardedHashMapStore<K, V, RandomState>
where
    K: Eq + Hash,
{
    /// Create an empty sharded store with the default hasher.
    pub fn new(shards: usize) -> Self {
        Self::with_capacity_and_hasher(0, shards, RandomState::new())
    }

    /// Create a sharded store pre-sized for `capacity` entries in total.
    pub fn with_capacity(capacity: usize, shards: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, shards, RandomState::new())
    }
}

impl<K, V, S> ShardedHashMapStore<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher + Clone,
{
    /// Create a sharded store with a custom hasher.
    ///
    /// The shard count is clamped to at least 1; `capacity` is spread evenly
    /// across shards as a pre-allocation hint.
    pub fn with_capacity_and_hasher(capacity: usize, shards: usize, hasher: S) -> Self {
        let shard_count = shards.max(1);
        let per_shard = capacity.div_ceil(shard_count);
        let shards = (0..shard_count)
            .map(|_| RwLock::new(HashMap::with_capacity_and_hasher(per_shard, hasher.clone())))
            .collect();
        Self {
            shards,
            size: AtomicUsize::new(0),
            metrics: ConcurrentStoreCounters::default(),
            hasher,
        }
    }

    /// Return the number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Compute the shard index for a key.
    fn shard_index(&self, key: &K) -> usize {
        (self.hasher.hash_one(key) as usize) % self.shards.len()
    }

    /// Fetch a value by key.
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.shard_index(key);
        let found = self.shards[idx].read().get(key).cloned();
        self.metrics.record_lookup(found.is_some());
        found
    }

    /// Check whether a key exists.
    pub fn contains(&self, key: &K) -> bool {
        let idx = self.shard_index(key);
        self.shards[idx].read().contains_key(key)
    }

    /// Insert or update an entry. Returns the previous value if present.
    pub fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        let idx = self.shard_index(&key);
        let mut shard = self.shards[idx].write();
        let previous = shard.insert(key, value);
        if previous.is_none() {
            self.size.fetch_add(1, Ordering::Relaxed);
        }
        drop(shard);
        self.metrics.record_insert(previous.is_some());
        previous
    }

    /// Replace the value of a present key. Returns `Err(value)` if absent.
    pub fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        let idx = self.shard_index(key);
        let replaced = match self.shards[idx].write().get_mut(key) {
            Some(slot) => Ok(std::mem::replace(slot, value)),
            None => Err(value),
        };
        if replaced.is_ok() {
            self.metrics.record_insert(true);
        }
        replaced
    }

    /// Remove a value by key.
    pub fn remove(&self, key: &K) -> Option<Arc<V>> {
        let idx = self.shard_index(key);
        let mut shard = self.shards[idx].write();
        let removed = shard.remove(key);
        if removed.is_some() {
            self.size.fetch_sub(1, Ordering::Relaxed);
        }
        drop(shard);
        if removed.is_some() {
            self.metrics.record_remove();
        }
        removed
    }

    /// Return the number of entries.
    pub fn len(&self) -> usize {
        self.size.load(Ordering::Relaxed)
    }

    /// Check whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all entries.
    ///
    /// Takes every shard lock before clearing so the size counter never
    /// disagrees with the shards once the call returns.
    pub fn clear(&self) {
        let mut guards: Vec<_> = self.shards.iter().map(|shard| shard.write()).collect();
        for guard in guards.iter_mut() {
            guard.clear();
        }
        self.size.store(0, Ordering::Relaxed);
    }

    /// Snapshot store metrics.
    pub fn metrics(&self) -> StoreMetrics {
        self.metrics.snapshot()
    }
}

impl<K, V, S> ConcurrentStore<K, V> for ShardedHashMapStore<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Clone + Send + Sync,
{
    fn get(&self, key: &K) -> Option<Arc<V>> {
        self.get(key)
    }

    fn contains(&self, key: &K) -> bool {
        self.contains(key)
    }

    fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.insert(key, value)
    }

    fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        self.replace(key, value)
    }

    fn remove(&self, key: &K) -> Option<Arc<V>> {
        self.remove(key)
    }

    fn len(&self) -> usize {
        self.len()
    }

    fn clear(&self) {
        self.clear()
    }

    fn segment_count(&self) -> usize {
        self.shards.len()
    }

    fn segment_entries(&self, index: usize) -> Vec<(K, Arc<V>)> {
        match self.shards.get(index) {
            Some(shard) => shard
                .read()
                .iter()
                .map(|(key, value)| (key.clone(), Arc::clone(value)))
                .collect(),
            None => Vec::new(),
        }
    }

    fn metrics(&self) -> StoreMetrics {
        self.metrics()
    }
}

impl<K, V, S> KeyValueStore<K, V> for ShardedHashMapStore<K, V, S>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Send + Sync,
    S: BuildHasher + Clone + Send + Sync,
{
    type Error = Infallible;

    fn get(&self, key: &K) -> Result<Option<Arc<V>>, Infallible> {
        Ok(self.get(key))
    }

    fn put(&self, key: K, value: Arc<V>) -> Result<(), Infallible> {
        self.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.remove(key).is_some())
    }

    fn contains_key(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.contains(key))
    }

    fn iter(&self) -> StoreIter<'_, K, V, Infallible> {
        Box::new(self.entries().map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::thread;

    use super::*;

    #[test]
    fn concurrent_store_basic_ops() {
        let store = ConcurrentHashMapStore::new();
        let value = Arc::new("v1".to_string());
        assert_eq!(store.insert("k1", value.clone()), None);
        assert_eq!(store.get(&"k1"), Some(value.clone()));
        assert!(store.contains(&"k1"));
        assert_eq!(store.len(), 1);
        assert_eq!(store.remove(&"k1"), Some(value));
        assert!(!store.contains(&"k1"));
        assert!(store.is_empty());
    }

    #[test]
    fn concurrent_store_update_returns_previous() {
        let store = ConcurrentHashMapStore::with_capacity(4);
        store.insert(1u32, Arc::new(10u32));
        let previous = store.insert(1, Arc::new(20));
        assert_eq!(previous.as_deref(), Some(&10));
        assert_eq!(store.get(&1).as_deref(), Some(&20));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_only_touches_present_keys() {
        let store = ShardedHashMapStore::new(2);
        let rejected = store.replace(&3u32, Arc::new(30u32));
        assert_eq!(rejected.unwrap_err().as_ref(), &30);
        assert!(store.is_empty());

        store.insert(3, Arc::new(1));
        assert_eq!(store.replace(&3, Arc::new(2)).unwrap().as_ref(), &1);
        assert_eq!(store.get(&3).as_deref(), Some(&2));
        assert_eq!(store.len(), 1);

        let single = ConcurrentHashMapStore::new();
        assert!(single.replace(&1u8, Arc::new(1u8)).is_err());
        single.insert(1, Arc::new(1));
        assert!(single.replace(&1, Arc::new(2)).is_ok());
        assert_eq!(single.metrics().updates, 1);
    }

    #[test]
    fn concurrent_store_metrics_track_ops() {
        let store = ConcurrentHashMapStore::new();
        store.insert(1u32, Arc::new(1u32));
        store.insert(1, Arc::new(2));
        let _ = store.get(&1);
        let _ = store.get(&2);
        store.remove(&1);
        store.remove(&1);

        let metrics = store.metrics();
        assert_eq!(metrics.inserts, 1);
        assert_eq!(metrics.updates, 1);
        assert_eq!(metrics.hits, 1);
        assert_eq!(metrics.misses, 1);
        assert_eq!(metrics.removes, 1);
    }

    #[test]
    fn concurrent_store_single_segment() {
        let store = ConcurrentHashMapStore::new();
        for i in 0..5u32 {
            store.insert(i, Arc::new(i));
        }
        assert_eq!(ConcurrentStore::segment_count(&store), 1);
        assert_eq!(ConcurrentStore::segment_entries(&store, 0).len(), 5);
        assert!(ConcurrentStore::segment_entries(&store, 1).is_empty());
    }

    #[test]
    fn sharded_store_basic_ops() {
        let store = ShardedHashMapStore::new(4);
        assert_eq!(store.shard_count(), 4);
        store.insert(1u64, Arc::new(100u64));
        store.insert(2, Arc::new(200));
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(&1).as_deref(), Some(&100));
        assert_eq!(store.remove(&2).as_deref(), Some(&200));
        assert_eq!(store.remove(&2), None);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn sharded_store_zero_shards_clamped() {
        let store: ShardedHashMapStore<u64, u64> = ShardedHashMapStore::new(0);
        assert_eq!(store.shard_count(), 1);
    }

    #[test]
    fn sharded_store_update_keeps_len() {
        let store = ShardedHashMapStore::new(8);
        store.insert(7u64, Arc::new(1u64));
        store.insert(7, Arc::new(2));
        assert_eq!(store.len(), 1);
        assert_eq!(store.metrics().updates, 1);
    }

    #[test]
    fn sharded_store_entries_cover_all_shards() {
        let store = ShardedHashMapStore::with_capacity(64, 8);
        for i in 0..64u64 {
            store.insert(i, Arc::new(i * 2));
        }
        let seen: HashSet<u64> = store.entries().map(|(k, _)| k).collect();
        assert_eq!(seen.len(), 64);
        assert!(store.entries().all(|(k, v)| *v == k * 2));
    }

    #[test]
    fn sharded_store_clear_resets_len() {
        let store = ShardedHashMapStore::new(4);
        for i in 0..32u64 {
            store.insert(i, Arc::new(i));
        }
        store.clear();
        assert_eq!(store.len(), 0);
        assert_eq!(store.entries().count(), 0);
    }

    #[test]
    fn sharded_store_as_key_value_store() {
        let store: ShardedHashMapStore<u64, u64> = ShardedHashMapStore::new(2);
        let kv: &dyn KeyValueStore<u64, u64, Error = Infallible> = &store;
        kv.put(1, Arc::new(1)).unwrap();
        assert!(kv.contains_key(&1).unwrap());
        assert_eq!(kv.get(&1).unwrap().as_deref(), Some(&1));
        assert_eq!(kv.iter().count(), 1);
        assert!(kv.remove(&1).unwrap());
        assert!(!kv.remove(&1).unwrap());
    }

    #[test]
    fn sharded_store_concurrent_distinct_inserts() {
        let store: Arc<ShardedHashMapStore<u64, u64>> = Arc::new(ShardedHashMapStore::new(8));
        let handles: Vec<_> = (0..8u64)
            .map(|tid| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..100u64 {
                        let key = tid * 100 + i;
                        store.insert(key, Arc::new(key));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 800);
        assert_eq!(store.entries().count(), 800);
    }
}
