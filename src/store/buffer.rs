//! Buffer tier: the bounded, in-memory side of the cache.
//!
//! [`BufferStore`] wraps a caller-supplied [`ConcurrentStore`] container. It
//! adds no capacity logic of its own; the facade only inserts new keys after
//! the [`AdmissionController`](crate::admission::AdmissionController) granted
//! a slot. Concurrent operations on the same key are serialized by the
//! container.

use std::convert::Infallible;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::store::traits::{ConcurrentStore, KeyValueStore, SegmentIter, StoreIter, StoreMetrics};

/// Thread-safe buffer wrapper around a [`ConcurrentStore`].
pub struct BufferStore<K, V, M> {
    map: M,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, M> BufferStore<K, V, M>
where
    M: ConcurrentStore<K, V>,
{
    /// Wrap an existing container. The container should start empty.
    pub fn new(map: M) -> Self {
        Self {
            map,
            _marker: PhantomData,
        }
    }

    /// Fetch a value by key.
    #[inline]
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.map.get(key)
    }

    /// Insert or update a value. Returns the previous value if present.
    #[inline]
    pub fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>> {
        self.map.insert(key, value)
    }

    /// Update `key` only if it is already buffered.
    ///
    /// Returns `Err(value)` when the key is absent so the caller can route
    /// the value elsewhere. Never creates an entry, so a concurrent `take`
    /// cannot be undone by a late update.
    #[inline]
    pub fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>> {
        self.map.replace(key, value)
    }

    /// Remove `key`, returning its value.
    #[inline]
    pub fn take(&self, key: &K) -> Option<Arc<V>> {
        self.map.remove(key)
    }

    /// Check whether `key` is buffered.
    #[inline]
    pub fn contains(&self, key: &K) -> bool {
        self.map.contains(key)
    }

    /// Number of buffered entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` if nothing is buffered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Weakly consistent iterator over buffered entries.
    pub fn entries(&self) -> SegmentIter<'_, K, V, M> {
        SegmentIter::new(&self.map)
    }

    /// Snapshot of the buffered keys.
    pub fn keys(&self) -> Vec<K> {
        self.entries().map(|(key, _)| key).collect()
    }

    /// Container-level metrics.
    pub fn metrics(&self) -> StoreMetrics {
        self.map.metrics()
    }

    /// Borrow the underlying container.
    pub fn inner(&self) -> &M {
        &self.map
    }
}

impl<K, V, M> KeyValueStore<K, V> for BufferStore<K, V, M>
where
    M: ConcurrentStore<K, V>,
{
    type Error = Infallible;

    fn get(&self, key: &K) -> Result<Option<Arc<V>>, Infallible> {
        Ok(self.map.get(key))
    }

    fn put(&self, key: K, value: Arc<V>) -> Result<(), Infallible> {
        self.map.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.map.remove(key).is_some())
    }

    fn contains_key(&self, key: &K) -> Result<bool, Infallible> {
        Ok(self.map.contains(key))
    }

    fn iter(&self) -> StoreIter<'_, K, V, Infallible> {
        Box::new(self.entries().map(Ok))
    }
}

impl<K, V, M> fmt::Debug for BufferStore<K, V, M>
where
    M: ConcurrentStore<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferStore")
            .field("len", &self.map.len())
            .field("segments", &self.map.segment_count())
            .finish()
    }
}
