//! Storage traits shared by both cache tiers.
//!
//! Two seams live here:
//!
//! - [`ConcurrentStore`]: the in-memory container backing the buffer. It is
//!   infallible, thread-safe through interior mutability, and knows nothing
//!   about capacity (admission is decided by
//!   [`AdmissionController`](crate::admission::AdmissionController)).
//! - [`KeyValueStore`]: the narrow key/value capability both tiers expose to
//!   the facade. The delegate store is consumed through it, and the buffer
//!   wrapper implements it with `Error = Infallible`, so lookups and
//!   iteration stay store-agnostic.

use std::sync::Arc;

/// Boxed, lazily evaluated iterator over a store's entries.
///
/// Items are fallible so that remote stores can report failures mid-scan.
pub type StoreIter<'a, K, V, E> = Box<dyn Iterator<Item = Result<(K, Arc<V>), E>> + 'a>;

/// Snapshot of store-level metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreMetrics {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub removes: u64,
}

/// Thread-safe associative container used as buffer storage.
///
/// All methods take `&self`; implementations provide their own per-key
/// atomicity (e.g. a write lock per shard). Iteration is exposed as a
/// sequence of *segments* so that callers can walk the container without
/// holding any lock across segment boundaries.
pub trait ConcurrentStore<K, V>: Send + Sync {
    /// Fetch a value by key.
    fn get(&self, key: &K) -> Option<Arc<V>>;

    /// Check if a key exists.
    fn contains(&self, key: &K) -> bool;

    /// Insert or update a value. Returns the previous value if present.
    fn insert(&self, key: K, value: Arc<V>) -> Option<Arc<V>>;

    /// Replace the value of a key that is already present.
    ///
    /// The presence check and the write happen atomically. Returns the
    /// previous value, or `Err(value)` if the key is absent.
    fn replace(&self, key: &K, value: Arc<V>) -> Result<Arc<V>, Arc<V>>;

    /// Remove a value by key, returning it.
    fn remove(&self, key: &K) -> Option<Arc<V>>;

    /// Current number of entries.
    fn len(&self) -> usize;

    /// Check if the store is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove all entries.
    fn clear(&self);

    /// Number of independently locked segments. Constant for the lifetime
    /// of the store.
    fn segment_count(&self) -> usize;

    /// Clone out the entries of one segment.
    ///
    /// Out-of-range indices yield an empty vector.
    fn segment_entries(&self, index: usize) -> Vec<(K, Arc<V>)>;

    /// Snapshot the store's current metrics.
    fn metrics(&self) -> StoreMetrics {
        StoreMetrics::default()
    }

    /// Walk all entries segment by segment.
    fn entries(&self) -> SegmentIter<'_, K, V, Self>
    where
        Self: Sized,
    {
        SegmentIter::new(self)
    }
}

/// Weakly consistent iterator over a [`ConcurrentStore`].
///
/// Each segment is cloned out under its own lock only when the previous one
/// is exhausted, so writers are never blocked across `next()` calls. Entries
/// inserted into an already visited segment are not observed; entries removed
/// from a not-yet-visited segment are not yielded.
pub struct SegmentIter<'a, K, V, S: ?Sized> {
    store: &'a S,
    next_segment: usize,
    current: std::vec::IntoIter<(K, Arc<V>)>,
}

impl<'a, K, V, S> SegmentIter<'a, K, V, S>
where
    S: ConcurrentStore<K, V> + ?Sized,
{
    /// Start iterating at the first segment.
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            next_segment: 0,
            current: Vec::new().into_iter(),
        }
    }
}

impl<K, V, S> Iterator for SegmentIter<'_, K, V, S>
where
    S: ConcurrentStore<K, V> + ?Sized,
{
    type Item = (K, Arc<V>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.current.next() {
                return Some(entry);
            }
            if self.next_segment >= self.store.segment_count() {
                return None;
            }
            self.current = self.store.segment_entries(self.next_segment).into_iter();
            self.next_segment += 1;
        }
    }
}

impl<K, V, S> std::iter::FusedIterator for SegmentIter<'_, K, V, S> where
    S: ConcurrentStore<K, V> + ?Sized
{
}

/// Key/value capability consumed by the cache for its delegate tier.
///
/// Implementations may block (network, disk). Errors are reported through
/// [`Self::Error`] and are propagated by the cache without retries.
pub trait KeyValueStore<K, V> {
    /// Failure type reported by this store.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch a value by key.
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, Self::Error>;

    /// Insert or update a value.
    fn put(&self, key: K, value: Arc<V>) -> Result<(), Self::Error>;

    /// Remove a value. Returns `true` if the key was present.
    fn remove(&self, key: &K) -> Result<bool, Self::Error>;

    /// Check whether a key is present.
    fn contains_key(&self, key: &K) -> Result<bool, Self::Error>;

    /// Iterate over the entries currently visible in the store.
    ///
    /// Implementations should be weakly consistent: concurrent writers must
    /// not be blocked for the lifetime of the iterator.
    fn iter(&self) -> StoreIter<'_, K, V, Self::Error>;
}
