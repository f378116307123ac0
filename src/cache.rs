//! Cache facade: a bounded write buffer that spills into a delegate store.
//!
//! ## Architecture
//!
//! ```text
//!                        ┌──────────────────────────────────────────┐
//!                        │           SpillCache<K, V, D, M>         │
//!                        │                                          │
//!   put / remove / get ─►│  ┌────────────────┐  ┌────────────────┐  │
//!                        │  │  BufferStore   │  │ OverflowAdapter│  │
//!                        │  │  (M, bounded)  │  │   (D, slow)    │  │
//!                        │  └───────▲────────┘  └───────▲────────┘  │
//!                        │          │ slots             │ spill     │
//!                        │  ┌───────┴────────────────────┴───────┐  │
//!                        │  │ AdmissionController (atomic CAS)   │  │
//!                        │  └────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────┘
//! ```
//!
//! ## Residency
//!
//! At every quiescent point a key lives in at most one tier:
//!
//! ```text
//!   Absent ──put (admitted)──► BufferResident ──remove──► Absent
//!   Absent ──put (full)──────► DelegateResident ──remove──► Absent
//!   DelegateResident ──put (admitted, delegate copy removed)──► BufferResident
//! ```
//!
//! A buffered key is never demoted to the delegate; it only leaves through
//! `remove`.
//!
//! ## Operations
//!
//! | Operation      | Buffer                     | Delegate                        |
//! |----------------|----------------------------|---------------------------------|
//! | `put` (hot)    | replaced in place          | untouched                       |
//! | `put` (admit)  | inserted                   | stale copy removed first        |
//! | `put` (full)   | untouched                  | inserted or updated             |
//! | `remove`       | taken, slot released       | removed if not buffered         |
//! | `get`/`contains_key` | checked first        | checked on buffer miss          |
//! | `iter`         | yielded first              | yielded second, opened lazily   |
//!
//! ## Draining
//!
//! The cache does not serialize multi-entry consumer transactions. Workers
//! that must process every entry at most once coordinate on a shared claim
//! set: enumerate with [`SpillCache::iter`] and mark claimed keys *under a
//! lock*, then process and [`SpillCache::remove`] them *outside* the lock.
//! [`ClaimSet`](crate::drain::ClaimSet) packages this convention.
//!
//! ## Example Usage
//!
//! ```
//! use spillcache::cache::SpillCache;
//! use spillcache::store::hashmap::ShardedHashMapStore;
//! use spillcache::view::Tier;
//!
//! let delegate: ShardedHashMapStore<u32, String> = ShardedHashMapStore::new(4);
//! let cache = SpillCache::new(delegate, 1, ShardedHashMapStore::new(4));
//!
//! cache.put(1, "fast".to_string()).unwrap();
//! cache.put(2, "spilled".to_string()).unwrap();
//!
//! assert_eq!(cache.locate(&1).unwrap(), Some(Tier::Buffer));
//! assert_eq!(cache.locate(&2).unwrap(), Some(Tier::Delegate));
//! assert_eq!(cache.iter().count(), 2);
//!
//! assert!(cache.remove(&1).unwrap());
//! assert!(!cache.remove(&1).unwrap());
//! ```
//!
//! ## Thread Safety
//!
//! All operations take `&self`. The common put/remove path takes no global
//! lock: the buffer container locks per shard and admission is a single
//! compare-and-swap counter. `SpillCache` is `Send + Sync` whenever its
//! key, value, delegate and container types are.

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering, fence};

use tracing::{debug, trace};

use crate::admission::AdmissionController;
use crate::error::{CacheError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::SpillMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::SpillMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{MetricsReset, MetricsSnapshotProvider, SpillMetricsRecorder};
use crate::store::buffer::BufferStore;
use crate::store::hashmap::ShardedHashMapStore;
use crate::store::overflow::OverflowAdapter;
use crate::store::traits::{ConcurrentStore, KeyValueStore};
use crate::view::{Tier, UnifiedIter};

/// Predicate deciding whether a key is acceptable.
///
/// Rejected keys fail with [`CacheError::InvalidArgument`] before any state
/// is touched.
pub type KeyFilter<K> = Arc<dyn Fn(&K) -> bool + Send + Sync>;

/// Iterator returned by [`SpillCache::iter`].
pub type CacheIter<'a, K, V, D> = UnifiedIter<'a, K, V, OverflowAdapter<K, V, D>>;

/// Bounded write-buffering cache with delegate overflow.
///
/// New keys are admitted into the buffer while it has free slots; once it
/// is full they are written to the delegate instead. Keys already buffered
/// are always updated in place.
pub struct SpillCache<K, V, D, M = ShardedHashMapStore<K, V>>
where
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    buffer: BufferStore<K, V, M>,
    overflow: OverflowAdapter<K, V, D>,
    admission: AdmissionController,
    key_filter: Option<KeyFilter<K>>,
    spill_epoch: AtomicU64,
    closed: AtomicBool,
    #[cfg(feature = "metrics")]
    metrics: SpillMetrics,
}

impl<K, V, D, M> SpillCache<K, V, D, M>
where
    K: Eq + Hash + Clone,
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    /// Creates a cache buffering up to `capacity` entries in `container`
    /// and spilling the rest into `delegate`.
    ///
    /// `container` should be empty; entries already in it are not counted
    /// against the capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero. See [`try_new`](Self::try_new).
    pub fn new(delegate: D, capacity: usize, container: M) -> Self {
        match Self::try_new(delegate, capacity, container) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }

    /// Creates a cache, returning an error on invalid parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if `capacity` is zero.
    pub fn try_new(delegate: D, capacity: usize, container: M) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::new("buffer capacity must be greater than zero"));
        }
        debug!(capacity, "spill cache created");
        Ok(Self {
            buffer: BufferStore::new(container),
            overflow: OverflowAdapter::new(delegate),
            admission: AdmissionController::new(capacity),
            key_filter: None,
            spill_epoch: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            #[cfg(feature = "metrics")]
            metrics: SpillMetrics::default(),
        })
    }

    /// Installs a key filter. Keys for which `filter` returns `false` are
    /// rejected with [`CacheError::InvalidArgument`].
    pub fn with_key_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        self.key_filter = Some(Arc::new(filter));
        self
    }

    pub(crate) fn set_key_filter(&mut self, filter: Option<KeyFilter<K>>) {
        self.key_filter = filter;
    }

    fn validate(&self, key: &K) -> Result<(), CacheError<D::Error>> {
        match &self.key_filter {
            Some(accept) if !accept(key) => Err(CacheError::InvalidArgument(
                "key rejected by key filter".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Inserts or updates `key`.
    ///
    /// See [`put_arc`](Self::put_arc) for placement rules.
    pub fn put(&self, key: K, value: V) -> Result<(), CacheError<D::Error>> {
        self.put_arc(key, Arc::new(value))
    }

    /// Inserts or updates `key` with a shared value.
    ///
    /// 1. A key already in the buffer is replaced in place.
    /// 2. Otherwise a buffer slot is requested. If granted, any stale copy
    ///    of the key is removed from the delegate first, then the entry is
    ///    buffered.
    /// 3. If the buffer is full, the entry is written to the delegate.
    ///
    /// Concurrent puts of one key may take different routes; whichever copy
    /// reaches the buffer wins and the delegate copy is removed before the
    /// last of them returns.
    ///
    /// # Errors
    ///
    /// [`CacheError::InvalidArgument`] if the key filter rejects `key`;
    /// [`CacheError::Delegate`] if a delegate call fails. When removing the
    /// stale delegate copy fails, the granted slot is returned and the
    /// buffer is left untouched.
    pub fn put_arc(&self, key: K, value: Arc<V>) -> Result<(), CacheError<D::Error>> {
        self.validate(&key)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_put_call();

        let value = match self.buffer.replace(&key, value) {
            Ok(_) => {
                #[cfg(feature = "metrics")]
                self.metrics.record_put_update();
                return Ok(());
            },
            Err(value) => value,
        };

        if self.admission.try_admit() {
            self.admit(key, value)
        } else {
            self.spill(key, value)
        }
    }

    /// Buffers `key` under a slot the caller already reserved.
    fn admit(&self, key: K, value: Arc<V>) -> Result<(), CacheError<D::Error>> {
        // Any spill whose delegate write lands after the guard below bumps
        // the epoch past this value.
        let epoch = self.spill_epoch.load(Ordering::SeqCst);

        match self.overflow.remove(&key) {
            Ok(true) => {
                trace!("stale delegate copy removed on admission");
                #[cfg(feature = "metrics")]
                self.metrics.record_readmission();
            },
            Ok(false) => {},
            Err(e) => {
                self.admission.release();
                return Err(CacheError::Delegate(e));
            },
        }

        if self.buffer.insert(key.clone(), value).is_some() {
            // Another put admitted the same key first; its slot covers the entry.
            self.admission.release();
            trace!("concurrent admission of one key; surplus slot released");
            #[cfg(feature = "metrics")]
            self.metrics.record_surplus_release();
        }
        #[cfg(feature = "metrics")]
        self.metrics.record_admission();

        // Pairs with the fence in `spill`: either that spill sees the entry
        // buffered above, or this load sees its epoch bump.
        fence(Ordering::SeqCst);
        if self.spill_epoch.load(Ordering::SeqCst) != epoch {
            self.repair_shadowed(&key)?;
        }
        Ok(())
    }

    /// Writes `key` to the delegate because the buffer is full.
    fn spill(&self, key: K, value: Arc<V>) -> Result<(), CacheError<D::Error>> {
        trace!(
            occupancy = self.admission.occupancy(),
            capacity = self.admission.capacity(),
            "buffer full; entry routed to delegate"
        );
        self.overflow
            .put(key.clone(), value)
            .map_err(CacheError::Delegate)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_overflow();

        self.spill_epoch.fetch_add(1, Ordering::SeqCst);
        fence(Ordering::SeqCst);
        // A racing put may have buffered the key meanwhile.
        if self.buffer.contains(&key) {
            self.repair_shadowed(&key)?;
        }
        Ok(())
    }

    /// Drops the delegate copy of a key that is also buffered. Reads already
    /// prefer the buffered copy.
    fn repair_shadowed(&self, key: &K) -> Result<(), CacheError<D::Error>> {
        if self.overflow.remove(key).map_err(CacheError::Delegate)? {
            trace!("delegate copy shadowed by buffer; removed");
            #[cfg(feature = "metrics")]
            self.metrics.record_shadow_repair();
        }
        Ok(())
    }

    /// Removes `key` from whichever tier holds it.
    ///
    /// Returns `true` if an entry was removed. Entries written straight into
    /// the delegate by other parties are removed as well.
    pub fn remove(&self, key: &K) -> Result<bool, CacheError<D::Error>> {
        self.validate(key)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_remove_call();

        if self.buffer.take(key).is_some() {
            self.admission.release();
            #[cfg(feature = "metrics")]
            self.metrics.record_buffer_remove();
            return Ok(true);
        }

        let removed = self.overflow.remove(key).map_err(CacheError::Delegate)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_delegate_remove_outcome(removed);
        Ok(removed)
    }

    /// Looks `key` up in the buffer, then in the delegate.
    pub fn get(&self, key: &K) -> Result<Option<Arc<V>>, CacheError<D::Error>> {
        self.validate(key)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_get_call();

        if let Some(value) = self.buffer.get(key) {
            #[cfg(feature = "metrics")]
            self.metrics.record_buffer_hit();
            return Ok(Some(value));
        }

        let found = self.overflow.get(key).map_err(CacheError::Delegate)?;
        #[cfg(feature = "metrics")]
        self.metrics.record_delegate_lookup(found.is_some());
        Ok(found)
    }

    /// Returns `true` if either tier holds `key`.
    pub fn contains_key(&self, key: &K) -> Result<bool, CacheError<D::Error>> {
        self.validate(key)?;
        if self.buffer.contains(key) {
            return Ok(true);
        }
        self.overflow
            .contains_key(key)
            .map_err(CacheError::Delegate)
    }

    /// Reports which tier currently holds `key`.
    pub fn locate(&self, key: &K) -> Result<Option<Tier>, CacheError<D::Error>> {
        self.validate(key)?;
        if self.buffer.contains(key) {
            return Ok(Some(Tier::Buffer));
        }
        let in_delegate = self
            .overflow
            .contains_key(key)
            .map_err(CacheError::Delegate)?;
        Ok(in_delegate.then_some(Tier::Delegate))
    }

    /// Iterates over buffered entries, then delegate entries.
    ///
    /// The sequence is lazy and weakly consistent: concurrent writes may or
    /// may not be observed. Nothing is removed. See the
    /// [module docs](self#draining) for the drain convention.
    pub fn iter(&self) -> CacheIter<'_, K, V, D> {
        UnifiedIter::new(&self.buffer, &self.overflow)
    }

    /// Marks the cache closed. Idempotent.
    ///
    /// Closing is a lifecycle signal, not a purge: neither tier is cleared,
    /// and operations keep working afterwards.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(
                buffered = self.buffer.len(),
                occupancy = self.admission.occupancy(),
                "spill cache closed"
            );
        }
    }

    /// Returns `true` once [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Maximum number of buffered entries.
    pub fn capacity(&self) -> usize {
        self.admission.capacity()
    }

    /// Number of buffer slots currently granted.
    pub fn occupancy(&self) -> usize {
        self.admission.occupancy()
    }

    /// Number of entries currently in the buffer.
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// The buffer tier.
    pub fn buffer(&self) -> &BufferStore<K, V, M> {
        &self.buffer
    }

    /// The delegate tier.
    pub fn overflow(&self) -> &OverflowAdapter<K, V, D> {
        &self.overflow
    }

    /// Validates occupancy and residency bookkeeping.
    ///
    /// Only meaningful at a quiescent point (no put/remove in flight).
    /// Checks that occupancy equals the buffer length, that it does not
    /// exceed capacity, and that no buffered key is also in the delegate.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let occupancy = self.admission.occupancy();
        let buffered = self.buffer.len();
        if occupancy != buffered {
            return Err(InvariantError::new(format!(
                "occupancy {} does not match buffer length {}",
                occupancy, buffered
            )));
        }
        if occupancy > self.admission.capacity() {
            return Err(InvariantError::new(format!(
                "occupancy {} exceeds capacity {}",
                occupancy,
                self.admission.capacity()
            )));
        }
        for (key, _) in self.buffer.entries() {
            let duplicated = self.overflow.contains_key(&key).map_err(|e| {
                InvariantError::new(format!("delegate lookup failed during check: {}", e))
            })?;
            if duplicated {
                return Err(InvariantError::new(
                    "key resident in both buffer and delegate",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "metrics")]
impl<K, V, D, M> SpillCache<K, V, D, M>
where
    K: Eq + Hash + Clone,
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    /// Snapshot counters and gauges.
    pub fn metrics_snapshot(&self) -> SpillMetricsSnapshot {
        self.metrics.snapshot(
            self.admission.occupancy(),
            self.buffer.len(),
            self.admission.capacity(),
        )
    }
}

#[cfg(feature = "metrics")]
impl<K, V, D, M> MetricsSnapshotProvider<SpillMetricsSnapshot> for SpillCache<K, V, D, M>
where
    K: Eq + Hash + Clone,
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    fn snapshot(&self) -> SpillMetricsSnapshot {
        self.metrics_snapshot()
    }
}

#[cfg(feature = "metrics")]
impl<K, V, D, M> MetricsReset for SpillCache<K, V, D, M>
where
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    fn reset_metrics(&self) {
        self.metrics.reset_metrics();
    }
}

impl<K, V, D, M> fmt::Debug for SpillCache<K, V, D, M>
where
    D: KeyValueStore<K, V>,
    M: ConcurrentStore<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpillCache")
            .field("capacity", &self.admission.capacity())
            .field("occupancy", &self.admission.occupancy())
            .field("buffer_len", &self.buffer.len())
            .field("key_filter", &self.key_filter.is_some())
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish()
    }
}
