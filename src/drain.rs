//! Exactly-once draining by cooperating workers.
//!
//! [`SpillCache::iter`] is weakly consistent and removes nothing, so two
//! workers scanning the same cache would see the same entries. A shared
//! [`ClaimSet`] prevents that: keys are enumerated and claimed while holding
//! one short lock, then processed and removed with the lock released.
//!
//! ```text
//!   worker ──lock──► iter() ─► skip claimed ─► claim up to `max` ──unlock──┐
//!     ▲                                                                     │
//!     │            process(entry) ─► cache.remove(key) ─► release(key) ◄────┘
//!     └───────────────────────── until a claim returns nothing
//! ```
//!
//! Keys stay claimed until their removal finished, so a concurrent scan
//! that still sees the entry skips it.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//!
//! use spillcache::builder::SpillCacheBuilder;
//! use spillcache::drain::ClaimSet;
//! use spillcache::store::hashmap::ShardedHashMapStore;
//!
//! let delegate: ShardedHashMapStore<u32, u32> = ShardedHashMapStore::new(2);
//! let cache = Arc::new(SpillCacheBuilder::new(8).build(delegate));
//! for i in 0..32u32 {
//!     cache.put(i, i).unwrap();
//! }
//!
//! let claims = Arc::new(ClaimSet::new());
//! let workers: Vec<_> = (0..4)
//!     .map(|_| {
//!         let cache = Arc::clone(&cache);
//!         let claims = Arc::clone(&claims);
//!         thread::spawn(move || claims.drain_with(&cache, 4, |_, _| {}).unwrap().processed)
//!     })
//!     .collect();
//!
//! let processed: usize = workers.into_iter().map(|w| w.join().unwrap()).sum();
//! assert_eq!(processed, 32);
//! assert_eq!(cache.iter().count(), 0);
//! ```

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::trace;

use crate::cache::SpillCache;
use crate::error::CacheError;
use crate::store::traits::{ConcurrentStore, KeyValueStore};

/// Counters returned by [`ClaimSet::drain_with`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    /// Non-empty batches claimed.
    pub batches: usize,
    /// Entries handed to the processing closure.
    pub processed: usize,
    /// Processed entries that were already gone when removed.
    pub already_gone: usize,
}

/// Set of keys currently claimed by some worker.
#[derive(Debug)]
pub struct ClaimSet<K> {
    claimed: Mutex<FxHashSet<K>>,
}

impl<K> Default for ClaimSet<K> {
    fn default() -> Self {
        Self {
            claimed: Mutex::new(FxHashSet::default()),
        }
    }
}

impl<K> ClaimSet<K>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty claim set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims up to `max` unclaimed entries of `cache`.
    ///
    /// Buffer entries are claimed before delegate entries. The delegate scan
    /// is only opened if the buffer did not fill the batch. An empty result
    /// means nothing was left to claim at the time of the scan.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::Delegate`] if scanning the delegate fails. Keys
    /// claimed by this call are released first.
    pub fn claim_batch<V, D, M>(
        &self,
        cache: &SpillCache<K, V, D, M>,
        max: usize,
    ) -> Result<Vec<(K, Arc<V>)>, CacheError<D::Error>>
    where
        D: KeyValueStore<K, V>,
        M: ConcurrentStore<K, V>,
    {
        let mut claimed = self.claimed.lock();
        let mut batch = Vec::new();
        for item in cache.iter() {
            if batch.len() >= max {
                break;
            }
            let (key, value) = match item {
                Ok(entry) => entry,
                Err(e) => {
                    for (key, _) in &batch {
                        claimed.remove(key);
                    }
                    return Err(e);
                },
            };
            if claimed.insert(key.clone()) {
                batch.push((key, value));
            }
        }
        Ok(batch)
    }

    /// Releases a claim once the entry has been removed.
    pub fn release(&self, key: &K) -> bool {
        self.claimed.lock().remove(key)
    }

    /// Returns `true` if `key` is currently claimed.
    pub fn is_claimed(&self, key: &K) -> bool {
        self.claimed.lock().contains(key)
    }

    /// Number of outstanding claims.
    pub fn len(&self) -> usize {
        self.claimed.lock().len()
    }

    /// Returns `true` if nothing is claimed.
    pub fn is_empty(&self) -> bool {
        self.claimed.lock().is_empty()
    }

    /// Repeatedly claims up to `batch` entries, hands each to `process`,
    /// then removes it from `cache`, until a claim comes back empty.
    ///
    /// `process` runs without the claim lock held.
    ///
    /// # Errors
    ///
    /// Returns the first [`CacheError`] raised by a claim or a removal. The
    /// remaining claims of the failing batch are released, so their entries
    /// stay in the cache and can be drained again.
    pub fn drain_with<V, D, M, F>(
        &self,
        cache: &SpillCache<K, V, D, M>,
        batch: usize,
        mut process: F,
    ) -> Result<DrainStats, CacheError<D::Error>>
    where
        D: KeyValueStore<K, V>,
        M: ConcurrentStore<K, V>,
        F: FnMut(&K, &V),
    {
        let batch = batch.max(1);
        let mut stats = DrainStats::default();
        loop {
            let claimed = self.claim_batch(cache, batch)?;
            if claimed.is_empty() {
                break;
            }
            stats.batches += 1;
            trace!(entries = claimed.len(), "drain batch claimed");

            let mut entries = claimed.into_iter();
            while let Some((key, value)) = entries.next() {
                process(&key, &value);
                stats.processed += 1;
                let removed = cache.remove(&key);
                self.release(&key);
                match removed {
                    Ok(true) => {},
                    Ok(false) => stats.already_gone += 1,
                    Err(e) => {
                        for (rest, _) in entries {
                            self.release(&rest);
                        }
                        return Err(e);
                    },
                }
            }
        }
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::hashmap::ShardedHashMapStore;
    use crate::store::traits::StoreIter;

    fn filled(capacity: usize, entries: u32) -> SpillCache<u32, u32, ShardedHashMapStore<u32, u32>> {
        let cache = SpillCache::new(
            ShardedHashMapStore::new(2),
            capacity,
            ShardedHashMapStore::new(2),
        );
        for i in 0..entries {
            cache.put(i, i).unwrap();
        }
        cache
    }

    #[test]
    fn claims_are_disjoint_across_batches() {
        let cache = filled(3, 10);
        let claims = ClaimSet::new();

        let first = claims.claim_batch(&cache, 4).unwrap();
        let second = claims.claim_batch(&cache, 4).unwrap();
        let third = claims.claim_batch(&cache, 4).unwrap();
        assert_eq!((first.len(), second.len(), third.len()), (4, 4, 2));
        assert!(claims.claim_batch(&cache, 4).unwrap().is_empty());

        let keys: HashSet<u32> = first
            .iter()
            .chain(&second)
            .chain(&third)
            .map(|(k, _)| *k)
            .collect();
        assert_eq!(keys.len(), 10);
        assert_eq!(claims.len(), 10);
        // Claiming removes nothing.
        assert_eq!(cache.iter().count(), 10);
    }

    #[test]
    fn buffer_entries_are_claimed_first() {
        let cache = filled(2, 6);
        let claims = ClaimSet::new();
        let batch = claims.claim_batch(&cache, 2).unwrap();
        assert!(batch.iter().all(|(k, _)| cache.buffer().contains(k)));
    }

    #[test]
    fn release_makes_key_claimable_again() {
        let cache = filled(2, 1);
        let claims = ClaimSet::new();
        let batch = claims.claim_batch(&cache, 8).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(claims.is_claimed(&0));
        assert!(claims.claim_batch(&cache, 8).unwrap().is_empty());

        assert!(claims.release(&0));
        assert!(!claims.release(&0));
        assert!(claims.is_empty());
        assert_eq!(claims.claim_batch(&cache, 8).unwrap().len(), 1);
    }

    #[test]
    fn drain_empties_cache_and_counts() {
        let cache = filled(5, 23);
        let claims = ClaimSet::new();
        let mut seen = Vec::new();

        let stats = claims
            .drain_with(&cache, 10, |k, v| {
                assert_eq!(k, v);
                seen.push(*k);
            })
            .unwrap();

        assert_eq!(stats.processed, 23);
        assert_eq!(stats.batches, 3);
        assert_eq!(stats.already_gone, 0);
        seen.sort_unstable();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
        assert_eq!(cache.iter().count(), 0);
        assert_eq!(cache.occupancy(), 0);
        assert!(claims.is_empty());
        cache.check_invariants().unwrap();
    }

    #[test]
    fn entries_removed_elsewhere_count_as_gone() {
        let cache = filled(4, 4);
        let claims = ClaimSet::new();
        let stats = claims
            .drain_with(&cache, 4, |k, _| {
                // Someone else removes the entry while it is being processed.
                cache.remove(k).unwrap();
            })
            .unwrap();
        assert_eq!(stats.processed, 4);
        assert_eq!(stats.already_gone, 4);
    }

    struct BrittleStore {
        fail_removes: AtomicBool,
        inner: ShardedHashMapStore<u32, u32>,
    }

    impl KeyValueStore<u32, u32> for BrittleStore {
        type Error = io::Error;

        fn get(&self, key: &u32) -> Result<Option<Arc<u32>>, io::Error> {
            Ok(self.inner.get(key))
        }

        fn put(&self, key: u32, value: Arc<u32>) -> Result<(), io::Error> {
            self.inner.insert(key, value);
            Ok(())
        }

        fn remove(&self, key: &u32) -> Result<bool, io::Error> {
            if self.fail_removes.load(Ordering::Relaxed) {
                return Err(io::Error::other("remove refused"));
            }
            Ok(self.inner.remove(key).is_some())
        }

        fn contains_key(&self, key: &u32) -> Result<bool, io::Error> {
            Ok(self.inner.contains(key))
        }

        fn iter(&self) -> StoreIter<'_, u32, u32, io::Error> {
            Box::new(self.inner.entries().map(Ok))
        }
    }

    #[test]
    fn removal_failure_releases_batch_claims() {
        let delegate = BrittleStore {
            fail_removes: AtomicBool::new(true),
            inner: ShardedHashMapStore::new(1),
        };
        for i in 0..3 {
            delegate.inner.insert(i, Arc::new(i));
        }
        let cache = SpillCache::new(delegate, 1, ShardedHashMapStore::new(1));
        let claims = ClaimSet::new();

        let err = claims.drain_with(&cache, 3, |_, _| {}).unwrap_err();
        assert!(err.delegate_error().is_some());
        assert!(claims.is_empty());
        assert_eq!(cache.iter().count(), 3);

        cache.overflow().delegate().fail_removes.store(false, Ordering::Relaxed);
        let stats = claims.drain_with(&cache, 3, |_, _| {}).unwrap();
        assert_eq!(stats.processed, 3);
        assert_eq!(cache.iter().count(), 0);
    }
}
