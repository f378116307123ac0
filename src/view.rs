//! Unified, two-phase view over both tiers.
//!
//! ```text
//!   SpillCache::iter()
//!        │
//!        ▼
//!   ┌──────────────┐ exhausted ┌────────────────┐ exhausted ┌──────┐
//!   │ Buffer phase │──────────►│ Delegate phase │──────────►│ Done │
//!   │ shard by     │           │ delegate.iter()│           └──────┘
//!   │ shard        │           │ opened lazily  │
//!   └──────────────┘           └────────────────┘
//! ```
//!
//! The view is weakly consistent. No lock is held between `next()` calls,
//! so entries written or removed by other threads during iteration may or
//! may not be observed. A key moving from the delegate into the buffer is
//! removed from the delegate before it is buffered, so it can be missed by
//! a scan that is already past the buffer, but it is never yielded twice by
//! that move.
//!
//! Each call to [`SpillCache::iter`](crate::cache::SpillCache::iter) builds a
//! fresh iterator; nothing is carried over between scans.

use std::convert::Infallible;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::Arc;

use crate::error::CacheError;
use crate::store::traits::{KeyValueStore, StoreIter};

/// The tier an entry lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// The bounded in-memory buffer.
    Buffer,
    /// The backing delegate store.
    Delegate,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Buffer => f.write_str("buffer"),
            Tier::Delegate => f.write_str("delegate"),
        }
    }
}

enum Phase<'a, K, V, E> {
    Buffer(StoreIter<'a, K, V, Infallible>),
    Delegate(StoreIter<'a, K, V, E>),
    Done,
}

/// Iterator yielding buffer entries, then delegate entries.
///
/// Items are `Result`s because scanning the delegate may fail; errors are
/// wrapped in [`CacheError::Delegate`] and iteration continues with
/// whatever the delegate yields next.
pub struct UnifiedIter<'a, K, V, D>
where
    D: KeyValueStore<K, V>,
{
    phase: Phase<'a, K, V, D::Error>,
    delegate: &'a D,
}

impl<'a, K, V, D> UnifiedIter<'a, K, V, D>
where
    D: KeyValueStore<K, V>,
{
    pub(crate) fn new<B>(buffer: &'a B, delegate: &'a D) -> Self
    where
        B: KeyValueStore<K, V, Error = Infallible>,
    {
        Self {
            phase: Phase::Buffer(buffer.iter()),
            delegate,
        }
    }

    /// The tier the next item (if any) is read from.
    ///
    /// Returns `None` once the iterator is exhausted.
    pub fn tier(&self) -> Option<Tier> {
        match self.phase {
            Phase::Buffer(_) => Some(Tier::Buffer),
            Phase::Delegate(_) => Some(Tier::Delegate),
            Phase::Done => None,
        }
    }
}

impl<K, V, D> Iterator for UnifiedIter<'_, K, V, D>
where
    D: KeyValueStore<K, V>,
{
    type Item = Result<(K, Arc<V>), CacheError<D::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.phase {
                Phase::Buffer(entries) => match entries.next() {
                    Some(Ok(entry)) => return Some(Ok(entry)),
                    Some(Err(never)) => match never {},
                    None => self.phase = Phase::Delegate(self.delegate.iter()),
                },
                Phase::Delegate(entries) => match entries.next() {
                    Some(item) => return Some(item.map_err(CacheError::Delegate)),
                    None => self.phase = Phase::Done,
                },
                Phase::Done => return None,
            }
        }
    }
}

impl<K, V, D> FusedIterator for UnifiedIter<'_, K, V, D> where D: KeyValueStore<K, V> {}

impl<K, V, D> fmt::Debug for UnifiedIter<'_, K, V, D>
where
    D: KeyValueStore<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnifiedIter")
            .field("tier", &self.tier())
            .finish()
    }
}
