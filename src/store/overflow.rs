//! Overflow tier: a pass-through wrapper around the delegate store.
//!
//! [`OverflowAdapter`] forwards every call verbatim to the caller's
//! [`KeyValueStore`]. It never buffers, never retries, and never changes an
//! error; the facade wraps delegate errors in
//! [`CacheError::Delegate`](crate::error::CacheError::Delegate) and hands
//! them to the caller.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::store::traits::{KeyValueStore, StoreIter};

/// Thin adapter that owns the delegate store.
#[derive(Debug)]
pub struct OverflowAdapter<K, V, D> {
    delegate: D,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, D> OverflowAdapter<K, V, D>
where
    D: KeyValueStore<K, V>,
{
    /// Wrap a delegate store.
    pub fn new(delegate: D) -> Self {
        Self {
            delegate,
            _marker: PhantomData,
        }
    }

    /// Borrow the delegate store.
    pub fn delegate(&self) -> &D {
        &self.delegate
    }

    /// Unwrap the delegate store.
    pub fn into_inner(self) -> D {
        self.delegate
    }
}

impl<K, V, D> KeyValueStore<K, V> for OverflowAdapter<K, V, D>
where
    D: KeyValueStore<K, V>,
{
    type Error = D::Error;

    #[inline]
    fn get(&self, key: &K) -> Result<Option<Arc<V>>, D::Error> {
        self.delegate.get(key)
    }

    #[inline]
    fn put(&self, key: K, value: Arc<V>) -> Result<(), D::Error> {
        self.delegate.put(key, value)
    }

    #[inline]
    fn remove(&self, key: &K) -> Result<bool, D::Error> {
        self.delegate.remove(key)
    }

    #[inline]
    fn contains_key(&self, key: &K) -> Result<bool, D::Error> {
        self.delegate.contains_key(key)
    }

    #[inline]
    fn iter(&self) -> StoreIter<'_, K, V, D::Error> {
        self.delegate.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::store::hashmap::ShardedHashMapStore;
    use crate::store::traits::ConcurrentStore;

    #[test]
    fn forwards_to_delegate() {
        let adapter = OverflowAdapter::new(ShardedHashMapStore::<u32, u32>::new(2));
        adapter.put(1, Arc::new(10)).unwrap();
        assert!(adapter.contains_key(&1).unwrap());
        assert_eq!(adapter.delegate().len(), 1);
        assert_eq!(KeyValueStore::get(&adapter, &1).unwrap().as_deref(), Some(&10));
        assert!(KeyValueStore::remove(&adapter, &1).unwrap());
        assert!(adapter.into_inner().is_empty());
    }

    struct Flaky {
        failing: AtomicBool,
        inner: ShardedHashMapStore<u32, u32>,
    }

    impl KeyValueStore<u32, u32> for Flaky {
        type Error = io::Error;

        fn get(&self, key: &u32) -> Result<Option<Arc<u32>>, io::Error> {
            self.check()?;
            Ok(self.inner.get(key))
        }

        fn put(&self, key: u32, value: Arc<u32>) -> Result<(), io::Error> {
            self.check()?;
            self.inner.insert(key, value);
            Ok(())
        }

        fn remove(&self, key: &u32) -> Result<bool, io::Error> {
            self.check()?;
            Ok(self.inner.remove(key).is_some())
        }

        fn contains_key(&self, key: &u32) -> Result<bool, io::Error> {
            self.check()?;
            Ok(self.inner.contains(key))
        }

        fn iter(&self) -> StoreIter<'_, u32, u32, io::Error> {
            Box::new(self.inner.entries().map(Ok))
        }
    }

    impl Flaky {
        fn check(&self) -> Result<(), io::Error> {
            if self.failing.load(Ordering::Relaxed) {
                Err(io::Error::new(io::ErrorKind::TimedOut, "delegate timed out"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn errors_pass_through_unchanged() {
        let adapter = OverflowAdapter::new(Flaky {
            failing: AtomicBool::new(false),
            inner: ShardedHashMapStore::new(1),
        });
        adapter.put(1, Arc::new(1)).unwrap();

        adapter.delegate().failing.store(true, Ordering::Relaxed);
        let err = adapter.put(2, Arc::new(2)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        assert!(adapter.contains_key(&1).is_err());

        adapter.delegate().failing.store(false, Ordering::Relaxed);
        assert!(adapter.contains_key(&1).unwrap());
        assert!(!adapter.contains_key(&2).unwrap());
    }
}
