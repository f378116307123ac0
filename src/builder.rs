//! Builder and plain configuration for [`SpillCache`].
//!
//! The builder produces a cache whose buffer is a [`ShardedHashMapStore`]
//! pre-sized to the buffer capacity. Callers that need a different buffer
//! container use [`SpillCache::new`] directly.
//!
//! ## Example
//!
//! ```rust
//! use spillcache::builder::SpillCacheBuilder;
//! use spillcache::store::hashmap::ShardedHashMapStore;
//!
//! let delegate: ShardedHashMapStore<u64, String> = ShardedHashMapStore::new(8);
//! let cache = SpillCacheBuilder::new(100)
//!     .shards(4)
//!     .key_filter(|key: &u64| *key != 0)
//!     .build(delegate);
//!
//! cache.put(1, "hello".to_string()).unwrap();
//! assert!(cache.put(0, "nope".to_string()).is_err());
//! assert_eq!(cache.capacity(), 100);
//! ```

use std::fmt;
use std::hash::Hash;
use std::sync::Arc;
use std::thread;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::cache::{KeyFilter, SpillCache};
use crate::error::ConfigError;
use crate::store::hashmap::ShardedHashMapStore;
use crate::store::traits::KeyValueStore;

const DEFAULT_CAPACITY: usize = 1024;

/// Sizing parameters for a [`SpillCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpillConfig {
    /// Maximum number of buffered entries.
    pub capacity: usize,
    /// Number of lock shards in the buffer container.
    pub shards: usize,
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            shards: default_shards(),
        }
    }
}

impl SpillConfig {
    /// Checks that both parameters are non-zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new(
                "buffer capacity must be greater than zero",
            ));
        }
        if self.shards == 0 {
            return Err(ConfigError::new("shard count must be greater than zero"));
        }
        Ok(())
    }
}

fn default_shards() -> usize {
    thread::available_parallelism().map_or(1, |n| n.get())
}

/// Builder for [`SpillCache`] instances.
pub struct SpillCacheBuilder<K> {
    config: SpillConfig,
    key_filter: Option<KeyFilter<K>>,
}

impl<K> SpillCacheBuilder<K>
where
    K: Eq + Hash + Clone + Send + Sync,
{
    /// Create a builder buffering up to `capacity` entries.
    ///
    /// The shard count defaults to the available parallelism.
    pub fn new(capacity: usize) -> Self {
        Self::from_config(SpillConfig {
            capacity,
            ..SpillConfig::default()
        })
    }

    /// Create a builder from an existing configuration.
    pub fn from_config(config: SpillConfig) -> Self {
        Self {
            config,
            key_filter: None,
        }
    }

    /// Set the number of lock shards in the buffer container.
    pub fn shards(mut self, shards: usize) -> Self {
        self.config.shards = shards;
        self
    }

    /// Reject keys for which `filter` returns `false`.
    pub fn key_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(&K) -> bool + Send + Sync + 'static,
    {
        self.key_filter = Some(Arc::new(filter));
        self
    }

    /// The configuration the builder will apply.
    pub fn config(&self) -> SpillConfig {
        self.config
    }

    /// Build a cache spilling into `delegate`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the capacity or shard count is zero.
    pub fn try_build<V, D>(self, delegate: D) -> Result<SpillCache<K, V, D>, ConfigError>
    where
        V: Send + Sync,
        D: KeyValueStore<K, V>,
    {
        self.config.validate()?;
        let container = ShardedHashMapStore::with_capacity(self.config.capacity, self.config.shards);
        let mut cache = SpillCache::try_new(delegate, self.config.capacity, container)?;
        cache.set_key_filter(self.key_filter);
        Ok(cache)
    }

    /// Build a cache spilling into `delegate`.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid. See
    /// [`try_build`](Self::try_build).
    pub fn build<V, D>(self, delegate: D) -> SpillCache<K, V, D>
    where
        V: Send + Sync,
        D: KeyValueStore<K, V>,
    {
        match self.try_build(delegate) {
            Ok(cache) => cache,
            Err(e) => panic!("{}", e),
        }
    }
}

impl<K> fmt::Debug for SpillCacheBuilder<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpillCacheBuilder")
            .field("config", &self.config)
            .field("key_filter", &self.key_filter.is_some())
            .finish()
    }
}
