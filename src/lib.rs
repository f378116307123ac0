//! spillcache: a bounded write-buffering cache that spills overflow into a
//! delegate store.
//!
//! Writes for new keys land in a fixed-capacity, thread-safe in-memory
//! buffer while it has room. Once the buffer is full, new keys go to a
//! caller-supplied [`KeyValueStore`](store::traits::KeyValueStore) instead.
//! Buffered keys stay buffered until they are removed, so hot keys keep
//! hitting memory. Reads and scans see both tiers as one map.
//!
//! ```
//! use spillcache::prelude::*;
//!
//! let delegate: ShardedHashMapStore<String, u64> = ShardedHashMapStore::new(4);
//! let cache = SpillCacheBuilder::new(2).build(delegate);
//!
//! cache.put("a".to_string(), 1).unwrap();
//! cache.put("b".to_string(), 2).unwrap();
//! cache.put("c".to_string(), 3).unwrap();
//!
//! assert_eq!(cache.locate(&"c".to_string()).unwrap(), Some(Tier::Delegate));
//! assert_eq!(cache.iter().count(), 3);
//! ```
//!
//! See the [`cache`] module for residency rules and the [`drain`] module for
//! exactly-once consumption by several workers.

pub mod admission;
pub mod builder;
pub mod cache;
pub mod drain;
pub mod error;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod store;
pub mod view;

pub use crate::builder::{SpillCacheBuilder, SpillConfig};
pub use crate::cache::SpillCache;
pub use crate::error::{CacheError, ConfigError, InvariantError};
