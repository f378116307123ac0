//! Storage backends for both cache tiers.
//!
//! The buffer tier is a [`BufferStore`](buffer::BufferStore) over any
//! [`ConcurrentStore`](traits::ConcurrentStore) container; the delegate tier
//! is any [`KeyValueStore`](traits::KeyValueStore), reached through an
//! [`OverflowAdapter`](overflow::OverflowAdapter).

pub mod buffer;
pub mod hashmap;
pub mod overflow;
pub mod traits;

pub use buffer::BufferStore;
pub use hashmap::{ConcurrentHashMapStore, ShardedHashMapStore};
pub use overflow::OverflowAdapter;
pub use traits::{ConcurrentStore, KeyValueStore, SegmentIter, StoreIter, StoreMetrics};
