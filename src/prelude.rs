pub use crate::admission::AdmissionController;
pub use crate::builder::{SpillCacheBuilder, SpillConfig};
pub use crate::cache::{CacheIter, KeyFilter, SpillCache};
pub use crate::drain::{ClaimSet, DrainStats};
pub use crate::error::{CacheError, ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::{
    MetricsExporter, MetricsReset, MetricsSnapshotProvider, PrometheusTextExporter,
    SpillMetricsSnapshot,
};
pub use crate::store::{
    BufferStore, ConcurrentHashMapStore, ConcurrentStore, KeyValueStore, OverflowAdapter,
    ShardedHashMapStore, StoreIter,
};
pub use crate::view::{Tier, UnifiedIter};
