//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are split into small traits so the
//! cache's put/remove paths only ever *record*, while monitoring code only
//! ever *reads*.
//!
//! ```text
//!   ┌──────────────────────────┐
//!   │   SpillMetricsRecorder   │   written by SpillCache (relaxed atomics)
//!   │ put / admit / overflow   │
//!   │ remove / lookup          │
//!   └────────────┬─────────────┘
//!                │
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (bench/test)                 │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! All recorder methods take `&self`: the cache is shared across threads and
//! never holds a lock while recording.

/// Counters written by the cache facade.
pub trait SpillMetricsRecorder {
    fn record_put_call(&self);
    fn record_put_update(&self);
    fn record_admission(&self);
    fn record_overflow(&self);
    fn record_readmission(&self);
    fn record_surplus_release(&self);
    fn record_shadow_repair(&self);

    fn record_remove_call(&self);
    fn record_buffer_remove(&self);
    fn record_delegate_remove(&self);
    fn record_remove_miss(&self);

    fn record_get_call(&self);
    fn record_buffer_hit(&self);
    fn record_delegate_hit(&self);
    fn record_miss(&self);

    /// Record the result of a delegate removal after a buffer miss.
    fn record_delegate_remove_outcome(&self, removed: bool) {
        if removed {
            self.record_delegate_remove();
        } else {
            self.record_remove_miss();
        }
    }

    /// Record the result of a delegate lookup after a buffer miss.
    fn record_delegate_lookup(&self, hit: bool) {
        if hit {
            self.record_delegate_hit();
        } else {
            self.record_miss();
        }
    }
}

/// Produce a point-in-time snapshot.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Reset metrics between tests or benchmark iterations.
pub trait MetricsReset {
    fn reset_metrics(&self);
}

/// Publish a snapshot to a monitoring backend.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
