use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::SpillMetricsSnapshot;
use crate::metrics::traits::{MetricsReset, SpillMetricsRecorder};

/// Relaxed atomic counters backing [`SpillMetricsSnapshot`].
#[derive(Debug, Default)]
pub struct SpillMetrics {
    pub put_calls: AtomicU64,
    pub put_updates: AtomicU64,
    pub admissions: AtomicU64,
    pub overflows: AtomicU64,
    pub readmissions: AtomicU64,
    pub surplus_releases: AtomicU64,
    pub shadow_repairs: AtomicU64,
    pub remove_calls: AtomicU64,
    pub buffer_removes: AtomicU64,
    pub delegate_removes: AtomicU64,
    pub remove_misses: AtomicU64,
    pub get_calls: AtomicU64,
    pub buffer_hits: AtomicU64,
    pub delegate_hits: AtomicU64,
    pub misses: AtomicU64,
}

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

impl SpillMetrics {
    /// Copy the counters and attach the given gauges.
    pub fn snapshot(
        &self,
        occupancy: usize,
        buffer_len: usize,
        capacity: usize,
    ) -> SpillMetricsSnapshot {
        SpillMetricsSnapshot {
            put_calls: read(&self.put_calls),
            put_updates: read(&self.put_updates),
            admissions: read(&self.admissions),
            overflows: read(&self.overflows),
            readmissions: read(&self.readmissions),
            surplus_releases: read(&self.surplus_releases),
            shadow_repairs: read(&self.shadow_repairs),
            remove_calls: read(&self.remove_calls),
            buffer_removes: read(&self.buffer_removes),
            delegate_removes: read(&self.delegate_removes),
            remove_misses: read(&self.remove_misses),
            get_calls: read(&self.get_calls),
            buffer_hits: read(&self.buffer_hits),
            delegate_hits: read(&self.delegate_hits),
            misses: read(&self.misses),
            occupancy,
            buffer_len,
            capacity,
        }
    }
}

impl SpillMetricsRecorder for SpillMetrics {
    fn record_put_call(&self) {
        bump(&self.put_calls);
    }

    fn record_put_update(&self) {
        bump(&self.put_updates);
    }

    fn record_admission(&self) {
        bump(&self.admissions);
    }

    fn record_overflow(&self) {
        bump(&self.overflows);
    }

    fn record_readmission(&self) {
        bump(&self.readmissions);
    }

    fn record_surplus_release(&self) {
        bump(&self.surplus_releases);
    }

    fn record_shadow_repair(&self) {
        bump(&self.shadow_repairs);
    }

    fn record_remove_call(&self) {
        bump(&self.remove_calls);
    }

    fn record_buffer_remove(&self) {
        bump(&self.buffer_removes);
    }

    fn record_delegate_remove(&self) {
        bump(&self.delegate_removes);
    }

    fn record_remove_miss(&self) {
        bump(&self.remove_misses);
    }

    fn record_get_call(&self) {
        bump(&self.get_calls);
    }

    fn record_buffer_hit(&self) {
        bump(&self.buffer_hits);
    }

    fn record_delegate_hit(&self) {
        bump(&self.delegate_hits);
    }

    fn record_miss(&self) {
        bump(&self.misses);
    }
}

impl MetricsReset for SpillMetrics {
    fn reset_metrics(&self) {
        for counter in [
            &self.put_calls,
            &self.put_updates,
            &self.admissions,
            &self.overflows,
            &self.readmissions,
            &self.surplus_releases,
            &self.shadow_repairs,
            &self.remove_calls,
            &self.buffer_removes,
            &self.delegate_removes,
            &self.remove_misses,
            &self.get_calls,
            &self.buffer_hits,
            &self.delegate_hits,
            &self.misses,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let metrics = SpillMetrics::default();
        metrics.record_put_call();
        metrics.record_put_call();
        metrics.record_admission();
        metrics.record_overflow();
        metrics.record_get_call();
        metrics.record_delegate_hit();

        let snapshot = metrics.snapshot(1, 1, 4);
        assert_eq!(snapshot.put_calls, 2);
        assert_eq!(snapshot.admissions, 1);
        assert_eq!(snapshot.overflows, 1);
        assert_eq!(snapshot.delegate_hits, 1);
        assert_eq!(snapshot.occupancy, 1);
        assert_eq!(snapshot.capacity, 4);
    }

    #[test]
    fn reset_zeroes_all_counters() {
        let metrics = SpillMetrics::default();
        metrics.record_remove_call();
        metrics.record_buffer_remove();
        metrics.record_miss();
        metrics.reset_metrics();
        assert_eq!(metrics.snapshot(0, 0, 0), SpillMetricsSnapshot::default());
    }
}
