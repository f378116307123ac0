/// Point-in-time view of a [`SpillCache`](crate::cache::SpillCache)'s
/// counters and gauges.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpillMetricsSnapshot {
    pub put_calls: u64,
    pub put_updates: u64, // key already buffered, updated in place
    pub admissions: u64,
    pub overflows: u64, // buffer full, entry written to the delegate
    pub readmissions: u64, // admission removed a stale delegate copy
    pub surplus_releases: u64, // racing puts of one key; extra slot returned
    pub shadow_repairs: u64,

    pub remove_calls: u64,
    pub buffer_removes: u64,
    pub delegate_removes: u64,
    pub remove_misses: u64,

    pub get_calls: u64,
    pub buffer_hits: u64,
    pub delegate_hits: u64,
    pub misses: u64,

    // gauges captured at snapshot time
    pub occupancy: usize,
    pub buffer_len: usize,
    pub capacity: usize,
}

impl SpillMetricsSnapshot {
    /// Fraction of lookups answered by the buffer tier.
    pub fn buffer_hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.buffer_hits as f64 / self.get_calls as f64
        }
    }

    /// Fraction of new-key puts that spilled into the delegate.
    pub fn overflow_ratio(&self) -> f64 {
        let placed = self.admissions + self.overflows;
        if placed == 0 {
            0.0
        } else {
            self.overflows as f64 / placed as f64
        }
    }
}
