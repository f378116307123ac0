use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::SpillMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for cache metrics snapshots.
///
/// This exporter writes in the Prometheus text exposition format so it can be
/// scraped by Prometheus or forwarded to an OpenTelemetry collector. Write
/// failures are ignored: metrics are observational.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", &self.metric_name(suffix), value);
    }

    fn write_gauge(&self, suffix: &str, value: usize) {
        self.write_metric("gauge", &self.metric_name(suffix), value as u64);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<SpillMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &SpillMetricsSnapshot) {
        self.write_counter("put_calls_total", snapshot.put_calls);
        self.write_counter("put_updates_total", snapshot.put_updates);
        self.write_counter("admissions_total", snapshot.admissions);
        self.write_counter("overflows_total", snapshot.overflows);
        self.write_counter("readmissions_total", snapshot.readmissions);
        self.write_counter("surplus_releases_total", snapshot.surplus_releases);
        self.write_counter("shadow_repairs_total", snapshot.shadow_repairs);
        self.write_counter("remove_calls_total", snapshot.remove_calls);
        self.write_counter("buffer_removes_total", snapshot.buffer_removes);
        self.write_counter("delegate_removes_total", snapshot.delegate_removes);
        self.write_counter("remove_misses_total", snapshot.remove_misses);
        self.write_counter("get_calls_total", snapshot.get_calls);
        self.write_counter("buffer_hits_total", snapshot.buffer_hits);
        self.write_counter("delegate_hits_total", snapshot.delegate_hits);
        self.write_counter("misses_total", snapshot.misses);
        self.write_gauge("occupancy", snapshot.occupancy);
        self.write_gauge("buffer_len", snapshot.buffer_len);
        self.write_gauge("capacity", snapshot.capacity);
    }
}
