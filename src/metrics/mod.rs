//! Optional counters for the cache facade (feature `metrics`).
//!
//! See [`traits`] for the recorder / snapshot / exporter split.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;

pub use exporter::PrometheusTextExporter;
pub use metrics_impl::SpillMetrics;
pub use snapshot::SpillMetricsSnapshot;
pub use traits::{MetricsExporter, MetricsReset, MetricsSnapshotProvider, SpillMetricsRecorder};
