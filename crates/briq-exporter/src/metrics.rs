//! Internal metrics for the exporter itself.

use briq_metrics::Registry;
use once_cell::sync::Lazy;
use prometheus_client::{
    metrics::{
        counter::Counter,
        histogram::{exponential_buckets, Histogram},
    },
    registry::Unit,
};

/// Latency buckets in seconds: 5ms to ~40s.
const LATENCY_BUCKETS: (f64, f64, u16) = (0.005, 2.0, 14);
/// Size buckets in bytes: 1 KiB to 1 MiB.
const BYTE_BUCKETS: (f64, f64, u16) = (1_024.0, 4.0, 6);

#[derive(Debug, Clone)]
pub(crate) struct ExporterMetrics {
    /// Number of served scrapes.
    pub scrapes: Counter,
    /// Latency of rendering a scrape, including upstream calls.
    pub scrape_latency: Histogram,
    /// Size of a rendered scrape.
    pub scraped_size: Histogram,
}

impl ExporterMetrics {
    fn new() -> Self {
        let (start, factor, length) = LATENCY_BUCKETS;
        let scrape_latency = Histogram::new(exponential_buckets(start, factor, length));
        let (start, factor, length) = BYTE_BUCKETS;
        let scraped_size = Histogram::new(exponential_buckets(start, factor, length));

        Self {
            scrapes: Counter::default(),
            scrape_latency,
            scraped_size,
        }
    }

    pub(crate) fn register(&self, registry: &mut Registry) {
        registry.register_metric(
            "briq_exporter_scrapes",
            "Number of scrapes served by the exporter",
            None,
            self.scrapes.clone(),
        );
        registry.register_metric(
            "briq_exporter_scrape_latency",
            "Latency of rendering metrics for a scrape, including upstream calls",
            Some(Unit::Seconds),
            self.scrape_latency.clone(),
        );
        registry.register_metric(
            "briq_exporter_scraped_size",
            "Size of metrics rendered for a scrape",
            Some(Unit::Bytes),
            self.scraped_size.clone(),
        );
    }
}

// Shared by all exporters in the process, similar to how metrics are usually defined.
pub(crate) static EXPORTER_METRICS: Lazy<ExporterMetrics> = Lazy::new(ExporterMetrics::new);
