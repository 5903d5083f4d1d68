//! HTTP exporter serving Briq user metrics to Prometheus, built on the `hyper` web server.
//!
//! The exporter serves a [`Registry`](briq_metrics::Registry) on [`METRICS_PATH`]. Each scrape
//! calls all registered collectors, so the served values always reflect the upstream
//! state at scrape time.
//!
//! # Examples
//!
//! ```no_run
//! use briq_exporter::MetricsExporter;
//! use briq_metrics::{client::BriqClient, BriqCollector, CollectorConfig, Registry};
//!
//! # async fn test() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BriqClient::new("secret-key", briq_metrics::client::DEFAULT_API_URL)?;
//! let mut registry = Registry::empty();
//! registry.register_collector(BriqCollector::new(client, CollectorConfig::default()));
//!
//! let (stop_sender, mut stop_receiver) = tokio::sync::watch::channel(());
//! let exporter = MetricsExporter::new(registry).with_graceful_shutdown(async move {
//!     stop_receiver.changed().await.ok();
//! });
//! tokio::spawn(exporter.start("0.0.0.0:9000".parse()?));
//! // Later, to stop the server:
//! stop_sender.send_replace(());
//! # Ok(())
//! # }
//! ```

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub use crate::exporter::{MetricsExporter, MetricsServer, METRICS_PATH};

mod exporter;
mod metrics;
