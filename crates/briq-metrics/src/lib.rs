//! Scrape-time collection of [Briq] user balances and points as Prometheus gauges.
//!
//! # Overview
//!
//! - [`ListUsers`](client::ListUsers) is the single upstream operation the crate depends on.
//!   [`BriqClient`](client::BriqClient) implements it on top of the Briq HTTP API.
//! - [`BriqCollector`] lists users on each scrape and reports three gauges per user
//!   (`briq_active_balance`, `briq_inactive_balance` and `briq_points`, labeled by `user`).
//!   If the upstream call fails or times out, the error is logged and the scrape reports
//!   no samples; nothing is cached between scrapes.
//! - [`Collector`]s are registered in a [`Registry`], which encodes collected samples
//!   in one of the supported text [`Format`]s.
//!
//! # Examples
//!
//! ```no_run
//! use briq_metrics::{client::BriqClient, BriqCollector, CollectorConfig, Format, Registry};
//! use std::time::Duration;
//!
//! # async fn test() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BriqClient::new("secret-key", briq_metrics::client::DEFAULT_API_URL)?;
//! let config = CollectorConfig {
//!     timeout: Some(Duration::from_secs(10)),
//!     ..CollectorConfig::default()
//! };
//! let mut registry = Registry::empty();
//! registry.register_collector(BriqCollector::new(client, config));
//!
//! let mut buffer = String::new();
//! registry.encode(&mut buffer, Format::OpenMetrics, None).await?;
//! println!("{buffer}");
//! # Ok(())
//! # }
//! ```
//!
//! [Briq]: https://www.briq.it/

// Linter settings.
#![warn(missing_debug_implementations, missing_docs, bare_trait_objects)]
#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::must_use_candidate, clippy::module_name_repetitions)]

pub mod client;
mod collector;
pub mod descriptors;
mod format;
mod registry;

pub use crate::{
    collector::{
        BriqCollector, Collector, CollectorConfig, MetricSample, Samples, UpstreamUnavailable,
    },
    descriptors::MetricDescriptor,
    format::Format,
    registry::Registry,
};

// Re-exported so that implementors of `ListUsers` / `Collector` don't need to depend on it.
pub use async_trait::async_trait;
