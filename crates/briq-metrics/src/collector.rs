//! Scrape-time collectors.

use async_trait::async_trait;
use snafu::{ResultExt as _, Snafu};
use tracing::{instrument::WithSubscriber as _, Dispatch};

use std::{fmt, iter, time::Duration};

use crate::{
    client::{BoxError, ListUsers, ListUsersRequest, User},
    descriptors::{MetricDescriptor, ACTIVE_BALANCE, BRIQ_METRICS, INACTIVE_BALANCE, POINTS},
};


/// Single gauge observation produced by a [`Collector`].
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    /// Family the sample belongs to.
    pub descriptor: &'static MetricDescriptor,
    /// Value of the [`MetricDescriptor::label`].
    pub label_value: String,
    /// Gauge value.
    pub value: f64,
}

/// Lazily produced samples of a single [`Collector::collect()`] call.
pub type Samples = Box<dyn Iterator<Item = MetricSample> + Send>;

/// Source of metrics computed on each scrape.
///
/// A collector is registered in a [`Registry`](crate::Registry), which describes and collects it
/// each time it's encoded. Since scrapes may overlap, `collect()` can be called concurrently.
#[async_trait]
pub trait Collector: fmt::Debug + Send + Sync + 'static {
    /// Returns descriptors of all families this collector may report. Must not perform I/O.
    fn describe(&self) -> &'static [&'static MetricDescriptor];

    /// Produces samples for a single scrape. `deadline` is the duration the caller is willing
    /// to wait for, if any.
    ///
    /// Failures are handled by the collector itself; a failed scrape yields no samples.
    async fn collect(&self, deadline: Option<Duration>) -> Samples;
}

/// Configuration of a [`BriqCollector`].
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    /// Dispatcher receiving the collector logs. If not set, the default dispatcher
    /// at the time of the scrape is used.
    pub logger: Option<Dispatch>,
    /// Timeout for a single upstream call. `None` or zero means no timeout.
    pub timeout: Option<Duration>,
}

/// Error of an upstream call, be it a failure reported by the client or a timeout.
#[derive(Debug, Snafu)]
pub enum UpstreamUnavailable {
    /// Upstream client returned an error.
    #[snafu(display("{source}"))]
    Failed {
        /// Error returned by the client.
        source: BoxError,
    },
    /// Upstream client did not respond in time.
    #[snafu(display("Briq API did not respond in {timeout:?}"))]
    TimedOut {
        /// Applied timeout.
        timeout: Duration,
    },
}

/// Collector of Briq user balances and points.
///
/// Each [`collect()`](Collector::collect()) call lists users via the upstream client and reports
/// three gauges per user (see [`BRIQ_METRICS`]). Nothing is cached between calls: if the
/// upstream call fails, the error is logged and the scrape reports no samples.
#[derive(Debug)]
pub struct BriqCollector<C> {
    client: C,
    logger: Option<Dispatch>,
    timeout: Option<Duration>,
}

impl<C: ListUsers> BriqCollector<C> {
    /// Creates a collector using the specified upstream `client`.
    pub fn new(client: C, config: CollectorConfig) -> Self {
        Self {
            client,
            logger: config.logger,
            timeout: config.timeout.filter(|timeout| !timeout.is_zero()),
        }
    }

    fn effective_timeout(&self, deadline: Option<Duration>) -> Option<Duration> {
        match (self.timeout, deadline) {
            (Some(timeout), Some(deadline)) => Some(timeout.min(deadline)),
            (timeout, deadline) => timeout.or(deadline),
        }
    }

    async fn list_users(
        &self,
        timeout: Option<Duration>,
    ) -> Result<Vec<User>, UpstreamUnavailable> {
        let call = self.client.list_users(ListUsersRequest::default());
        let result = if let Some(timeout) = timeout {
            tokio::time::timeout(timeout, call)
                .await
                .map_err(|_| TimedOutSnafu { timeout }.build())?
        } else {
            call.await
        };
        let list = result.context(FailedSnafu)?;
        Ok(list.users)
    }

    async fn scrape(&self, deadline: Option<Duration>) -> Vec<User> {
        let timeout = self.effective_timeout(deadline);
        match self.list_users(timeout).await {
            Ok(users) => {
                tracing::debug!(user_count = users.len(), "Listed Briq users");
                users
            }
            Err(err) => {
                tracing::error!(%err, ?timeout, "Error calling Briq API");
                vec![]
            }
        }
    }
}

#[async_trait]
impl<C: ListUsers> Collector for BriqCollector<C> {
    fn describe(&self) -> &'static [&'static MetricDescriptor] {
        &BRIQ_METRICS
    }

    async fn collect(&self, deadline: Option<Duration>) -> Samples {
        let users = if let Some(logger) = &self.logger {
            self.scrape(deadline).with_subscriber(logger.clone()).await
        } else {
            self.scrape(deadline).await
        };
        Box::new(users.into_iter().flat_map(user_samples))
    }
}

#[allow(clippy::cast_precision_loss)] // OK for reporting
fn user_samples(user: User) -> impl Iterator<Item = MetricSample> {
    let values = [
        (&ACTIVE_BALANCE, user.active_balance),
        (&INACTIVE_BALANCE, user.inactive_balance),
        (&POINTS, user.points),
    ];
    let username = user.username;
    values
        .into_iter()
        .zip(iter::repeat(username))
        .map(|((descriptor, value), label_value)| MetricSample {
            descriptor,
            label_value,
            value: value as f64,
        })
}
