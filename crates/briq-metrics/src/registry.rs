//! Registry of collectors and exporter-level metrics.

use futures::future;
use prometheus_client::{
    encoding::{text, EncodeLabelValue, LabelValueEncoder},
    metrics::{family::Family, gauge::Gauge},
    registry::{Metric, Registry as RegistryInner, Unit},
};

use std::{
    fmt::{self, Write as _},
    sync::{atomic::AtomicU64, Arc},
    time::Duration,
};

use crate::{
    collector::{Collector, Samples},
    descriptors::MetricDescriptor,
    format::{write_for_prometheus, Format},
};

type LabelSet = Vec<(String, LabelValue)>;
type GaugeFamily = Family<LabelSet, Gauge<f64, AtomicU64>>;
type RegisterFn = Box<dyn Fn(&mut RegistryInner) + Send + Sync>;

/// Label value escaped according to the text exposition formats when encoded.
/// `prometheus-client` writes label values verbatim, so a username with a quote or a newline
/// would otherwise break the output.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct LabelValue(String);

impl EncodeLabelValue for LabelValue {
    fn encode(&self, encoder: &mut LabelValueEncoder<'_>) -> fmt::Result {
        for ch in self.0.chars() {
            match ch {
                '\\' => encoder.write_str(r"\\")?,
                '"' => encoder.write_str(r#"\""#)?,
                '\n' => encoder.write_str(r"\n")?,
                _ => encoder.write_char(ch)?,
            }
        }
        Ok(())
    }
}

/// Metrics registry.
///
/// A registry holds [`Collector`]s, which are queried on each [`encode()`](Self::encode()) call,
/// and metrics maintained by the app itself (e.g., exporter latencies), which are encoded
/// with their current values.
pub struct Registry {
    collectors: Vec<Arc<dyn Collector>>,
    metrics: Vec<(&'static str, RegisterFn)>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let metric_names: Vec<_> = self.metrics.iter().map(|(name, _)| *name).collect();
        formatter
            .debug_struct("Registry")
            .field("collectors", &self.collectors)
            .field("metrics", &metric_names)
            .finish()
    }
}

impl Registry {
    /// Creates an empty registry.
    pub fn empty() -> Self {
        Self {
            collectors: vec![],
            metrics: vec![],
        }
    }

    /// Registers a collector.
    pub fn register_collector(&mut self, collector: impl Collector) {
        self.register_shared_collector(Arc::new(collector));
    }

    /// Registers a collector that may be shared with other parts of the app.
    pub fn register_shared_collector(&mut self, collector: Arc<dyn Collector>) {
        self.collectors.push(collector);
    }

    /// Registers a metric maintained outside of collectors. `metric` must be a handle
    /// sharing its state between clones (as all `prometheus-client` metrics do); a clone is
    /// encoded on each [`encode()`](Self::encode()) call.
    pub fn register_metric<M: Metric + Clone>(
        &mut self,
        name: &'static str,
        help: &'static str,
        unit: Option<Unit>,
        metric: M,
    ) {
        let unit = unit.map(|unit| unit.as_str().to_owned());
        let register: RegisterFn = Box::new(move |inner| {
            let metric = metric.clone();
            if let Some(unit) = &unit {
                inner.register_with_unit(name, help, Unit::Other(unit.clone()), metric);
            } else {
                inner.register(name, help, metric);
            }
        });
        self.metrics.push((name, register));
    }

    /// Returns descriptors of all collected families. Collectors are not scraped.
    pub fn descriptors(&self) -> impl Iterator<Item = &'static MetricDescriptor> + '_ {
        self.collectors
            .iter()
            .flat_map(|collector| collector.describe().iter().copied())
    }

    /// Returns names of metrics registered with [`Self::register_metric()`].
    pub fn metric_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.metrics.iter().map(|(name, _)| *name)
    }

    /// Scrapes all collectors (concurrently) and encodes the result together with registered metrics
    /// in the specified `format`. `deadline` is forwarded to each collector.
    ///
    /// Every described family is encoded, even if its collector reported no samples.
    ///
    /// # Errors
    ///
    /// Proxies formatting errors of the provided `writer`.
    pub async fn encode<W: fmt::Write>(
        &self,
        writer: &mut W,
        format: Format,
        deadline: Option<Duration>,
    ) -> fmt::Result {
        let scrapes = self
            .collectors
            .iter()
            .map(|collector| collector.collect(deadline));
        let scrapes = future::join_all(scrapes).await;

        let mut inner = RegistryInner::default();
        for (_, register) in &self.metrics {
            register(&mut inner);
        }
        // Collectors may describe the same family; it must be encoded once.
        let mut families = vec![];
        for (collector, samples) in self.collectors.iter().zip(scrapes) {
            Self::group_samples(&mut families, collector.describe(), samples);
        }
        for (descriptor, family) in families {
            inner.register(descriptor.name, descriptor.help, family);
        }

        let mut buffer = String::with_capacity(1_024);
        text::encode(&mut buffer, &inner)?;
        match format {
            Format::OpenMetrics => writer.write_str(&buffer),
            Format::Prometheus => write_for_prometheus(writer, &buffer, false),
            Format::OpenMetricsForPrometheus => write_for_prometheus(writer, &buffer, true),
        }
    }

    fn group_samples(
        families: &mut Vec<(&'static MetricDescriptor, GaugeFamily)>,
        descriptors: &'static [&'static MetricDescriptor],
        samples: Samples,
    ) {
        for &descriptor in descriptors {
            if !families.iter().any(|(known, _)| known.name == descriptor.name) {
                families.push((descriptor, GaugeFamily::default()));
            }
        }

        for sample in samples {
            let name = sample.descriptor.name;
            let is_described = descriptors.iter().any(|descriptor| descriptor.name == name);
            let family = families
                .iter()
                .find(|(descriptor, _)| descriptor.name == name)
                .filter(|_| is_described);
            let Some((descriptor, family)) = family else {
                tracing::warn!(
                    metric = name,
                    "Collector reported a sample for an undescribed metric; skipping"
                );
                continue;
            };
            let labels = vec![(descriptor.label.to_owned(), LabelValue(sample.label_value))];
            family.get_or_create(&labels).set(sample.value);
        }
    }
}
