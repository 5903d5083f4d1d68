//! Exposition formats.

use std::fmt;

/// Metrics export format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Format {
    /// [OpenMetrics text format][om] as produced by [`prometheus-client`].
    ///
    /// [om]: https://github.com/OpenObservability/OpenMetrics/blob/main/specification/OpenMetrics.md
    /// [`prometheus-client`]: https://docs.rs/prometheus-client/
    OpenMetrics,
    /// [Prometheus text format][prom]. Obtained from OpenMetrics by removing `_total` suffixes
    /// from counter samples and dropping the `# EOF` terminator.
    ///
    /// [prom]: https://prometheus.io/docs/instrumenting/exposition_formats/
    Prometheus,
    /// OpenMetrics text format as understood by Prometheus: counter samples lose
    /// their `_total` suffix, but `# EOF` is kept.
    OpenMetricsForPrometheus,
}

impl Format {
    /// Content type for the Prometheus text format.
    pub const PROMETHEUS_CONTENT_TYPE: &'static str = "text/plain; version=0.0.4; charset=utf-8";
    /// Content type for the OpenMetrics text format.
    pub const OPEN_METRICS_CONTENT_TYPE: &'static str =
        "application/openmetrics-text; version=1.0.0; charset=utf-8";

    /// Returns the HTTP content type for this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Prometheus => Self::PROMETHEUS_CONTENT_TYPE,
            Self::OpenMetrics | Self::OpenMetricsForPrometheus => Self::OPEN_METRICS_CONTENT_TYPE,
        }
    }
}

/// Rewrites OpenMetrics text produced by `prometheus-client` for consumption by Prometheus.
pub(crate) fn write_for_prometheus<W: fmt::Write>(
    writer: &mut W,
    open_metrics: &str,
    keep_eof: bool,
) -> fmt::Result {
    // Name of the last declared counter family, if the last `# TYPE` line declared a counter.
    let mut counter_name = None::<&str>;

    for line in open_metrics.lines() {
        if line == "# EOF" {
            if keep_eof {
                writeln!(writer, "{line}")?;
            }
            continue;
        }

        if let Some(type_def) = line.strip_prefix("# TYPE ") {
            let (name, ty) = type_def.split_once(' ').ok_or(fmt::Error)?;
            counter_name = (ty.trim() == "counter").then_some(name);
        } else if !line.starts_with('#') {
            let name_end = line
                .find(|ch: char| ch == '{' || ch.is_ascii_whitespace())
                .ok_or(fmt::Error)?;
            let (name, rest) = line.split_at(name_end);
            if counter_name.is_some() && name.strip_suffix("_total") == counter_name {
                writeln!(writer, "{}{rest}", &name[..name.len() - "_total".len()])?;
                continue;
            }
        }
        writeln!(writer, "{line}")?;
    }
    Ok(())
}
