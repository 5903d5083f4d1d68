use std::{net::SocketAddr, time::Duration};

use anyhow::Context as _;
use briq_exporter::MetricsExporter;
use briq_metrics::{
    client::{BriqClient, DEFAULT_API_URL},
    BriqCollector, CollectorConfig, Format, Registry,
};
use clap::{builder::NonEmptyStringValueParser, Parser, ValueEnum};
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// OpenMetrics text format.
    OpenMetrics,
    /// Legacy Prometheus text format.
    Prometheus,
    /// OpenMetrics text format with counters named the way Prometheus parses them.
    OpenMetricsForPrometheus,
}

impl From<ExportFormat> for Format {
    fn from(format: ExportFormat) -> Self {
        match format {
            ExportFormat::OpenMetrics => Self::OpenMetrics,
            ExportFormat::Prometheus => Self::Prometheus,
            ExportFormat::OpenMetricsForPrometheus => Self::OpenMetricsForPrometheus,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(
        long = "listen",
        short = 'l',
        env = "BRIQ_EXPORTER_LISTEN",
        default_value = "0.0.0.0:9000",
        help = "Address to serve metrics on"
    )]
    listen: SocketAddr,

    #[clap(
        long = "secret-key",
        env = "BRIQ_SECRET_KEY",
        hide_env_values = true,
        value_parser = NonEmptyStringValueParser::new(),
        help = "Secret key used to authenticate to the Briq API"
    )]
    secret_key: String,

    #[clap(
        long = "api-url",
        env = "BRIQ_API_URL",
        default_value = DEFAULT_API_URL,
        help = "Base URL of the Briq API"
    )]
    api_url: String,

    #[clap(
        long = "timeout",
        env = "BRIQ_EXPORTER_TIMEOUT",
        value_parser = parse_timeout,
        help = "Timeout for Briq API calls in seconds; 0 disables the timeout"
    )]
    timeout: Option<Duration>,

    #[clap(
        long = "format",
        env = "BRIQ_EXPORTER_FORMAT",
        value_enum,
        default_value_t = ExportFormat::OpenMetricsForPrometheus,
        help = "Format to serve metrics in"
    )]
    format: ExportFormat,
}

fn parse_timeout(raw: &str) -> Result<Duration, String> {
    let secs: f64 = raw
        .trim()
        .parse()
        .map_err(|err| format!("invalid number of seconds: {err}"))?;
    Duration::try_from_secs_f64(secs).map_err(|err| format!("invalid timeout: {err}"))
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let client = BriqClient::new(self.secret_key, &self.api_url)
            .context("failed creating Briq API client")?;
        let config = CollectorConfig {
            timeout: self.timeout,
            ..CollectorConfig::default()
        };
        let mut registry = Registry::empty();
        registry.register_collector(BriqCollector::new(client, config));

        let (stop_sender, mut stop_receiver) = watch::channel(());
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(%err, "Failed listening to Ctrl+C signal");
                return;
            }
            tracing::info!("Received Ctrl+C, shutting down");
            stop_sender.send_replace(());
        });

        MetricsExporter::new(registry)
            .with_format(self.format.into())
            .with_graceful_shutdown(async move {
                stop_receiver.changed().await.ok();
            })
            .start(self.listen)
            .await
            .with_context(|| format!("failed serving metrics on {}", self.listen))
    }
}
