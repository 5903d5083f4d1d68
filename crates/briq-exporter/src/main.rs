//! Prometheus exporter for Briq user balances and points.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use self::cli::Cli;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    Cli::parse().run().await
}
