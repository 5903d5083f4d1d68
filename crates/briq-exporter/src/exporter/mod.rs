//! `MetricsExporter` and closely related types.

use std::{
    convert::Infallible,
    fmt,
    future::{self, Future},
    net::SocketAddr,
    pin::Pin,
    sync::Arc,
    time::{Duration, Instant},
};

use briq_metrics::{Format, Registry};
use hyper::{
    body::Incoming, header, server::conn::http1, service::service_fn, HeaderMap, Method, Request,
    Response, StatusCode,
};
use hyper_util::rt::TokioIo;
use tokio::{
    io,
    net::{TcpListener, TcpStream},
    sync::watch,
};

use crate::metrics::EXPORTER_METRICS;


/// Path on which metrics are served.
pub const METRICS_PATH: &str = "/metrics";
/// Header set by Prometheus with the scrape timeout in seconds.
const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Upper bound on the part of the Prometheus scrape timeout reserved for sending the response.
const MAX_SCRAPE_TIMEOUT_MARGIN: Duration = Duration::from_millis(500);

#[derive(Clone)]
struct MetricsExporterInner {
    registry: Arc<Registry>,
    format: Format,
}

impl MetricsExporterInner {
    async fn render_body(&self, deadline: Option<Duration>) -> Result<String, fmt::Error> {
        let started_at = Instant::now();
        let mut buffer = String::with_capacity(1_024);
        self.registry
            .encode(&mut buffer, self.format, deadline)
            .await?;

        let latency = started_at.elapsed();
        let scraped_size = buffer.len();
        EXPORTER_METRICS.scrapes.inc();
        EXPORTER_METRICS
            .scrape_latency
            .observe(latency.as_secs_f64());
        #[allow(clippy::cast_precision_loss)] // OK for reporting
        EXPORTER_METRICS.scraped_size.observe(scraped_size as f64);
        tracing::debug!(
            latency_sec = latency.as_secs_f64(),
            scraped_size,
            "Scraped metrics in {latency:?} (scraped size: {scraped_size}B)"
        );
        Ok(buffer)
    }

    async fn handle(&self, request: Request<Incoming>) -> Response<String> {
        if request.uri().path() != METRICS_PATH {
            return Self::error_response(StatusCode::NOT_FOUND);
        }
        if request.method() != Method::GET {
            return Self::error_response(StatusCode::METHOD_NOT_ALLOWED);
        }

        let deadline = scrape_deadline(request.headers());
        let body = self.render_body(deadline).await;
        self.metrics_response(body)
    }

    fn metrics_response(&self, body: Result<String, fmt::Error>) -> Response<String> {
        match body {
            Ok(body) => Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, self.format.content_type())
                .body(body)
                .unwrap(),
            Err(err) => {
                tracing::error!(%err, format = ?self.format, "Failed rendering metrics");
                Self::error_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    fn error_response(status: StatusCode) -> Response<String> {
        let reason = status.canonical_reason().unwrap_or_default();
        Response::builder()
            .status(status)
            .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(format!("{reason}\n"))
            .unwrap()
    }

    /// Serves a single HTTP/1 connection until it's closed by the client or `shutdown` fires.
    async fn serve_connection(self, stream: TcpStream, mut shutdown: watch::Receiver<()>) {
        let peer = stream.peer_addr().ok();
        let service = service_fn(move |request| {
            let inner = self.clone();
            async move { Ok::<_, Infallible>(inner.handle(request).await) }
        });
        let conn = http1::Builder::new().serve_connection(TokioIo::new(stream), service);
        tokio::pin!(conn);

        let res = tokio::select! {
            res = conn.as_mut() => res,
            _ = shutdown.changed() => {
                conn.as_mut().graceful_shutdown();
                conn.await
            }
        };
        if let Err(err) = res {
            tracing::warn!(%err, ?peer, "Error serving metrics connection");
        }
    }
}

/// Computes the deadline for collectors from the scrape timeout advertised by Prometheus, if any.
/// A margin (10% of the timeout, but no more than [`MAX_SCRAPE_TIMEOUT_MARGIN`]) is reserved
/// so that the response reaches Prometheus before it gives up on the scrape.
fn scrape_deadline(headers: &HeaderMap) -> Option<Duration> {
    let value = headers.get(SCRAPE_TIMEOUT_HEADER)?.to_str().ok()?;
    let secs: f64 = value.trim().parse().ok()?;
    let timeout = Duration::try_from_secs_f64(secs)
        .ok()
        .filter(|timeout| !timeout.is_zero())?;
    let margin = (timeout / 10).min(MAX_SCRAPE_TIMEOUT_MARGIN);
    Some(timeout - margin)
}

/// Metrics exporter to Prometheus.
///
/// An exporter serves metrics from a [`Registry`] over HTTP. Collectors in the registry
/// are scraped on each request; the exporter adds a few metrics about itself
/// (number of scrapes, their latency and size).
pub struct MetricsExporter<'a> {
    inner: MetricsExporterInner,
    shutdown_future: Pin<Box<dyn Future<Output = ()> + Send + 'a>>,
}

impl fmt::Debug for MetricsExporter<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MetricsExporter")
            .field("registry", &self.inner.registry)
            .field("format", &self.inner.format)
            .finish_non_exhaustive()
    }
}

impl<'a> MetricsExporter<'a> {
    /// Creates an exporter based on the provided metrics [`Registry`].
    pub fn new(mut registry: Registry) -> Self {
        EXPORTER_METRICS.register(&mut registry);
        Self::log_metrics_stats(&registry);
        Self {
            inner: MetricsExporterInner {
                registry: Arc::new(registry),
                format: Format::OpenMetricsForPrometheus,
            },
            shutdown_future: Box::pin(future::pending()),
        }
    }

    fn log_metrics_stats(registry: &Registry) {
        let families: Vec<_> = registry
            .descriptors()
            .map(|descriptor| descriptor.name)
            .collect();
        let internal_metric_count = registry.metric_names().count();
        tracing::info!(
            ?families,
            "Created metrics exporter with {} collected families and {internal_metric_count} \
             internal metrics",
            families.len()
        );
    }

    /// Sets the export [`Format`]. By default, [`Format::OpenMetricsForPrometheus`] is used
    /// (i.e., OpenMetrics text format with minor changes so that it is fully parsed by Prometheus).
    #[must_use]
    pub fn with_format(mut self, format: Format) -> Self {
        self.inner.format = format;
        self
    }

    /// Configures graceful shutdown for the exporter server.
    #[must_use]
    pub fn with_graceful_shutdown<F>(mut self, shutdown: F) -> Self
    where
        F: Future<Output = ()> + Send + 'a,
    {
        self.shutdown_future = Box::pin(shutdown);
        self
    }

    /// Starts the server on the specified address. This future resolves when the server is shut down.
    ///
    /// The server will expose the following endpoints:
    ///
    /// - `GET` on [`METRICS_PATH`]: scrapes the registry and serves metrics in the text format
    ///   configured using [`Self::with_format()`]. The `X-Prometheus-Scrape-Timeout-Seconds`
    ///   request header, if present, bounds the duration of upstream calls (minus a small margin
    ///   for sending the response). If rendering fails, responds with 500 Internal Server Error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn start(self, bind_address: SocketAddr) -> io::Result<()> {
        self.bind(bind_address).await?.start().await?;
        tracing::info!("Metrics exporter server shut down");
        Ok(())
    }

    /// Creates an HTTP exporter server and binds it to the specified address.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn bind(mut self, bind_address: SocketAddr) -> io::Result<MetricsServer<'a>> {
        let listener = TcpListener::bind(bind_address).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!(
            %local_addr,
            "Metrics exporter bound to {local_addr}, serving on {METRICS_PATH}"
        );

        let server = async move {
            // Connections hold receivers; the sender is closed once all of them are done.
            let (shutdown_sender, shutdown_receiver) = watch::channel(());
            loop {
                let (stream, peer) = tokio::select! {
                    res = listener.accept() => res?,
                    () = &mut self.shutdown_future => break,
                };
                tracing::trace!(%peer, "Accepted metrics connection");
                let connection = self
                    .inner
                    .clone()
                    .serve_connection(stream, shutdown_receiver.clone());
                tokio::spawn(connection);
            }

            tracing::info!("Stop signal received, metrics exporter is shutting down");
            drop(shutdown_receiver);
            shutdown_sender.send_replace(());
            shutdown_sender.closed().await;
            Ok(())
        };

        Ok(MetricsServer {
            server: Box::pin(server),
            local_addr,
        })
    }
}

/// Metrics server bound to a certain local address returned by [`MetricsExporter::bind()`].
///
/// Useful e.g. if you need to find out which port the server was bound to if the 0th port was specified.
#[must_use = "Server should be `start()`ed"]
pub struct MetricsServer<'a> {
    server: Pin<Box<dyn Future<Output = io::Result<()>> + Send + 'a>>,
    local_addr: SocketAddr,
}

impl fmt::Debug for MetricsServer<'_> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("MetricsServer")
            .field("local_addr", &self.local_addr)
            .finish_non_exhaustive()
    }
}

impl MetricsServer<'_> {
    /// Returns the local address this server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Starts this server. Resolves once the server is shut down.
    ///
    /// # Errors
    ///
    /// Returns an error if starting the server operation fails.
    pub async fn start(self) -> io::Result<()> {
        self.server.await
    }
}
