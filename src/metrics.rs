//! Request, retry and search metrics
//!
//! Recording goes through the `metrics` facade and is a no-op until a
//! recorder is installed. [`init_metrics`] installs the Prometheus exporter
//! with a scrape endpoint; it is idempotent.

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use once_cell::sync::Lazy;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{debug, info};

static METRICS_INITIALIZED: Lazy<Mutex<bool>> = Lazy::new(|| Mutex::new(false));

/// Install the Prometheus exporter listening on `addr`
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    let mut initialized = METRICS_INITIALIZED
        .lock()
        .map_err(|e| format!("metrics lock poisoned: {e}"))?;
    if *initialized {
        debug!("Metrics already initialized, skipping");
        return Ok(());
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {e}"))?;

    describe_counter!(
        "http_requests_total",
        Unit::Count,
        "Total number of HTTP requests made to the console API"
    );
    describe_histogram!(
        "http_request_duration_seconds",
        Unit::Seconds,
        "HTTP request duration in seconds"
    );
    describe_counter!("http_retries_total", Unit::Count, "Total number of retry attempts");
    describe_histogram!(
        "retry_backoff_duration_seconds",
        Unit::Seconds,
        "Duration of retry backoff in seconds"
    );
    describe_counter!(
        "search_pages_total",
        Unit::Count,
        "Total number of catalog search pages fetched"
    );
    describe_counter!(
        "orders_submitted_total",
        Unit::Count,
        "Orders created, by outcome"
    );

    *initialized = true;
    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

/// Timer for a single HTTP request
pub struct HttpRequestMetrics {
    method: &'static str,
    start_time: Instant,
}

impl HttpRequestMetrics {
    /// Start timing a request
    pub fn start(method: &'static str) -> Self {
        Self {
            method,
            start_time: Instant::now(),
        }
    }

    /// Record a response with `status`
    pub fn record_complete(&self, status: u16) {
        self.record(status.to_string());
    }

    /// Record a transport failure
    pub fn record_network_error(&self) {
        self.record("network_error".to_string());
    }

    fn record(&self, status: String) {
        let duration = self.start_time.elapsed();
        counter!("http_requests_total", "method" => self.method, "status" => status).increment(1);
        histogram!("http_request_duration_seconds", "method" => self.method)
            .record(duration.as_secs_f64());
    }
}

/// Record a retry and its backoff delay
pub fn record_retry_backoff(delay: Duration, attempt: usize) {
    counter!("http_retries_total", "attempt" => attempt.to_string()).increment(1);
    histogram!("retry_backoff_duration_seconds").record(delay.as_secs_f64());
}

/// Record a fetched search page
pub fn record_search_page(features: usize) {
    counter!("search_pages_total").increment(1);
    histogram!("search_page_features").record(features as f64);
}

/// Record an order submission outcome ("created", "reused", "rejected", "denied")
pub fn record_order(outcome: &'static str) {
    counter!("orders_submitted_total", "outcome" => outcome).increment(1);
}
