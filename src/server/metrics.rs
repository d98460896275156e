use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use lazy_static::lazy_static;
use prometheus::{
    CounterVec, Encoder, Gauge, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder,
};
use std::time::Duration;
use tracing::info;

/// Metric name prefix for all SharedMelody metrics
const PREFIX: &str = "sharedmelody";

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    pub static ref HTTP_REQUESTS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(format!("{PREFIX}_http_requests_total"), "Total number of HTTP requests"),
        &["method", "path", "status"]
    ).expect("Failed to create http_requests_total metric");

    pub static ref HTTP_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            format!("{PREFIX}_http_request_duration_seconds"),
            "HTTP request duration in seconds"
        )
        .buckets(vec![0.001, 0.01, 0.05, 0.1, 0.5, 1.0, 2.0, 5.0, 10.0]),
        &["method", "path"]
    ).expect("Failed to create http_request_duration_seconds metric");

    pub static ref FAVORITES_MUTATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new(
            format!("{PREFIX}_favorites_mutations_total"),
            "Favorite edges added and removed"
        ),
        &["action"]
    ).expect("Failed to create favorites_mutations_total metric");

    pub static ref SONGS_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_songs_total"),
        "Number of songs in the database"
    ).expect("Failed to create songs_total metric");

    pub static ref FAVORITES_TOTAL: Gauge = Gauge::new(
        format!("{PREFIX}_favorites_total"),
        "Number of favorite edges in the database"
    ).expect("Failed to create favorites_total metric");
}

pub fn init_metrics() {
    REGISTRY
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .expect("Failed to register http_requests_total");
    REGISTRY
        .register(Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()))
        .expect("Failed to register http_request_duration_seconds");
    REGISTRY
        .register(Box::new(FAVORITES_MUTATIONS_TOTAL.clone()))
        .expect("Failed to register favorites_mutations_total");
    REGISTRY
        .register(Box::new(SONGS_TOTAL.clone()))
        .expect("Failed to register songs_total");
    REGISTRY
        .register(Box::new(FAVORITES_TOTAL.clone()))
        .expect("Failed to register favorites_total");
}

/// Seeds the absolute gauges from the store counts at startup.
pub fn init_store_metrics(songs_count: u64, favorites_count: u64) {
    SONGS_TOTAL.set(songs_count as f64);
    FAVORITES_TOTAL.set(favorites_count as f64);
}

pub fn record_http_request(method: &str, path: &str, status: StatusCode, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration.as_secs_f64());
}

pub fn record_favorite_added() {
    FAVORITES_MUTATIONS_TOTAL.with_label_values(&["added"]).inc();
    FAVORITES_TOTAL.inc();
}

pub fn record_favorite_removed() {
    FAVORITES_MUTATIONS_TOTAL
        .with_label_values(&["removed"])
        .inc();
    FAVORITES_TOTAL.dec();
}

async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    match encoder.encode(&REGISTRY.gather(), &mut buffer) {
        Ok(()) => (StatusCode::OK, buffer).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", err),
        )
            .into_response(),
    }
}

/// Runs the Prometheus scrape endpoint on its own port.
pub async fn run_metrics_server(port: u16) -> Result<()> {
    let app = Router::new().route("/metrics", get(metrics_handler));
    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Metrics server listening on port {}", port);
    Ok(axum::serve(listener, app).await?)
}
