// observability/metrics.rs - Prometheus Metrics

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use axum::{http::StatusCode, routing::get, Json, Router};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use serde::Serialize;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::message::Role;

/// Configuration for metrics
#[derive(Clone, Debug)]
pub struct MetricsConfig {
    /// Address to expose metrics endpoint
    pub listen_addr: SocketAddr,

    /// Histogram buckets for provider latency (in seconds)
    pub provider_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 9090)),
            provider_buckets: vec![0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid bucket configuration: {0}")]
    Buckets(String),

    #[error("Failed to install recorder: {0}")]
    Install(String),
}

/// Handle to the Prometheus metrics exporter
#[derive(Clone)]
pub struct MetricsHandle {
    handle: PrometheusHandle,
}

impl MetricsHandle {
    /// Render metrics in Prometheus text format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Session-level metrics
pub struct SessionMetrics;

impl SessionMetrics {
    pub const STARTED_TOTAL: &'static str = "haggle_sessions_started_total";
    pub const FINISHED_TOTAL: &'static str = "haggle_sessions_finished_total";
    pub const ACTIVE: &'static str = "haggle_sessions_active";
    pub const ITERATIONS: &'static str = "haggle_session_iterations";
}

/// Offer-related metrics
pub struct OfferMetrics;

impl OfferMetrics {
    pub const PUBLISHED_TOTAL: &'static str = "haggle_offers_published_total";
    pub const CLAMPED_TOTAL: &'static str = "haggle_offers_clamped_total";
}

/// Reasoning provider metrics
pub struct ProviderMetrics;

impl ProviderMetrics {
    pub const LATENCY_SECONDS: &'static str = "haggle_provider_latency_seconds";
}

/// Sessions currently running in this process, served by `/ready`
static ACTIVE_SESSIONS: AtomicU64 = AtomicU64::new(0);

pub fn active_sessions() -> u64 {
    ACTIVE_SESSIONS.load(Ordering::Relaxed)
}

#[derive(Debug, Serialize, PartialEq)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_secs: u64,
}

#[derive(Debug, Serialize, PartialEq)]
struct ReadyResponse {
    status: &'static str,
    active_sessions: u64,
}

/// Ready while at least one negotiation session is running
fn readiness(active: u64) -> (StatusCode, ReadyResponse) {
    if active > 0 {
        (
            StatusCode::OK,
            ReadyResponse {
                status: "negotiating",
                active_sessions: active,
            },
        )
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            ReadyResponse {
                status: "idle",
                active_sessions: 0,
            },
        )
    }
}

fn exporter_router(handle: PrometheusHandle, started: Instant) -> Router {
    Router::new()
        .route("/metrics", get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }))
        .route("/health", get(move || async move {
            Json(HealthResponse {
                status: "healthy",
                version: env!("CARGO_PKG_VERSION"),
                uptime_secs: started.elapsed().as_secs(),
            })
        }))
        .route("/ready", get(|| async {
            let (status, body) = readiness(active_sessions());
            (status, Json(body))
        }))
        .route("/live", get(|| async { StatusCode::OK }))
}

/// Initialize the metrics system
///
/// Installs the Prometheus recorder and serves `/metrics`, `/health`,
/// `/ready` and `/live` on the configured address.
pub fn init_metrics(config: MetricsConfig) -> Result<MetricsHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(ProviderMetrics::LATENCY_SECONDS.into()),
            &config.provider_buckets,
        )
        .map_err(|e| MetricsError::Buckets(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    let app = exporter_router(handle.clone(), Instant::now());
    let listen_addr = config.listen_addr;
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(listen_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::error!(error = %e, addr = %listen_addr, "Failed to bind metrics server");
                return;
            }
        };
        tracing::info!(addr = %listen_addr, "Metrics HTTP server started");
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "Metrics server error");
        }
    });

    describe_counter!(SessionMetrics::STARTED_TOTAL, "Total number of negotiation sessions started");
    describe_counter!(
        SessionMetrics::FINISHED_TOTAL,
        "Total number of negotiation sessions finished, by outcome"
    );
    describe_gauge!(SessionMetrics::ACTIVE, "Negotiation sessions currently running");
    describe_histogram!(SessionMetrics::ITERATIONS, "Iterations exchanged per finished session");

    describe_counter!(OfferMetrics::PUBLISHED_TOTAL, "Total number of messages published, by role");
    describe_counter!(
        OfferMetrics::CLAMPED_TOTAL,
        "Provider decisions that crossed a role limit and were clamped"
    );

    describe_histogram!(
        ProviderMetrics::LATENCY_SECONDS,
        "Reasoning provider call latency in seconds"
    );

    tracing::info!(addr = %config.listen_addr, "Metrics initialized");

    Ok(MetricsHandle { handle })
}

// Recording functions

/// Record a session starting
pub fn record_session_started() {
    ACTIVE_SESSIONS.fetch_add(1, Ordering::Relaxed);
    counter!(SessionMetrics::STARTED_TOTAL).increment(1);
    gauge!(SessionMetrics::ACTIVE).increment(1.0);
}

/// Record a session ending with the given outcome label
pub fn record_session_finished(outcome: &str, iterations: u32) {
    // Never wraps below zero if a finish is recorded without a start
    let _ = ACTIVE_SESSIONS.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    counter!(SessionMetrics::FINISHED_TOTAL, "outcome" => outcome.to_string()).increment(1);
    gauge!(SessionMetrics::ACTIVE).decrement(1.0);
    histogram!(SessionMetrics::ITERATIONS, "outcome" => outcome.to_string()).record(iterations as f64);
}

/// Record a message published by a role
pub fn record_offer_published(role: Role, kind: &str) {
    counter!(
        OfferMetrics::PUBLISHED_TOTAL,
        "role" => role.as_str(),
        "kind" => kind.to_string()
    )
    .increment(1);
}

/// Record a provider decision held back to a role limit
pub fn record_clamp(role: Role) {
    counter!(OfferMetrics::CLAMPED_TOTAL, "role" => role.as_str()).increment(1);
}

/// Record provider call latency
pub fn record_provider_latency(role: Role, latency: Duration) {
    histogram!(ProviderMetrics::LATENCY_SECONDS, "role" => role.as_str()).record(latency.as_secs_f64());
}
