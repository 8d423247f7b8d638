// observability/mod.rs - Tracing, Metrics and Negotiation Events

//! Observability module.
//!
//! # Features
//!
//! - **Tracing**: Structured logging with selectable output format
//! - **Metrics**: Prometheus-compatible metrics export
//! - **Events**: One structured record per turn and per session outcome
//!
//! # Example
//!
//! ```ignore
//! use haggle_agents::observability::{init_tracing, TracingConfig, TracingFormat};
//!
//! init_tracing(TracingConfig::for_level("info", TracingFormat::Json))?;
//! ```

mod events;
mod metrics;
mod tracing_setup;

pub use events::{ChannelSink, EventKind, EventSink, MultiSink, SessionEvent, TracingSink};

pub use metrics::{
    init_metrics, record_clamp, record_offer_published, record_provider_latency,
    record_session_finished, record_session_started, MetricsConfig, MetricsError, MetricsHandle,
    OfferMetrics, ProviderMetrics, SessionMetrics,
};

pub use tracing_setup::{init_tracing, TracingConfig, TracingFormat};
