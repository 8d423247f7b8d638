// observability/tracing_setup.rs - Tracing Configuration

use std::str::FromStr;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Tracing output format
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TracingFormat {
    /// Human-readable format (default)
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for log aggregation
    Json,
}

impl FromStr for TracingFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(TracingFormat::Pretty),
            "compact" => Ok(TracingFormat::Compact),
            "json" => Ok(TracingFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Configuration for tracing
#[derive(Clone, Debug)]
pub struct TracingConfig {
    /// Log level filter (e.g., "info", "debug", "haggle_agents=debug")
    pub filter: String,

    /// Output format
    pub format: TracingFormat,

    /// Include span events (new, close)
    pub with_span_events: bool,

    /// Include file and line numbers
    pub with_file: bool,

    /// Include target (module path)
    pub with_target: bool,

    /// ANSI colors (for terminal output)
    pub with_ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            filter: "warn,haggle_agents=info".into(),
            format: TracingFormat::Pretty,
            with_span_events: false,
            with_file: false,
            with_target: true,
            with_ansi: true,
        }
    }
}

impl TracingConfig {
    /// Derive a config from a single level and an output format.
    ///
    /// `debug` and `trace` also turn on span events and source locations.
    pub fn for_level(level: &str, format: TracingFormat) -> Self {
        let verbose = matches!(level, "debug" | "trace");
        Self {
            filter: format!("warn,haggle_agents={level}"),
            with_ansi: format != TracingFormat::Json,
            format,
            with_span_events: verbose,
            with_file: verbose,
            with_target: true,
        }
    }

    /// JSON lines, one structured record per negotiation event
    pub fn production() -> Self {
        Self::for_level("info", TracingFormat::Json)
    }
}

/// Initialize the tracing subscriber
///
/// Should be called once at startup. `RUST_LOG` overrides the configured
/// filter. Returns an error if a global subscriber is already installed.
pub fn init_tracing(config: TracingConfig) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.filter));

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        TracingFormat::Pretty => registry
            .with(
                fmt::layer()
                    .with_span_events(span_events)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_target(config.with_target)
                    .with_ansi(config.with_ansi),
            )
            .try_init()?,
        TracingFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_span_events(span_events)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_target(config.with_target)
                    .with_ansi(config.with_ansi),
            )
            .try_init()?,
        TracingFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_span_events(span_events)
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_target(config.with_target),
            )
            .try_init()?,
    }

    tracing::debug!(
        filter = %config.filter,
        format = ?config.format,
        "Tracing initialized"
    );
    Ok(())
}
