// bin/haggle.rs - Negotiation Session Binary

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use haggle_agents::config::{ConfigSource, SessionConfig, DEFAULT_CONFIG_FILE};
use haggle_agents::observability::{init_metrics, init_tracing, MetricsConfig, TracingConfig, TracingFormat};
use haggle_agents::provider::{ConcessionProvider, OllamaConfig, OllamaProvider, ReasoningProvider};
use haggle_agents::session::{run_many, Dispatcher, SessionReport, SessionSettings};

/// Client/developer negotiation
#[derive(Parser, Debug)]
#[command(name = "haggle")]
#[command(author = "SavageS")]
#[command(version)]
#[command(about = "Budget and time negotiation between a client and a developer agent", long_about = None)]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Override the maximum number of negotiation rounds
    #[arg(long)]
    max_round: Option<u32>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log format (pretty, compact, json)
    #[arg(long, default_value = "pretty")]
    log_format: String,

    /// Use the offline concession provider instead of Ollama
    #[arg(long)]
    scripted: bool,

    /// Number of isolated sessions to run concurrently
    #[arg(short, long, default_value = "1")]
    sessions: usize,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    output: OutputFormat,

    /// Enable metrics server
    #[arg(long)]
    metrics: bool,

    /// Metrics listen address
    #[arg(long, default_value = "0.0.0.0:9090")]
    metrics_addr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let format: TracingFormat = args
        .log_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;
    init_tracing(TracingConfig::for_level(&args.log_level, format))?;

    let (mut config, source) = SessionConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if source == ConfigSource::Defaults {
        warn!("Running with built-in defaults");
    }
    if let Some(max_round) = args.max_round {
        config.max_round = max_round;
        config.validate()?;
    }

    let _metrics_handle = if args.metrics {
        let metrics_addr: SocketAddr = args.metrics_addr.parse()?;
        match init_metrics(MetricsConfig {
            listen_addr: metrics_addr,
            ..Default::default()
        }) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(error = %e, "Failed to initialize metrics");
                None
            }
        }
    } else {
        None
    };

    let provider: Arc<dyn ReasoningProvider> = if args.scripted {
        info!("Using offline concession provider");
        Arc::new(ConcessionProvider::default())
    } else {
        info!(model = %config.model, url = %config.ollama_url, "Using Ollama provider");
        Arc::new(OllamaProvider::new(OllamaConfig {
            base_url: config.ollama_url.clone(),
            model: config.model.clone(),
            temperature: None,
        }))
    };

    let settings = SessionSettings::from_config(&config);
    let dispatchers: Vec<Dispatcher> = (0..args.sessions.max(1))
        .map(|_| Dispatcher::new(settings.clone(), Arc::clone(&provider), Arc::clone(&provider)))
        .collect();

    let mut failures = 0;
    for result in run_many(dispatchers).await {
        let report = result?;
        print_report(&report, args.output)?;
        if report.outcome.is_failure() {
            failures += 1;
        }
    }

    if failures > 0 {
        bail!("{failures} session(s) failed");
    }
    Ok(())
}

fn print_report(report: &SessionReport, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            println!("Session {}", report.session_id);
            for message in &report.transcript {
                if let haggle_agents::Message::NegotiationOffer(offer) = message {
                    println!(
                        "  [{}] {}: {} - {}",
                        offer.iteration,
                        offer.sender,
                        offer.sender_terms(),
                        offer.reasoning
                    );
                }
            }
            println!("  {}", report.outcome);
        }
    }
    Ok(())
}
