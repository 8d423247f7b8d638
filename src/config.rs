// config.rs - Session configuration

//! Session configuration loading.
//!
//! Values are layered with the `config` crate: built-in defaults, then the
//! YAML file (if present), then `HAGGLE_*` environment variables. A missing
//! file is not an error; the built-in defaults are used and
//! [`ConfigSource::Defaults`] is reported so callers can say so.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::protocol::ActorLimits;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default round limit
pub const DEFAULT_MAX_ROUND: u32 = 5;

/// Environment variable prefix, e.g. `HAGGLE_MAX_ROUND=3`
pub const ENV_PREFIX: &str = "HAGGLE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Everything needed to run one negotiation session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Model identifier passed to the reasoning provider
    pub model: String,

    /// Client ceiling
    pub max_budget: String,
    pub max_time: String,

    /// Developer floor
    pub min_budget: String,
    pub min_time: String,

    /// Application being negotiated
    pub description: String,

    #[serde(default = "default_max_round")]
    pub max_round: u32,

    /// Per-call limit on the reasoning provider
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Optional limit on the whole session
    #[serde(default)]
    pub session_timeout_secs: Option<u64>,

    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
}

fn default_max_round() -> u32 {
    DEFAULT_MAX_ROUND
}

fn default_provider_timeout_secs() -> u64 {
    120
}

fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "mistral:latest".into(),
            max_budget: "1500 eur".into(),
            max_time: "1 mes".into(),
            min_budget: "1200 eur".into(),
            min_time: "3 weeks".into(),
            description: "Aplicación software básica".into(),
            max_round: default_max_round(),
            provider_timeout_secs: default_provider_timeout_secs(),
            session_timeout_secs: None,
            ollama_url: default_ollama_url(),
        }
    }
}

impl SessionConfig {
    /// Load configuration from `path`, falling back to defaults when the file is absent
    pub fn load(path: impl AsRef<Path>) -> Result<(Self, ConfigSource), ConfigError> {
        let path = path.as_ref();
        let defaults = ::config::Config::try_from(&SessionConfig::default())?;

        let mut builder = ::config::Config::builder().add_source(defaults);

        let source = if path.exists() {
            builder = builder.add_source(::config::File::from(path));
            ConfigSource::File(path.to_path_buf())
        } else {
            warn!(path = %path.display(), "Configuration file not found, using built-in defaults");
            ConfigSource::Defaults
        };

        let settings: SessionConfig = builder
            .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()?
            .try_deserialize()?;

        settings.validate()?;

        info!(
            source = ?source,
            model = %settings.model,
            max_round = settings.max_round,
            "Configuration loaded"
        );

        Ok((settings, source))
    }

    /// Reject values the protocol cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_round == 0 {
            return Err(ConfigError::Invalid("max_round must be at least 1".into()));
        }
        if self.provider_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "provider_timeout_secs must be positive".into(),
            ));
        }
        if self.description.trim().is_empty() {
            return Err(ConfigError::Invalid("description is empty".into()));
        }
        Ok(())
    }

    pub fn client_limits(&self) -> ActorLimits {
        ActorLimits::new(&self.max_budget, &self.max_time)
    }

    pub fn developer_limits(&self) -> ActorLimits {
        ActorLimits::new(&self.min_budget, &self.min_time)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn session_timeout(&self) -> Option<Duration> {
        self.session_timeout_secs.map(Duration::from_secs)
    }
}
