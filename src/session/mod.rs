// session/mod.rs - Negotiation Sessions

//! One session wires a client and a developer negotiator together, injects
//! the initial description and routes every published message to the
//! subscriber of its topic until exactly one outcome is reached.
//!
//! # Example
//!
//! ```ignore
//! use haggle_agents::session::{Dispatcher, SessionSettings};
//!
//! let settings = SessionSettings::from_config(&config);
//! let report = Dispatcher::new(settings, client_provider, developer_provider)
//!     .run()
//!     .await?;
//!
//! println!("{}", report.outcome);
//! ```

mod dispatcher;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::message::{Agreement, Message, Offer, Role};
use crate::observability::EventKind;
use crate::protocol::ActorLimits;

pub use dispatcher::{run_many, Dispatcher, SessionHandle};

/// Session errors
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Parameters of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSettings {
    pub description: String,
    pub client_limits: ActorLimits,
    pub developer_limits: ActorLimits,
    pub max_round: u32,
    pub provider_timeout: Duration,
    pub session_timeout: Option<Duration>,
}

impl SessionSettings {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            description: config.description.clone(),
            client_limits: config.client_limits(),
            developer_limits: config.developer_limits(),
            max_round: config.max_round,
            provider_timeout: config.provider_timeout(),
            session_timeout: config.session_timeout(),
        }
    }

    pub fn with_max_round(mut self, max_round: u32) -> Self {
        self.max_round = max_round;
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = Some(timeout);
        self
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self::from_config(&SessionConfig::default())
    }
}

/// How a session ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    /// One side accepted the other's terms
    Agreement(Agreement),

    /// An offer arrived past the round limit
    LimitExceeded {
        role: Role,
        iteration: u32,
        last_offer: Offer,
    },

    /// The reasoning provider failed; nothing was retried
    ProviderFailure {
        role: Role,
        iteration: u32,
        reason: String,
    },

    /// A negotiator received a message it could not accept
    ProtocolViolation { role: Role, reason: String },

    /// Cancelled or timed out
    Aborted { reason: String },
}

impl SessionOutcome {
    /// Label used in metrics
    pub fn label(&self) -> &'static str {
        match self {
            SessionOutcome::Agreement(_) => "agreement",
            SessionOutcome::LimitExceeded { .. } => "limit_exceeded",
            SessionOutcome::ProviderFailure { .. } => "provider_failure",
            SessionOutcome::ProtocolViolation { .. } => "protocol_violation",
            SessionOutcome::Aborted { .. } => "aborted",
        }
    }

    /// Whether the session ended in a failure the caller should report
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SessionOutcome::ProviderFailure { .. } | SessionOutcome::ProtocolViolation { .. }
        )
    }

    pub fn agreement(&self) -> Option<&Agreement> {
        match self {
            SessionOutcome::Agreement(agreement) => Some(agreement),
            _ => None,
        }
    }

    pub(crate) fn to_event(&self, max_round: u32) -> EventKind {
        match self {
            SessionOutcome::Agreement(agreement) => EventKind::AgreementReached(agreement.clone()),
            SessionOutcome::LimitExceeded { iteration, .. } => EventKind::LimitReached {
                iteration: *iteration,
                max_round,
            },
            SessionOutcome::ProviderFailure { role, iteration, reason } => EventKind::ProviderFailed {
                role: *role,
                iteration: *iteration,
                error: reason.clone(),
            },
            SessionOutcome::ProtocolViolation { role, reason } => EventKind::ProtocolViolated {
                role: *role,
                error: reason.clone(),
            },
            SessionOutcome::Aborted { reason } => EventKind::Aborted {
                reason: reason.clone(),
            },
        }
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::Agreement(a) => write!(
                f,
                "Agreement reached after {} iterations: time {}, budget {} (accepted by {})",
                a.total_iterations, a.agreed_time, a.agreed_budget, a.accepted_by
            ),
            SessionOutcome::LimitExceeded { role, iteration, .. } => write!(
                f,
                "Negotiation terminated: iteration {iteration} exceeded the round limit ({role} stopped)"
            ),
            SessionOutcome::ProviderFailure { role, iteration, reason } => write!(
                f,
                "Negotiation failed: {role} reasoning provider error at iteration {iteration}: {reason}"
            ),
            SessionOutcome::ProtocolViolation { role, reason } => {
                write!(f, "Negotiation failed: {role} protocol violation: {reason}")
            }
            SessionOutcome::Aborted { reason } => write!(f, "Negotiation aborted: {reason}"),
        }
    }
}

/// Result of one session run
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    pub session_id: Uuid,
    #[serde(flatten)]
    pub outcome: SessionOutcome,
    /// Every message published by the negotiators, in order
    pub transcript: Vec<Message>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SessionReport {
    /// Iteration of the last published message (0 when none was an offer)
    pub fn last_iteration(&self) -> u32 {
        self.transcript.last().map(Message::iteration).unwrap_or(0)
    }

    /// Offers in publication order
    pub fn offers(&self) -> impl Iterator<Item = &Offer> {
        self.transcript.iter().filter_map(|m| match m {
            Message::NegotiationOffer(offer) => Some(offer),
            _ => None,
        })
    }

    /// Iterations the session went through, including a closing acceptance
    pub fn iterations(&self) -> u32 {
        match &self.outcome {
            SessionOutcome::Agreement(a) => a.total_iterations,
            SessionOutcome::LimitExceeded { iteration, .. } => *iteration,
            _ => self.last_iteration(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_default_config() {
        let settings = SessionSettings::default();
        assert_eq!(settings.max_round, 5);
        assert_eq!(settings.client_limits, ActorLimits::new("1500 eur", "1 mes"));
        assert_eq!(settings.developer_limits, ActorLimits::new("1200 eur", "3 weeks"));
        assert!(settings.session_timeout.is_none());
    }

    #[test]
    fn test_outcome_labels_and_events() {
        let failure = SessionOutcome::ProviderFailure {
            role: Role::Developer,
            iteration: 1,
            reason: "schema".into(),
        };
        assert_eq!(failure.label(), "provider_failure");
        assert!(failure.is_failure());
        assert!(failure.to_event(5).is_terminal());
        assert!(failure.to_string().contains("developer"));

        let aborted = SessionOutcome::Aborted {
            reason: "cancelled".into(),
        };
        assert!(!aborted.is_failure());
        assert!(aborted.agreement().is_none());
    }
}
