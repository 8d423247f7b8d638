// protocol/state_machine.rs - Negotiation phases and turn results

use serde::{Deserialize, Serialize};

use crate::message::{Agreement, Message, Offer, Role};
use crate::provider::ProviderError;

/// Protocol error types
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Invalid transition from {from} on {input}")]
    InvalidTransition { from: String, input: String },

    #[error("Out of sequence offer: expected iteration {expected}, got {got}")]
    OutOfSequence { expected: u32, got: u32 },

    #[error("Offer from {0} delivered to its own author")]
    OwnOffer(Role),
}

/// Per-actor negotiation phase
///
/// ```text
/// AwaitingInitial -> Proposed -> { Countered | Agreed | TerminatedByLimit }
/// Countered -> { Countered | Agreed | TerminatedByLimit }
/// any non-terminal -> Failed
/// ```
///
/// `Countered` is the "awaiting offer" phase reached after publishing a
/// counter-offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NegotiationPhase {
    /// Nothing received yet
    AwaitingInitial,
    /// Opening terms published
    Proposed,
    /// Counter-offer published, waiting for the reply
    Countered,
    /// Agreement reached
    Agreed,
    /// Round limit exceeded
    TerminatedByLimit,
    /// Provider or protocol failure
    Failed,
}

impl NegotiationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            NegotiationPhase::AwaitingInitial => "awaiting_initial",
            NegotiationPhase::Proposed => "proposed",
            NegotiationPhase::Countered => "countered",
            NegotiationPhase::Agreed => "agreed",
            NegotiationPhase::TerminatedByLimit => "terminated_by_limit",
            NegotiationPhase::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NegotiationPhase::Agreed | NegotiationPhase::TerminatedByLimit | NegotiationPhase::Failed
        )
    }

    /// Whether an offer from the counterpart may be processed
    pub fn awaits_offer(&self) -> bool {
        matches!(self, NegotiationPhase::Proposed | NegotiationPhase::Countered)
    }
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// Publish this message to the counterpart
    Publish(Message),

    /// Negotiation closed with an agreement
    Agreed(Agreement),

    /// Inbound offer exceeded the round limit; nothing is published
    LimitReached { iteration: u32, last_offer: Offer },
}

impl TurnOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TurnOutcome::Publish(_))
    }
}

/// Failure of one turn; always terminal for the session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TurnError {
    #[error("{role} provider failed at iteration {iteration}: {source}")]
    Provider {
        role: Role,
        iteration: u32,
        #[source]
        source: ProviderError,
    },

    #[error("{role} protocol violation: {source}")]
    Protocol {
        role: Role,
        #[source]
        source: ProtocolError,
    },
}

impl TurnError {
    pub fn role(&self) -> Role {
        match self {
            TurnError::Provider { role, .. } | TurnError::Protocol { role, .. } => *role,
        }
    }
}
