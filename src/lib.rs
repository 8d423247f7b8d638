// lib.rs - Two-party Negotiation Agents
//
// A client and a developer actor haggle over the budget and delivery time
// of a software project, each backed by a reasoning provider.

#![doc = include_str!("../README.md")]

pub mod actor;
pub mod config;
pub mod message;
pub mod observability;
pub mod protocol;
pub mod provider;
pub mod quantity;
pub mod session;

// Re-export commonly used types
pub use actor::{ActorHandle, ActorReply, NegotiatorActor};

pub use config::{ConfigError, ConfigSource, SessionConfig};

pub use message::{
    Agreement, ApplicationDescription, InitialDescription, Message, Offer, Role, Terms, Topic,
};

pub use protocol::{
    ActorLimits, NegotiationPhase, NegotiationPolicy, ProtocolError, RoleProfile, TurnError,
    TurnOutcome,
};

pub use provider::{
    ConcessionProvider, Decision, DecisionRequest, OllamaConfig, OllamaProvider, ProviderError,
    ReasoningProvider, ScriptedProvider, ScriptedReply,
};

pub use session::{
    run_many, Dispatcher, SessionError, SessionHandle, SessionOutcome, SessionReport,
    SessionSettings,
};

pub use observability::{
    init_metrics, init_tracing, ChannelSink, EventKind, EventSink, MetricsConfig, MetricsHandle,
    SessionEvent, TracingConfig, TracingFormat, TracingSink,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::SessionConfig;
    pub use crate::message::{Agreement, Message, Offer, Role, Terms};
    pub use crate::protocol::{ActorLimits, NegotiationPolicy, RoleProfile, TurnOutcome};
    pub use crate::provider::{
        ConcessionProvider, Decision, OllamaConfig, OllamaProvider, ReasoningProvider,
        ScriptedProvider,
    };
    pub use crate::session::{Dispatcher, SessionOutcome, SessionReport, SessionSettings};
}
