// observability/events.rs - Structured negotiation events

//! Every published message and every session ending is reported as a
//! [`SessionEvent`]. Sinks decide what to do with them: [`TracingSink`] logs
//! them as structured records, [`ChannelSink`] forwards them to a receiver.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::message::{Agreement, Role};

/// Event payload
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    /// A role published its terms
    TurnCompleted {
        iteration: u32,
        sender: Role,
        time: String,
        budget: String,
        accepted: bool,
        reasoning: String,
    },

    AgreementReached(Agreement),

    LimitReached {
        iteration: u32,
        max_round: u32,
    },

    ProviderFailed {
        role: Role,
        iteration: u32,
        error: String,
    },

    ProtocolViolated {
        role: Role,
        error: String,
    },

    Aborted {
        reason: String,
    },
}

impl EventKind {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EventKind::TurnCompleted { .. })
    }
}

/// Event stamped with its session and time
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionEvent {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl SessionEvent {
    pub fn new(session_id: Uuid, kind: EventKind) -> Self {
        Self {
            session_id,
            timestamp: Utc::now(),
            kind,
        }
    }
}

/// Consumer of negotiation events
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &SessionEvent);
}

/// Logs events through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &SessionEvent) {
        let session = event.session_id;
        match &event.kind {
            EventKind::TurnCompleted {
                iteration,
                sender,
                time,
                budget,
                accepted,
                reasoning,
            } => info!(
                session_id = %session,
                iteration,
                sender = %sender,
                time = %time,
                budget = %budget,
                accepted,
                reasoning = %reasoning,
                "Turn completed"
            ),
            EventKind::AgreementReached(agreement) => info!(
                session_id = %session,
                total_iterations = agreement.total_iterations,
                accepted_by = %agreement.accepted_by,
                agreed_time = %agreement.agreed_time,
                agreed_budget = %agreement.agreed_budget,
                "Agreement reached"
            ),
            EventKind::LimitReached { iteration, max_round } => info!(
                session_id = %session,
                iteration,
                max_round,
                "Negotiation terminated by round limit"
            ),
            EventKind::ProviderFailed { role, iteration, error } => warn!(
                session_id = %session,
                role = %role,
                iteration,
                error = %error,
                "Negotiation failed: reasoning provider error"
            ),
            EventKind::ProtocolViolated { role, error } => warn!(
                session_id = %session,
                role = %role,
                error = %error,
                "Negotiation failed: protocol violation"
            ),
            EventKind::Aborted { reason } => warn!(
                session_id = %session,
                reason = %reason,
                "Negotiation aborted"
            ),
        }
    }
}

/// Forwards events to an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &SessionEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}

/// Fans events out to several sinks
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<std::sync::Arc<dyn EventSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: std::sync::Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for MultiSink {
    fn emit(&self, event: &SessionEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
