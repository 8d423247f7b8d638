// message.rs - Negotiation message structures

//! Messages exchanged between the client and developer actors.
//!
//! Three shapes travel over two topics:
//!
//! ```text
//! Dispatcher          Client                     Developer
//!     |                  |                           |
//!     |-- Initial ------>|                           |
//!     |                  |-- ApplicationDescription->|   (iteration 0)
//!     |                  |<-------- Offer -----------|   (iteration 1)
//!     |                  |--------- Offer ---------->|   (iteration 2)
//!     |                  |          ...              |
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Negotiating party
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Client,
    Developer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Client => "client",
            Role::Developer => "developer",
        }
    }

    /// The other party in the negotiation
    pub fn counterpart(&self) -> Role {
        match self {
            Role::Client => Role::Developer,
            Role::Developer => Role::Client,
        }
    }

    /// Topic this role is subscribed to
    pub fn topic(&self) -> Topic {
        match self {
            Role::Client => Topic::Client,
            Role::Developer => Topic::Developer,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named delivery channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    #[serde(rename = "client_topic")]
    Client,
    #[serde(rename = "developer_topic")]
    Developer,
}

impl Topic {
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Client => "client_topic",
            Topic::Developer => "developer_topic",
        }
    }

    /// Role subscribed to this topic
    pub fn subscriber(&self) -> Role {
        match self {
            Topic::Client => Role::Client,
            Topic::Developer => Role::Developer,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A time/budget pair as offered by one party
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terms {
    pub time: String,
    pub budget: String,
}

impl Terms {
    pub fn new(time: impl Into<String>, budget: impl Into<String>) -> Self {
        Self {
            time: time.into(),
            budget: budget.into(),
        }
    }
}

impl fmt::Display for Terms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "time {}, budget {}", self.time, self.budget)
    }
}

/// Kick-off message delivered once to the client topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitialDescription {
    pub description: String,
}

/// Client's opening proposal, sent to the developer before any offer exists
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationDescription {
    pub content: String,
    pub client_time: String,
    pub client_budget: String,
}

/// One negotiation step. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub application_description: String,
    pub client_time: String,
    pub client_budget: String,
    pub developer_time: String,
    pub developer_budget: String,
    pub iteration: u32,
    /// The sender accepts the counterpart's prior terms
    pub accepted: bool,
    pub sender: Role,
    pub reasoning: String,
}

impl Offer {
    /// Terms proposed by the given party
    pub fn terms_of(&self, role: Role) -> Terms {
        match role {
            Role::Client => Terms::new(&self.client_time, &self.client_budget),
            Role::Developer => Terms::new(&self.developer_time, &self.developer_budget),
        }
    }

    /// Terms proposed by the author of this offer
    pub fn sender_terms(&self) -> Terms {
        self.terms_of(self.sender)
    }
}

/// Envelope routed by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    InitialDescription(InitialDescription),
    ApplicationDescription(ApplicationDescription),
    NegotiationOffer(Offer),
}

impl Message {
    /// Topic the message is published on
    pub fn topic(&self) -> Topic {
        match self {
            Message::InitialDescription(_) => Topic::Client,
            Message::ApplicationDescription(_) => Topic::Developer,
            Message::NegotiationOffer(offer) => offer.sender.counterpart().topic(),
        }
    }

    /// Iteration carried by the message (0 before the first offer)
    pub fn iteration(&self) -> u32 {
        match self {
            Message::NegotiationOffer(offer) => offer.iteration,
            _ => 0,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::InitialDescription(_) => "initial_description",
            Message::ApplicationDescription(_) => "application_description",
            Message::NegotiationOffer(_) => "negotiation_offer",
        }
    }
}

/// Terminal record produced when one side accepts the other's terms
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agreement {
    pub application_description: String,
    pub agreed_time: String,
    pub agreed_budget: String,
    /// Party whose decision closed the deal
    pub accepted_by: Role,
    pub total_iterations: u32,
    pub reasoning: String,
}
