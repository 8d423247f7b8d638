// provider/mod.rs - Reasoning Provider Abstraction

//! The reasoning provider decides each turn's numbers.
//!
//! Negotiation policies never talk to a model directly; they build a
//! [`DecisionRequest`] and hand it to a [`ReasoningProvider`]:
//!
//! - [`OllamaProvider`] - local language model over HTTP
//! - [`ScriptedProvider`] - fixed, table-driven responses
//! - [`ConcessionProvider`] - deterministic arithmetic strategy
//!
//! Every response is validated against the role's schema before use. A
//! malformed payload is a [`ProviderError::Schema`], never a silent default.

mod ollama;
mod scripted;

pub use ollama::{OllamaConfig, OllamaProvider};
pub use scripted::{ConcessionProvider, ScriptedProvider, ScriptedReply};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::message::{Role, Terms};
use crate::protocol::ActorLimits;

/// Reasoning provider errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider request failed: {0}")]
    Request(String),

    #[error("Provider returned HTTP {0}")]
    Status(u16),

    #[error("Provider timed out after {0:?}")]
    Timeout(Duration),

    #[error("Response failed schema validation: {0}")]
    Schema(String),

    #[error("Provider has no response left")]
    Exhausted,
}

/// Structured view of the turn, for providers that do not read prose
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnContext {
    pub application_description: String,

    /// Role's own ceiling (client) or floor (developer)
    pub limits: ActorLimits,

    /// Suggested opening terms, only set on the opening turn
    pub anchor: Option<Terms>,

    /// This role's last published terms
    pub own_previous: Option<Terms>,

    /// Counterpart's current terms
    pub counterpart: Option<Terms>,

    pub counterpart_reasoning: Option<String>,
}

/// One provider invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub role: Role,

    /// Iteration the resulting offer will carry
    pub iteration: u32,

    pub system_prompt: String,

    /// Recent self-authored turns, oldest first
    pub history: Vec<String>,

    /// Current turn instructions
    pub prompt: String,

    pub context: TurnContext,
}

/// Validated provider answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub time: String,
    pub budget: String,
    pub accepted: bool,
    pub reasoning: String,
}

impl Decision {
    pub fn new(
        time: impl Into<String>,
        budget: impl Into<String>,
        accepted: bool,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            time: time.into(),
            budget: budget.into(),
            accepted,
            reasoning: reasoning.into(),
        }
    }

    /// Parse and validate a raw JSON payload for the given role
    pub fn from_json(role: Role, raw: &str) -> Result<Self, ProviderError> {
        let decision = match role {
            Role::Client => serde_json::from_str::<ClientPayload>(raw)
                .map(Decision::from)
                .map_err(|e| ProviderError::Schema(e.to_string()))?,
            Role::Developer => serde_json::from_str::<DeveloperPayload>(raw)
                .map(Decision::from)
                .map_err(|e| ProviderError::Schema(e.to_string()))?,
        };

        if decision.time.trim().is_empty() {
            return Err(ProviderError::Schema("time is empty".into()));
        }
        if decision.budget.trim().is_empty() {
            return Err(ProviderError::Schema("budget is empty".into()));
        }

        Ok(decision)
    }

    pub fn terms(&self) -> Terms {
        Terms::new(&self.time, &self.budget)
    }
}

/// Client response shape
#[derive(Debug, Deserialize)]
struct ClientPayload {
    time: String,
    budget: String,
    #[serde(alias = "conditions_accepted")]
    accepted: bool,
    reasoning: String,
}

impl From<ClientPayload> for Decision {
    fn from(p: ClientPayload) -> Self {
        Decision::new(p.time, p.budget, p.accepted, p.reasoning)
    }
}

/// Developer response shape
#[derive(Debug, Deserialize)]
struct DeveloperPayload {
    #[serde(alias = "developer_estimated_time")]
    developer_time: String,
    #[serde(alias = "developer_budget_request")]
    developer_budget: String,
    #[serde(alias = "conditions_accepted")]
    accepted: bool,
    reasoning: String,
}

impl From<DeveloperPayload> for Decision {
    fn from(p: DeveloperPayload) -> Self {
        Decision::new(p.developer_time, p.developer_budget, p.accepted, p.reasoning)
    }
}

/// JSON schema the provider output must follow
pub fn response_schema(role: Role) -> serde_json::Value {
    let (time_field, budget_field) = match role {
        Role::Client => ("time", "budget"),
        Role::Developer => ("developer_time", "developer_budget"),
    };

    serde_json::json!({
        "type": "object",
        "properties": {
            time_field: { "type": "string" },
            budget_field: { "type": "string" },
            "accepted": { "type": "boolean" },
            "reasoning": { "type": "string" }
        },
        "required": [time_field, budget_field, "accepted", "reasoning"]
    })
}

/// Capability that turns a negotiation turn into a decision
#[async_trait]
pub trait ReasoningProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &str;

    /// Produce the next decision for the requesting role
    async fn propose(&self, request: &DecisionRequest) -> Result<Decision, ProviderError>;
}
