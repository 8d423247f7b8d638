// provider/scripted.rs - Deterministic providers

//! Providers that never call a model.
//!
//! [`ScriptedProvider`] replays a fixed table of replies, one per call, and
//! records every request it saw. [`ConcessionProvider`] computes offers with
//! simple arithmetic: open at the anchor, move a fixed share of the remaining
//! distance towards the role's limit each turn, and accept once the
//! counterpart's terms respect that limit.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use super::{Decision, DecisionRequest, ProviderError, ReasoningProvider};
use crate::message::{Role, Terms};
use crate::quantity::{Bound, Quantity, QuantityKind, satisfies_limit};

/// One scripted answer
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this decision
    Decide(Decision),
    /// Validate this raw payload as if a model had produced it
    Raw(String),
    /// Fail the call
    Fail(ProviderError),
    /// Sleep before answering with the decision
    Delayed(Duration, Decision),
}

/// Table-driven provider
pub struct ScriptedProvider {
    replies: Mutex<VecDeque<ScriptedReply>>,
    /// Replayed forever once the table runs out
    fallback: Option<ScriptedReply>,
    requests: Mutex<Vec<DecisionRequest>>,
}

impl ScriptedProvider {
    pub fn new(replies: impl IntoIterator<Item = ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Provider giving the same decision on every call
    pub fn always(decision: Decision) -> Self {
        Self::new([]).with_fallback(ScriptedReply::Decide(decision))
    }

    pub fn with_fallback(mut self, reply: ScriptedReply) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DecisionRequest> {
        self.requests.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn next_reply(&self) -> Option<ScriptedReply> {
        self.replies.lock().pop_front().or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ReasoningProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn propose(&self, request: &DecisionRequest) -> Result<Decision, ProviderError> {
        self.requests.lock().push(request.clone());

        match self.next_reply().ok_or(ProviderError::Exhausted)? {
            ScriptedReply::Decide(decision) => Ok(decision),
            ScriptedReply::Raw(raw) => Decision::from_json(request.role, &raw),
            ScriptedReply::Fail(err) => Err(err),
            ScriptedReply::Delayed(delay, decision) => {
                tokio::time::sleep(delay).await;
                Ok(decision)
            }
        }
    }
}

/// Arithmetic negotiator used for offline runs
#[derive(Debug, Clone)]
pub struct ConcessionProvider {
    /// Share of the distance to the limit conceded per turn, in (0, 1]
    step: f64,
}

impl Default for ConcessionProvider {
    fn default() -> Self {
        Self { step: 0.5 }
    }
}

impl ConcessionProvider {
    pub fn new(step: f64) -> Self {
        Self {
            step: step.clamp(f64::EPSILON, 1.0),
        }
    }

    fn concede(&self, previous: &str, limit: &str, kind: QuantityKind) -> String {
        let (Ok(prev), Ok(lim)) = (previous.parse::<Quantity>(), limit.parse::<Quantity>()) else {
            return previous.to_string();
        };
        if prev.compare(&lim, kind).is_none() {
            return previous.to_string();
        }

        let (prev_amount, _) = prev.normalized(kind);
        let (limit_amount, _) = lim.normalized(kind);
        let next = prev_amount + (limit_amount - prev_amount) * self.step;

        // Known time units stay in days, anything else keeps the limit's unit
        if kind == QuantityKind::Time && lim.normalized(kind).1 == "day" {
            return Quantity::new(next, "days").rounded().to_string();
        }
        let per_unit = Quantity::new(1.0, lim.unit.clone()).normalized(kind).0;
        Quantity::new(next / per_unit, lim.unit).rounded().to_string()
    }
}

#[async_trait]
impl ReasoningProvider for ConcessionProvider {
    fn name(&self) -> &str {
        "concession"
    }

    async fn propose(&self, request: &DecisionRequest) -> Result<Decision, ProviderError> {
        let ctx = &request.context;
        let bound = match request.role {
            Role::Client => Bound::Ceiling,
            Role::Developer => Bound::Floor,
        };

        let Some(previous) = ctx.own_previous.as_ref() else {
            let opening = ctx.anchor.clone().unwrap_or_else(|| {
                Terms::new(&ctx.limits.time, &ctx.limits.budget)
            });
            return Ok(Decision::new(
                opening.time,
                opening.budget,
                false,
                "Opening position based on the expected scope.",
            ));
        };

        if let Some(theirs) = ctx.counterpart.as_ref() {
            let budget_ok = satisfies_limit(&theirs.budget, &ctx.limits.budget, QuantityKind::Budget, bound);
            let time_ok = satisfies_limit(&theirs.time, &ctx.limits.time, QuantityKind::Time, bound);
            if budget_ok == Some(true) && time_ok != Some(false) {
                return Ok(Decision::new(
                    &theirs.time,
                    &theirs.budget,
                    true,
                    "These terms work for us.",
                ));
            }
        }

        Ok(Decision::new(
            self.concede(&previous.time, &ctx.limits.time, QuantityKind::Time),
            self.concede(&previous.budget, &ctx.limits.budget, QuantityKind::Budget),
            false,
            "We can move part of the way towards your position.",
        ))
    }
}
