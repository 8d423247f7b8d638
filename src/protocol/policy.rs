// protocol/policy.rs - Role-parameterised negotiation policy

//! One policy type serves both parties; a [`RoleProfile`] supplies the
//! differences (limit direction and opening multipliers).
//!
//! The policy validates each inbound message against its phase and the
//! expected iteration, enforces the round limit, asks the reasoning provider
//! for a decision, holds the result to the role's limits, and returns what
//! to publish next.

use rand::Rng;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::message::{Agreement, ApplicationDescription, InitialDescription, Message, Offer, Role, Terms};
use crate::observability::{record_clamp, record_provider_latency};
use crate::provider::{Decision, DecisionRequest, ProviderError, ReasoningProvider, TurnContext};
use crate::quantity::{Clamp, QuantityKind, clamp_to_limit, satisfies_limit};

use super::prompts;
use super::role::RoleProfile;
use super::state_machine::{NegotiationPhase, ProtocolError, TurnError, TurnOutcome};

/// Number of self-authored turns kept as provider context
pub const HISTORY_LIMIT: usize = 5;

/// One of this actor's own past turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub iteration: u32,
    pub terms: Terms,
    pub accepted: bool,
    pub reasoning: String,
}

impl fmt::Display for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let action = if self.iteration <= 1 { "initial proposal" } else { "counter-offer" };
        write!(
            f,
            "My {action} (iteration {}): {}. Conditions accepted: {}. Reasoning: {}",
            self.iteration, self.terms, self.accepted, self.reasoning
        )
    }
}

/// Per-actor negotiation policy and private state
pub struct NegotiationPolicy {
    profile: RoleProfile,
    provider: Arc<dyn ReasoningProvider>,
    max_round: u32,
    provider_timeout: Duration,

    phase: NegotiationPhase,

    /// Turns this actor has published
    round: u32,

    /// Iteration of the last message this actor published (0 for the application description)
    last_iteration: u32,

    /// Own terms as last published
    last_terms: Option<Terms>,

    history: VecDeque<HistoryEntry>,
}

impl NegotiationPolicy {
    pub fn new(profile: RoleProfile, provider: Arc<dyn ReasoningProvider>, max_round: u32) -> Self {
        Self {
            profile,
            provider,
            max_round,
            provider_timeout: Duration::from_secs(120),
            phase: NegotiationPhase::AwaitingInitial,
            round: 0,
            last_iteration: 0,
            last_terms: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    /// Set the per-call provider timeout
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    pub fn role(&self) -> Role {
        self.profile.role
    }

    pub fn profile(&self) -> &RoleProfile {
        &self.profile
    }

    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn max_round(&self) -> u32 {
        self.max_round
    }

    pub fn history(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.history.iter()
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Handle one inbound message
    pub async fn handle(&mut self, message: Message) -> Result<TurnOutcome, TurnError> {
        let result = match message {
            Message::InitialDescription(initial) if self.role() == Role::Client => {
                self.open_as_client(initial).await
            }
            Message::ApplicationDescription(app) if self.role() == Role::Developer => {
                self.open_as_developer(app).await
            }
            Message::NegotiationOffer(offer) => self.respond(offer).await,
            other => Err(self.protocol_error(ProtocolError::InvalidTransition {
                from: self.phase.as_str().to_string(),
                input: other.kind().to_string(),
            })),
        };

        if result.is_err() {
            self.phase = NegotiationPhase::Failed;
        }
        result
    }

    async fn open_as_client(&mut self, initial: InitialDescription) -> Result<TurnOutcome, TurnError> {
        self.expect_phase(NegotiationPhase::AwaitingInitial, "initial_description")?;

        info!(
            role = %self.role(),
            description = %initial.description,
            "Starting negotiation"
        );

        let decision = self.opening_decision(&initial.description, None, 0).await?;

        self.phase = NegotiationPhase::Proposed;
        self.record_turn(0, decision.terms(), false, decision.reasoning);

        Ok(TurnOutcome::Publish(Message::ApplicationDescription(
            ApplicationDescription {
                content: initial.description,
                client_time: decision.time,
                client_budget: decision.budget,
            },
        )))
    }

    async fn open_as_developer(&mut self, app: ApplicationDescription) -> Result<TurnOutcome, TurnError> {
        self.expect_phase(NegotiationPhase::AwaitingInitial, "application_description")?;

        let client_terms = Terms::new(&app.client_time, &app.client_budget);
        info!(
            role = %self.role(),
            description = %app.content,
            client = %client_terms,
            "Received application description"
        );

        let decision = self
            .opening_decision(&app.content, Some(&client_terms), 1)
            .await?;

        let offer = Offer {
            application_description: app.content,
            client_time: app.client_time,
            client_budget: app.client_budget,
            developer_time: decision.time.clone(),
            developer_budget: decision.budget.clone(),
            iteration: 1,
            accepted: false,
            sender: Role::Developer,
            reasoning: decision.reasoning.clone(),
        };

        self.phase = NegotiationPhase::Proposed;
        self.record_turn(1, decision.terms(), false, decision.reasoning);

        Ok(TurnOutcome::Publish(Message::NegotiationOffer(offer)))
    }

    async fn respond(&mut self, offer: Offer) -> Result<TurnOutcome, TurnError> {
        if !self.phase.awaits_offer() {
            return Err(self.protocol_error(ProtocolError::InvalidTransition {
                from: self.phase.as_str().to_string(),
                input: "negotiation_offer".to_string(),
            }));
        }
        if offer.sender == self.role() {
            return Err(self.protocol_error(ProtocolError::OwnOffer(offer.sender)));
        }
        let expected = self.last_iteration + 1;
        if offer.iteration != expected {
            return Err(self.protocol_error(ProtocolError::OutOfSequence {
                expected,
                got: offer.iteration,
            }));
        }

        if offer.iteration > self.max_round {
            info!(
                role = %self.role(),
                iteration = offer.iteration,
                max_round = self.max_round,
                "Round limit exceeded, negotiation terminated"
            );
            self.phase = NegotiationPhase::TerminatedByLimit;
            return Ok(TurnOutcome::LimitReached {
                iteration: offer.iteration,
                last_offer: offer,
            });
        }

        // Counterpart accepted this actor's own standing terms
        if offer.accepted {
            let own = offer.terms_of(self.role());
            self.phase = NegotiationPhase::Agreed;
            return Ok(TurnOutcome::Agreed(Agreement {
                application_description: offer.application_description,
                agreed_time: own.time,
                agreed_budget: own.budget,
                accepted_by: offer.sender,
                total_iterations: offer.iteration,
                reasoning: offer.reasoning,
            }));
        }

        let iteration = offer.iteration + 1;
        let theirs = offer.sender_terms();
        let own_previous = self
            .last_terms
            .clone()
            .unwrap_or_else(|| offer.terms_of(self.role()));

        debug!(
            role = %self.role(),
            iteration = offer.iteration,
            counterpart = %theirs,
            "Evaluating counter-offer"
        );

        let request = DecisionRequest {
            role: self.role(),
            iteration,
            system_prompt: prompts::system_prompt(&self.profile),
            history: self.history_lines(),
            prompt: prompts::counter_prompt(
                &self.profile,
                &offer.application_description,
                &own_previous,
                &theirs,
                &offer.reasoning,
            ),
            context: TurnContext {
                application_description: offer.application_description.clone(),
                limits: self.profile.limits.clone(),
                anchor: None,
                own_previous: Some(own_previous),
                counterpart: Some(theirs.clone()),
                counterpart_reasoning: Some(offer.reasoning.clone()),
            },
        };

        let mut decision = self.ask(&request).await?;

        if decision.accepted && !self.respects_limits(&theirs) {
            warn!(
                role = %self.role(),
                iteration,
                terms = %theirs,
                "Provider accepted terms beyond the role limit, countering instead"
            );
            record_clamp(self.role());
            decision.accepted = false;
        }

        if decision.accepted {
            info!(
                role = %self.role(),
                iteration,
                terms = %theirs,
                "Accepting counterpart terms"
            );
            self.phase = NegotiationPhase::Agreed;
            return Ok(TurnOutcome::Agreed(Agreement {
                application_description: offer.application_description,
                agreed_time: theirs.time,
                agreed_budget: theirs.budget,
                accepted_by: self.role(),
                total_iterations: iteration,
                reasoning: decision.reasoning,
            }));
        }

        let decision = self.hold_to_limits(decision, iteration);

        let mut counter = Offer {
            application_description: offer.application_description,
            client_time: offer.client_time,
            client_budget: offer.client_budget,
            developer_time: offer.developer_time,
            developer_budget: offer.developer_budget,
            iteration,
            accepted: false,
            sender: self.role(),
            reasoning: decision.reasoning.clone(),
        };
        match self.role() {
            Role::Client => {
                counter.client_time = decision.time.clone();
                counter.client_budget = decision.budget.clone();
            }
            Role::Developer => {
                counter.developer_time = decision.time.clone();
                counter.developer_budget = decision.budget.clone();
            }
        }

        self.phase = NegotiationPhase::Countered;
        self.record_turn(iteration, decision.terms(), false, decision.reasoning);

        Ok(TurnOutcome::Publish(Message::NegotiationOffer(counter)))
    }

    /// Ask for opening terms; an opening never accepts anything
    async fn opening_decision(
        &self,
        description: &str,
        counterpart: Option<&Terms>,
        iteration: u32,
    ) -> Result<Decision, TurnError> {
        let share = rand::rng().random_range(self.profile.opening_budget.clone());
        let anchor = self.profile.anchor(share);

        let request = DecisionRequest {
            role: self.role(),
            iteration,
            system_prompt: prompts::system_prompt(&self.profile),
            history: self.history_lines(),
            prompt: prompts::opening_prompt(&self.profile, description, &anchor, counterpart),
            context: TurnContext {
                application_description: description.to_string(),
                limits: self.profile.limits.clone(),
                anchor: Some(anchor),
                own_previous: None,
                counterpart: counterpart.cloned(),
                counterpart_reasoning: None,
            },
        };

        let mut decision = self.ask(&request).await?;
        if decision.accepted {
            debug!(role = %self.role(), "Ignoring acceptance on opening turn");
            decision.accepted = false;
        }
        Ok(self.hold_to_limits(decision, iteration))
    }

    async fn ask(&self, request: &DecisionRequest) -> Result<Decision, TurnError> {
        let started = Instant::now();
        let result = tokio::time::timeout(self.provider_timeout, self.provider.propose(request))
            .await
            .unwrap_or(Err(ProviderError::Timeout(self.provider_timeout)));
        record_provider_latency(self.role(), started.elapsed());

        result.map_err(|source| {
            warn!(
                role = %self.role(),
                iteration = request.iteration,
                provider = self.provider.name(),
                error = %source,
                "Reasoning provider failed"
            );
            TurnError::Provider {
                role: self.role(),
                iteration: request.iteration,
                source,
            }
        })
    }

    /// Keep the client at or under its ceiling and the developer at or over its floor
    fn hold_to_limits(&self, mut decision: Decision, iteration: u32) -> Decision {
        let bound = self.profile.bound();
        let limits = &self.profile.limits;

        for (kind, value, limit) in [
            (QuantityKind::Budget, &mut decision.budget, &limits.budget),
            (QuantityKind::Time, &mut decision.time, &limits.time),
        ] {
            match clamp_to_limit(value, limit, kind, bound) {
                Clamp::Within => {}
                Clamp::Adjusted(held) => {
                    warn!(
                        role = %self.role(),
                        iteration,
                        kind = ?kind,
                        offered = %value,
                        limit = %held,
                        "Provider crossed the role limit, clamping"
                    );
                    record_clamp(self.role());
                    *value = held;
                }
                Clamp::Incomparable if kind == QuantityKind::Budget => {
                    warn!(
                        role = %self.role(),
                        iteration,
                        offered = %value,
                        limit = %limit,
                        "Budget not comparable with limit, left as is"
                    );
                }
                Clamp::Incomparable => {
                    debug!(
                        role = %self.role(),
                        kind = ?kind,
                        offered = %value,
                        limit = %limit,
                        "Offer not comparable with limit, left as is"
                    );
                }
            }
        }

        decision
    }

    /// Whether the counterpart's terms are acceptable under this role's limits.
    ///
    /// Incomparable quantities do not block an acceptance.
    fn respects_limits(&self, terms: &Terms) -> bool {
        let bound = self.profile.bound();
        let limits = &self.profile.limits;
        satisfies_limit(&terms.budget, &limits.budget, QuantityKind::Budget, bound) != Some(false)
            && satisfies_limit(&terms.time, &limits.time, QuantityKind::Time, bound) != Some(false)
    }

    fn record_turn(&mut self, iteration: u32, terms: Terms, accepted: bool, reasoning: String) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            iteration,
            terms: terms.clone(),
            accepted,
            reasoning,
        });
        self.last_terms = Some(terms);
        self.last_iteration = iteration;
        self.round += 1;
    }

    fn history_lines(&self) -> Vec<String> {
        self.history.iter().map(ToString::to_string).collect()
    }

    fn expect_phase(&self, phase: NegotiationPhase, input: &str) -> Result<(), TurnError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(self.protocol_error(ProtocolError::InvalidTransition {
                from: self.phase.as_str().to_string(),
                input: input.to_string(),
            }))
        }
    }

    fn protocol_error(&self, source: ProtocolError) -> TurnError {
        warn!(role = %self.role(), phase = self.phase.as_str(), error = %source, "Protocol violation");
        TurnError::Protocol {
            role: self.role(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ActorLimits;
    use crate::provider::{ScriptedProvider, ScriptedReply};
    use crate::quantity::Quantity;

    fn client_policy(provider: Arc<ScriptedProvider>, max_round: u32) -> NegotiationPolicy {
        NegotiationPolicy::new(
            RoleProfile::client(ActorLimits::new("1500 eur", "1 mes")),
            provider,
            max_round,
        )
    }

    fn developer_policy(provider: Arc<ScriptedProvider>, max_round: u32) -> NegotiationPolicy {
        NegotiationPolicy::new(
            RoleProfile::developer(ActorLimits::new("1200 eur", "3 weeks")),
            provider,
            max_round,
        )
    }

    fn initial() -> Message {
        Message::InitialDescription(InitialDescription {
            description: "todo app".into(),
        })
    }

    fn dev_offer(iteration: u32, budget: &str, accepted: bool) -> Offer {
        Offer {
            application_description: "todo app".into(),
            client_time: "3 weeks".into(),
            client_budget: "900 eur".into(),
            developer_time: "5 weeks".into(),
            developer_budget: budget.into(),
            iteration,
            accepted,
            sender: Role::Developer,
            reasoning: "scope".into(),
        }
    }

    fn decide(time: &str, budget: &str, accepted: bool) -> ScriptedReply {
        ScriptedReply::Decide(Decision::new(time, budget, accepted, "because"))
    }

    #[tokio::test]
    async fn test_client_opening_publishes_application_description() {
        let provider = Arc::new(ScriptedProvider::new([decide("3 weeks", "850 eur", true)]));
        let mut policy = client_policy(provider.clone(), 5);

        let outcome = policy.handle(initial()).await.unwrap();
        match outcome {
            TurnOutcome::Publish(Message::ApplicationDescription(app)) => {
                assert_eq!(app.client_budget, "850 eur");
                assert_eq!(app.content, "todo app");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(policy.phase(), NegotiationPhase::Proposed);
        assert_eq!(policy.round(), 1);

        let request = &provider.requests()[0];
        let anchor = request.context.anchor.as_ref().unwrap();
        let amount = anchor.budget.parse::<Quantity>().unwrap().amount;
        assert!((750.0..=900.0).contains(&amount));
        assert!(request.system_prompt.contains("1500 eur"));
    }

    #[tokio::test]
    async fn test_developer_opening_is_iteration_one() {
        let provider = Arc::new(ScriptedProvider::new([decide("6 weeks", "2100 eur", true)]));
        let mut policy = developer_policy(provider, 5);

        let outcome = policy
            .handle(Message::ApplicationDescription(ApplicationDescription {
                content: "todo app".into(),
                client_time: "2 weeks".into(),
                client_budget: "800 eur".into(),
            }))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Publish(Message::NegotiationOffer(offer)) => {
                assert_eq!(offer.iteration, 1);
                assert_eq!(offer.sender, Role::Developer);
                assert!(!offer.accepted, "opening never accepts");
                assert_eq!(offer.client_budget, "800 eur");
                assert_eq!(offer.developer_budget, "2100 eur");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_client_counter_is_clamped_to_ceiling() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("3 weeks", "900 eur", false),
            decide("5 weeks", "1800 eur", false),
        ]));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let outcome = policy
            .handle(Message::NegotiationOffer(dev_offer(1, "2100 eur", false)))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Publish(Message::NegotiationOffer(offer)) => {
                assert_eq!(offer.iteration, 2);
                assert_eq!(offer.client_budget, "1500 eur");
                assert_eq!(offer.client_time, "1 mes");
                // Developer side copied unchanged
                assert_eq!(offer.developer_budget, "2100 eur");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(policy.phase(), NegotiationPhase::Countered);
    }

    #[tokio::test]
    async fn test_developer_counter_is_clamped_to_floor() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("6 weeks", "2100 eur", false),
            decide("2 weeks", "1000 eur", false),
        ]));
        let mut policy = developer_policy(provider, 5);
        policy
            .handle(Message::ApplicationDescription(ApplicationDescription {
                content: "todo app".into(),
                client_time: "2 weeks".into(),
                client_budget: "800 eur".into(),
            }))
            .await
            .unwrap();

        let client_offer = Offer {
            sender: Role::Client,
            iteration: 2,
            ..dev_offer(2, "2100 eur", false)
        };
        let outcome = policy
            .handle(Message::NegotiationOffer(client_offer))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Publish(Message::NegotiationOffer(offer)) => {
                assert_eq!(offer.iteration, 3);
                assert_eq!(offer.developer_budget, "1200 eur");
                assert_eq!(offer.developer_time, "3 weeks");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_accept_produces_agreement_on_counterpart_terms() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("3 weeks", "900 eur", false),
            decide("4 weeks", "1400 eur", true),
        ]));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let offer = Offer {
            developer_time: "4 weeks".into(),
            ..dev_offer(1, "1400 eur", false)
        };
        let outcome = policy.handle(Message::NegotiationOffer(offer)).await.unwrap();

        match outcome {
            TurnOutcome::Agreed(agreement) => {
                assert_eq!(agreement.agreed_budget, "1400 eur");
                assert_eq!(agreement.agreed_time, "4 weeks");
                assert_eq!(agreement.accepted_by, Role::Client);
                assert_eq!(agreement.total_iterations, 2);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(policy.is_terminal());
    }

    #[tokio::test]
    async fn test_client_acceptance_above_ceiling_becomes_counter() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("3 weeks", "900 eur", false),
            decide("10 weeks", "2100 eur", true),
        ]));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let offer = Offer {
            developer_time: "10 weeks".into(),
            ..dev_offer(1, "2100 eur", false)
        };
        let outcome = policy.handle(Message::NegotiationOffer(offer)).await.unwrap();

        match outcome {
            TurnOutcome::Publish(Message::NegotiationOffer(counter)) => {
                assert_eq!(counter.iteration, 2);
                assert!(!counter.accepted);
                assert_eq!(counter.client_budget, "1500 eur");
                assert_eq!(counter.client_time, "1 mes");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(policy.phase(), NegotiationPhase::Countered);
    }

    #[tokio::test]
    async fn test_developer_acceptance_below_floor_becomes_counter() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("6 weeks", "2100 eur", false),
            decide("3 weeks", "900 eur", true),
        ]));
        let mut policy = developer_policy(provider, 5);
        policy
            .handle(Message::ApplicationDescription(ApplicationDescription {
                content: "todo app".into(),
                client_time: "3 weeks".into(),
                client_budget: "900 eur".into(),
            }))
            .await
            .unwrap();

        let client_offer = Offer {
            sender: Role::Client,
            ..dev_offer(2, "2100 eur", false)
        };
        let outcome = policy
            .handle(Message::NegotiationOffer(client_offer))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Publish(Message::NegotiationOffer(counter)) => {
                assert_eq!(counter.iteration, 3);
                assert!(!counter.accepted);
                assert_eq!(counter.developer_budget, "1200 eur");
                assert_eq!(counter.developer_time, "3 weeks");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert!(!policy.is_terminal());
    }

    #[tokio::test]
    async fn test_inbound_acceptance_ends_without_provider_call() {
        let provider = Arc::new(ScriptedProvider::new([decide("3 weeks", "900 eur", false)]));
        let mut policy = client_policy(provider.clone(), 5);
        policy.handle(initial()).await.unwrap();

        let outcome = policy
            .handle(Message::NegotiationOffer(dev_offer(1, "2100 eur", true)))
            .await
            .unwrap();

        match outcome {
            TurnOutcome::Agreed(agreement) => {
                assert_eq!(agreement.agreed_budget, "900 eur");
                assert_eq!(agreement.accepted_by, Role::Developer);
                assert_eq!(agreement.total_iterations, 1);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_limit_exceeded_stops_without_provider_call() {
        let provider = Arc::new(ScriptedProvider::new([decide("3 weeks", "900 eur", false)]));
        let mut policy = client_policy(provider.clone(), 0);
        policy.handle(initial()).await.unwrap();

        let outcome = policy
            .handle(Message::NegotiationOffer(dev_offer(1, "2100 eur", false)))
            .await
            .unwrap();

        assert!(matches!(outcome, TurnOutcome::LimitReached { iteration: 1, .. }));
        assert_eq!(policy.phase(), NegotiationPhase::TerminatedByLimit);
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_out_of_sequence_offer_is_rejected() {
        let provider = Arc::new(ScriptedProvider::always(Decision::new("3 weeks", "900 eur", false, "x")));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let err = policy
            .handle(Message::NegotiationOffer(dev_offer(4, "2100 eur", false)))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            TurnError::Protocol {
                source: ProtocolError::OutOfSequence { expected: 1, got: 4 },
                ..
            }
        ));
        assert_eq!(policy.phase(), NegotiationPhase::Failed);
    }

    #[tokio::test]
    async fn test_own_offer_is_rejected() {
        let provider = Arc::new(ScriptedProvider::always(Decision::new("3 weeks", "900 eur", false, "x")));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let own = Offer {
            sender: Role::Client,
            ..dev_offer(1, "2100 eur", false)
        };
        let err = policy.handle(Message::NegotiationOffer(own)).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::Protocol {
                source: ProtocolError::OwnOffer(Role::Client),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_opening_message_for_role() {
        let provider = Arc::new(ScriptedProvider::new([]));
        let mut policy = developer_policy(provider, 5);
        let err = policy.handle(initial()).await.unwrap_err();
        assert_eq!(err.role(), Role::Developer);
        assert!(matches!(err, TurnError::Protocol { .. }));
    }

    #[tokio::test]
    async fn test_provider_failure_names_iteration() {
        let provider = Arc::new(ScriptedProvider::new([
            decide("3 weeks", "900 eur", false),
            ScriptedReply::Fail(ProviderError::Request("connection reset".into())),
        ]));
        let mut policy = client_policy(provider, 5);
        policy.handle(initial()).await.unwrap();

        let err = policy
            .handle(Message::NegotiationOffer(dev_offer(1, "2100 eur", false)))
            .await
            .unwrap_err();
        match err {
            TurnError::Provider { role, iteration, .. } => {
                assert_eq!(role, Role::Client);
                assert_eq!(iteration, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_provider_timeout_is_failure() {
        let provider = Arc::new(ScriptedProvider::new([ScriptedReply::Delayed(
            Duration::from_secs(5),
            Decision::new("3 weeks", "900 eur", false, "slow"),
        )]));
        let mut policy = client_policy(provider, 5).with_provider_timeout(Duration::from_millis(20));

        let err = policy.handle(initial()).await.unwrap_err();
        assert!(matches!(
            err,
            TurnError::Provider {
                source: ProviderError::Timeout(_),
                iteration: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let provider = Arc::new(ScriptedProvider::always(Decision::new("3 weeks", "900 eur", false, "x")));
        let mut policy = client_policy(provider.clone(), 50);
        policy.handle(initial()).await.unwrap();

        for i in 0..7 {
            let iteration = 1 + 2 * i;
            policy
                .handle(Message::NegotiationOffer(dev_offer(iteration, "2100 eur", false)))
                .await
                .unwrap();
        }

        assert_eq!(policy.round(), 8);
        assert_eq!(policy.history().count(), HISTORY_LIMIT);
        assert_eq!(policy.history().last().unwrap().iteration, 14);
        assert_eq!(provider.requests().last().unwrap().history.len(), HISTORY_LIMIT);
    }
}
