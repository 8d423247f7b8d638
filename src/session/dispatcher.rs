// session/dispatcher.rs - Session driver

use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::actor::{ActorHandle, ActorReply, NegotiatorActor, INBOX_CAPACITY};
use crate::message::{InitialDescription, Message, Role};
use crate::observability::{
    record_offer_published, record_session_finished, record_session_started, EventKind, EventSink,
    SessionEvent, TracingSink,
};
use crate::protocol::{NegotiationPolicy, RoleProfile, TurnError};
use crate::provider::ReasoningProvider;

use super::{SessionError, SessionOutcome, SessionReport, SessionSettings};

/// Drives one negotiation session from the initial description to its outcome
pub struct Dispatcher {
    session_id: Uuid,
    settings: SessionSettings,
    client_provider: Arc<dyn ReasoningProvider>,
    developer_provider: Arc<dyn ReasoningProvider>,
    sink: Arc<dyn EventSink>,
}

impl Dispatcher {
    pub fn new(
        settings: SessionSettings,
        client_provider: Arc<dyn ReasoningProvider>,
        developer_provider: Arc<dyn ReasoningProvider>,
    ) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            settings,
            client_provider,
            developer_provider,
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the default tracing sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Run the session to completion
    pub async fn run(self) -> Result<SessionReport, SessionError> {
        // Held until the session ends so cancellation never fires
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.drive(cancel_rx).await
    }

    /// Run the session in the background
    pub fn start(self) -> SessionHandle {
        let session_id = self.session_id;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let task = tokio::spawn(self.drive(cancel_rx));
        SessionHandle {
            session_id,
            cancel: cancel_tx,
            task,
        }
    }

    async fn drive(self, cancel: watch::Receiver<bool>) -> Result<SessionReport, SessionError> {
        let span = info_span!("session", session_id = %self.session_id);
        self.drive_inner(cancel).instrument(span).await
    }

    async fn drive_inner(self, mut cancel: watch::Receiver<bool>) -> Result<SessionReport, SessionError> {
        let started_at = Utc::now();
        record_session_started();
        info!(
            description = %self.settings.description,
            max_round = self.settings.max_round,
            "Session started"
        );

        let (outbox, mut replies) = mpsc::channel(INBOX_CAPACITY);
        let client = NegotiatorActor::spawn(
            self.policy(RoleProfile::client(self.settings.client_limits.clone()), &self.client_provider),
            outbox.clone(),
        );
        let developer = NegotiatorActor::spawn(
            self.policy(
                RoleProfile::developer(self.settings.developer_limits.clone()),
                &self.developer_provider,
            ),
            outbox,
        );

        let deadline = self.settings.session_timeout.map(|t| Instant::now() + t);
        let timeout = async move {
            match deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(timeout);

        let mut transcript = Vec::new();
        let initial = Message::InitialDescription(InitialDescription {
            description: self.settings.description.clone(),
        });

        let outcome = if !route(&client, &developer, initial).await {
            SessionOutcome::Aborted {
                reason: "client stopped before the session started".into(),
            }
        } else {
            loop {
                let reply = tokio::select! {
                    biased;
                    Ok(()) = cancel.changed() => {
                        break SessionOutcome::Aborted { reason: "cancelled".into() };
                    }
                    _ = &mut timeout => {
                        break SessionOutcome::Aborted {
                            reason: format!(
                                "session timeout after {:?}",
                                self.settings.session_timeout.unwrap_or_default()
                            ),
                        };
                    }
                    reply = replies.recv() => reply,
                };

                match reply {
                    Some(ActorReply::Publish { from, message }) => {
                        record_offer_published(from, message.kind());
                        if let Some(kind) = turn_event(from, &message) {
                            self.emit(kind);
                        }
                        transcript.push(message.clone());

                        if !route(&client, &developer, message).await {
                            break SessionOutcome::Aborted {
                                reason: format!("{} stopped unexpectedly", from.counterpart()),
                            };
                        }
                    }
                    Some(ActorReply::Agreed(agreement)) => break SessionOutcome::Agreement(agreement),
                    Some(ActorReply::LimitReached {
                        role,
                        iteration,
                        last_offer,
                    }) => {
                        break SessionOutcome::LimitExceeded {
                            role,
                            iteration,
                            last_offer,
                        };
                    }
                    Some(ActorReply::Failed(error)) => break failure_outcome(error),
                    None => {
                        break SessionOutcome::Aborted {
                            reason: "negotiators stopped without an outcome".into(),
                        };
                    }
                }
            }
        };

        let aborted = matches!(outcome, SessionOutcome::Aborted { .. });
        for actor in [client, developer] {
            let role = actor.role();
            if aborted {
                actor.abort();
            }
            match actor.shutdown().await {
                Ok(reason) => debug!(role = %role, reason = ?reason, "Negotiator joined"),
                Err(e) if e.is_cancelled() => debug!(role = %role, "Negotiator cancelled"),
                Err(e) => return Err(SessionError::Join(e)),
            }
        }

        self.emit(outcome.to_event(self.settings.max_round));

        let report = SessionReport {
            session_id: self.session_id,
            outcome,
            transcript,
            started_at,
            finished_at: Utc::now(),
        };
        record_session_finished(report.outcome.label(), report.iterations());

        if report.outcome.is_failure() {
            warn!(outcome = report.outcome.label(), "Session finished");
        } else {
            info!(
                outcome = report.outcome.label(),
                iterations = report.iterations(),
                "Session finished"
            );
        }

        Ok(report)
    }

    fn policy(&self, profile: RoleProfile, provider: &Arc<dyn ReasoningProvider>) -> NegotiationPolicy {
        NegotiationPolicy::new(profile, Arc::clone(provider), self.settings.max_round)
            .with_provider_timeout(self.settings.provider_timeout)
    }

    fn emit(&self, kind: EventKind) {
        self.sink.emit(&SessionEvent::new(self.session_id, kind));
    }
}

/// Deliver a message to the subscriber of its topic
async fn route(client: &ActorHandle, developer: &ActorHandle, message: Message) -> bool {
    let target = match message.topic().subscriber() {
        Role::Client => client,
        Role::Developer => developer,
    };
    debug!(
        kind = message.kind(),
        topic = message.topic().as_str(),
        iteration = message.iteration(),
        "Routing message"
    );
    target.deliver(message).await
}

fn turn_event(from: Role, message: &Message) -> Option<EventKind> {
    match message {
        Message::ApplicationDescription(app) => Some(EventKind::TurnCompleted {
            iteration: 0,
            sender: from,
            time: app.client_time.clone(),
            budget: app.client_budget.clone(),
            accepted: false,
            reasoning: String::new(),
        }),
        Message::NegotiationOffer(offer) => {
            let terms = offer.sender_terms();
            Some(EventKind::TurnCompleted {
                iteration: offer.iteration,
                sender: offer.sender,
                time: terms.time,
                budget: terms.budget,
                accepted: offer.accepted,
                reasoning: offer.reasoning.clone(),
            })
        }
        Message::InitialDescription(_) => None,
    }
}

fn failure_outcome(error: TurnError) -> SessionOutcome {
    match error {
        TurnError::Provider { role, iteration, source } => SessionOutcome::ProviderFailure {
            role,
            iteration,
            reason: source.to_string(),
        },
        TurnError::Protocol { role, source } => SessionOutcome::ProtocolViolation {
            role,
            reason: source.to_string(),
        },
    }
}

/// Handle to a session running in the background
pub struct SessionHandle {
    session_id: Uuid,
    cancel: watch::Sender<bool>,
    task: JoinHandle<Result<SessionReport, SessionError>>,
}

impl SessionHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Ask the session to stop; it reports `Aborted`
    pub fn abort(&self) {
        // Fails only when the session already finished
        let _ = self.cancel.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the session report
    pub async fn wait(self) -> Result<SessionReport, SessionError> {
        self.task.await?
    }
}

/// Run several isolated sessions concurrently
pub async fn run_many(dispatchers: Vec<Dispatcher>) -> Vec<Result<SessionReport, SessionError>> {
    info!(sessions = dispatchers.len(), "Running sessions");
    join_all(dispatchers.into_iter().map(Dispatcher::run)).await
}
