// actor/negotiator.rs - Negotiator task

//! A negotiator is an independent tokio task owning one [`NegotiationPolicy`].
//! It reads messages from its inbox one at a time and answers each with
//! exactly one [`ActorReply`] on the shared outbox. Policy state is never
//! visible outside the task.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::message::{Message, Role};
use crate::protocol::{NegotiationPolicy, TurnOutcome};

use super::messages::{ActorReply, StopReason};

/// Inbox capacity per actor
pub const INBOX_CAPACITY: usize = 8;

/// Task wrapping a negotiation policy
pub struct NegotiatorActor {
    policy: NegotiationPolicy,
    inbox: mpsc::Receiver<Message>,
    outbox: mpsc::Sender<ActorReply>,
    handled: u64,
}

impl NegotiatorActor {
    pub fn new(
        policy: NegotiationPolicy,
        inbox: mpsc::Receiver<Message>,
        outbox: mpsc::Sender<ActorReply>,
    ) -> Self {
        Self {
            policy,
            inbox,
            outbox,
            handled: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.policy.role()
    }

    /// Spawn the actor onto the runtime
    pub fn spawn(policy: NegotiationPolicy, outbox: mpsc::Sender<ActorReply>) -> ActorHandle {
        let role = policy.role();
        let (tx, rx) = mpsc::channel(INBOX_CAPACITY);
        let actor = Self::new(policy, rx, outbox);
        let task = tokio::spawn(actor.run());
        ActorHandle { role, inbox: tx, task }
    }

    /// Process messages until a terminal reply or a closed channel
    pub async fn run(mut self) -> StopReason {
        let role = self.role();
        info!(role = %role, "Negotiator started");

        let reason = loop {
            let Some(message) = self.inbox.recv().await else {
                break StopReason::InboxClosed;
            };
            self.handled += 1;
            debug!(role = %role, kind = message.kind(), iteration = message.iteration(), "Message received");

            let reply = match self.policy.handle(message).await {
                Ok(TurnOutcome::Publish(message)) => ActorReply::Publish {
                    from: role,
                    message,
                },
                Ok(TurnOutcome::Agreed(agreement)) => ActorReply::Agreed(agreement),
                Ok(TurnOutcome::LimitReached { iteration, last_offer }) => ActorReply::LimitReached {
                    role,
                    iteration,
                    last_offer,
                },
                Err(error) => {
                    warn!(role = %role, error = %error, "Turn failed");
                    ActorReply::Failed(error)
                }
            };

            let terminal = reply.is_terminal();
            if self.outbox.send(reply).await.is_err() {
                break StopReason::OutboxClosed;
            }
            if terminal {
                break StopReason::Finished;
            }
        };

        info!(
            role = %role,
            handled = self.handled,
            phase = self.policy.phase().as_str(),
            reason = ?reason,
            "Negotiator stopped"
        );
        reason
    }
}

/// Dispatcher-side handle to a running negotiator
pub struct ActorHandle {
    role: Role,
    inbox: mpsc::Sender<Message>,
    task: JoinHandle<StopReason>,
}

impl ActorHandle {
    pub fn role(&self) -> Role {
        self.role
    }

    /// Deliver a message to the actor's inbox.
    ///
    /// Returns false if the actor has already stopped.
    pub async fn deliver(&self, message: Message) -> bool {
        self.inbox.send(message).await.is_ok()
    }

    /// Cancel the task without waiting for it
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Close the inbox and wait for the task to finish
    pub async fn shutdown(self) -> Result<StopReason, tokio::task::JoinError> {
        drop(self.inbox);
        self.task.await
    }
}
