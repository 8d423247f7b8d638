// actor/messages.rs - Actor mailbox and reply types

use crate::message::{Agreement, Message, Offer, Role};
use crate::protocol::TurnError;

/// What a negotiator reports back after handling one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum ActorReply {
    /// The actor published a message for its counterpart's topic
    Publish { from: Role, message: Message },

    /// The actor closed the negotiation with an agreement
    Agreed(Agreement),

    /// The inbound offer exceeded the round limit
    LimitReached {
        role: Role,
        iteration: u32,
        last_offer: Offer,
    },

    /// The turn failed; the actor has stopped
    Failed(TurnError),
}

impl ActorReply {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActorReply::Publish { .. })
    }
}

/// Why an actor task stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A terminal reply was sent
    Finished,
    /// The inbox was closed by the dispatcher
    InboxClosed,
    /// The dispatcher stopped listening for replies
    OutboxClosed,
}
