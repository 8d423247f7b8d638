// actor/mod.rs - Actor Module

//! Negotiator actors.
//!
//! Each party runs as its own tokio task:
//!
//! - `NegotiatorActor` - Owns a [`NegotiationPolicy`](crate::protocol::NegotiationPolicy)
//!   and processes its inbox sequentially
//! - `ActorHandle` - Dispatcher-side handle used to deliver messages and stop the task
//! - `ActorReply` - One reply per handled message, sent on a shared outbox
//!
//! Actors never talk to each other directly; the session dispatcher routes
//! every published message to the subscriber of its topic.

mod messages;
mod negotiator;

pub use messages::{ActorReply, StopReason};
pub use negotiator::{ActorHandle, NegotiatorActor, INBOX_CAPACITY};
