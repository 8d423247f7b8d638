// protocol/mod.rs - Negotiation Protocol

//! Negotiation protocol state machine.
//!
//! Both parties run the same [`NegotiationPolicy`]; a [`RoleProfile`] makes
//! one of them the client (budget ceiling) and the other the developer
//! (budget floor). Each inbound message yields a [`TurnOutcome`]:
//!
//! - `Publish` - send the next message to the counterpart
//! - `Agreed` - one side accepted, nothing more is sent
//! - `LimitReached` - the inbound offer exceeded `max_round`
//!
//! Provider and protocol failures surface as [`TurnError`] and end the session.
//!
//! # Example
//!
//! ```ignore
//! use haggle_agents::protocol::*;
//!
//! let profile = RoleProfile::client(ActorLimits::new("1500 eur", "1 mes"));
//! let mut policy = NegotiationPolicy::new(profile, provider, 5);
//!
//! match policy.handle(message).await? {
//!     TurnOutcome::Publish(next) => { /* route to the developer */ }
//!     TurnOutcome::Agreed(agreement) => { /* done! */ }
//!     TurnOutcome::LimitReached { iteration, .. } => { /* out of rounds */ }
//! }
//! ```

mod policy;
mod prompts;
mod role;
mod state_machine;

pub use policy::{HistoryEntry, NegotiationPolicy, HISTORY_LIMIT};
pub use role::{ActorLimits, RoleProfile};
pub use state_machine::{NegotiationPhase, ProtocolError, TurnError, TurnOutcome};
