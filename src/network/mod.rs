//! Simulated network layer
//!
//! ```text
//!  participant ──send──▶ Medium ──frame──▶ Inbox (every other participant)
//!                                            │
//!                         process_one() ◀────┘  decode, filter on destination
//! ```
//!
//! Participants never talk to each other directly. Unicast is simulated by
//! addressing an envelope and letting every other receiver discard it.

pub mod codec;
pub mod hosts;
pub mod medium;
pub mod messages;

pub use codec::Frame;
pub use hosts::HostSet;
pub use medium::{Inbox, Medium};
pub use messages::{Envelope, Message, MessageType, ParticipantId, SessionId};
