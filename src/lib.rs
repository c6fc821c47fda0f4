//! Ring Diffie-Hellman
//!
//! This library simulates an N-party group key agreement built from chained
//! modular exponentiation around a ring of participants.
//!
//! ## Overview
//!
//! Participants share nothing but a broadcast [`Medium`]. They
//! discover each other, sort the identities they have seen into a ring, and
//! pass partially folded values `g^(x_1 x_2 ... x_k) mod p` to their ring
//! successor until a value contains every participant's exponent.
//!
//! ## Key Components
//!
//! - **Primitives**: [`modexp::modpow`], the random integer source, and the
//!   [`DhGroup`] parameter table
//! - **Network**: envelopes, the JSON codec, the medium and host sets
//! - **Participant**: discovery and key-exchange handlers, one frame per tick
//! - **Simulation**: the scheduler loop with a quiescence watchdog
//!
//! ## Example
//!
//! ```rust
//! use ring_dh::{GroupSource, Simulation, SimulationConfig};
//!
//! let config = SimulationConfig {
//!     participants: 3,
//!     group: GroupSource::Modp { id: 1 },
//!     exponent_bits: 64,
//!     seed: Some(7),
//!     ..SimulationConfig::default()
//! };
//!
//! let mut sim = Simulation::new(config)?;
//! sim.run()?;
//! assert!(sim.agreed_key().is_some());
//! # Ok::<(), ring_dh::DhError>(())
//! ```

pub mod error;
pub mod group;
pub mod modexp;
pub mod network;
pub mod participant;
pub mod security;
pub mod session;
pub mod simulation;

pub use error::DhError;
pub use group::{DhGroup, GroupSource, GroupTable};
pub use network::{Envelope, Medium, Message, ParticipantId, SessionId};
pub use participant::{Discard, Participant, Tick};
pub use session::{SessionKeyAccumulator, SessionState};
pub use simulation::{ParticipantSummary, RunReport, Simulation, SimulationConfig};
