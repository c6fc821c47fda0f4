//! Per-session key accumulation state

use crate::network::{ParticipantId, SessionId};
use crate::security::fingerprint;
use num_bigint::BigUint;
use std::collections::BTreeSet;
use std::fmt;

/// Key-exchange lifecycle of one participant.
///
/// `Idle → AwaitingSessionId → Exchanging → Complete`, with `Compromised`
/// reachable from `Exchanging` and terminal for that session. Adopting a new
/// session id restarts from `Exchanging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session yet
    Idle,
    /// A session id is settled but the local contribution is not seeded
    AwaitingSessionId,
    /// Seeded and folding forwarded values
    Exchanging,
    /// The accumulator covers every known host
    Complete,
    /// A value that already contained this participant came back around
    Compromised,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::AwaitingSessionId => "awaiting-session-id",
            SessionState::Exchanging => "exchanging",
            SessionState::Complete => "complete",
            SessionState::Compromised => "compromised",
        };
        f.write_str(name)
    }
}

/// The partially folded value plus the ids already folded into it.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionKeyAccumulator {
    session_id: SessionId,
    hosts_included: BTreeSet<ParticipantId>,
    value: Option<BigUint>,
}

impl SessionKeyAccumulator {
    /// Accumulator for a settled session before the local contribution exists
    pub fn pending(session_id: SessionId) -> Self {
        Self {
            session_id,
            hosts_included: BTreeSet::new(),
            value: None,
        }
    }

    /// Accumulator holding only the owner's public value `g^x mod p`
    pub fn seeded(session_id: SessionId, owner: ParticipantId, public_value: BigUint) -> Self {
        let mut hosts_included = BTreeSet::new();
        hosts_included.insert(owner);
        Self {
            session_id,
            hosts_included,
            value: Some(public_value),
        }
    }

    /// Accumulator after `owner` folded its exponent into an incoming chain
    pub fn folded(
        session_id: SessionId,
        incoming: &[ParticipantId],
        owner: ParticipantId,
        value: BigUint,
    ) -> Self {
        let mut hosts_included: BTreeSet<ParticipantId> = incoming.iter().cloned().collect();
        hosts_included.insert(owner);
        Self {
            session_id,
            hosts_included,
            value: Some(value),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn hosts_included(&self) -> &BTreeSet<ParticipantId> {
        &self.hosts_included
    }

    /// Sorted ids, as carried in a forward
    pub fn hosts_vec(&self) -> Vec<ParticipantId> {
        self.hosts_included.iter().cloned().collect()
    }

    pub fn value(&self) -> Option<&BigUint> {
        self.value.as_ref()
    }
}

// A complete accumulator is the session secret; only its fingerprint is printed.
impl fmt::Debug for SessionKeyAccumulator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKeyAccumulator")
            .field("session_id", &self.session_id)
            .field("hosts_included", &self.hosts_included)
            .field("value", &self.value.as_ref().map(fingerprint))
            .finish()
    }
}
