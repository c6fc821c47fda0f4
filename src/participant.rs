//! Participant protocol state machine.
//!
//! A participant reacts to one inbound frame per [`Participant::process_one`]
//! call. It runs two sub-protocols over the shared [`Medium`]:
//!   * Discovery (`Ping`, `Pong`, `Announce`, `HostsRequest`) grows the
//!     known host set, which defines the ring order
//!   * Key exchange (`NewSessionRequest`, `PublicKeyForward`) settles a
//!     session id, seeds `g^x mod p` and folds every forwarded value with the
//!     local exponent before passing it to the ring successor
//!
//! Ring order is read from the host set at the moment of use. Participants
//! that observed different host sets compute different rings, and the
//! exchange can then stall or cycle; the driver watchdog reports this.
//!
//! Each seeded chain completes at the predecessor of its originator, so every
//! participant ends with the secret of the chain that reached it last. On a
//! converged ring these agree; nothing here enforces that they do.

use crate::error::DhError;
use crate::group::DhGroup;
use crate::modexp::random_bits;
use crate::network::codec;
use crate::network::{
    Envelope, HostSet, Inbox, Medium, Message, ParticipantId, SessionId,
};
use crate::security::{fingerprint, PrivateExponent};
use crate::session::{SessionKeyAccumulator, SessionState};
use num_bigint::BigUint;
use rand::rngs::StdRng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of one [`Participant::process_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    /// The inbound queue was empty
    Empty,
    /// A message of the given kind was handled
    Handled(&'static str),
    /// The message was dropped without changing protocol state
    Discarded(Discard),
}

/// Why a message was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Discard {
    /// Addressed to another participant
    NotAddressed,
    /// Carries this participant's own id as source
    OwnEcho,
    /// Session request for the session already held
    AlreadyAdopted,
    /// Forward for a session other than the active one
    SessionMismatch,
    /// Forward carrying less progress than the local accumulator
    StaleChain,
    /// Forward whose chain already contains this participant
    KeyCompromised,
    /// Forward for a session already marked compromised
    AfterCompromise,
    /// Forward received before the local contribution was seeded
    NotSeeded,
}

/// One member of the key agreement.
pub struct Participant {
    id: ParticipantId,
    medium: Arc<Medium>,
    inbox: Arc<Inbox>,
    group: Arc<DhGroup>,
    rng: StdRng,
    exponent_bits: u64,

    known_hosts: HostSet,
    private_exponent: Option<PrivateExponent>,
    /// Cached `g^x mod p`; cleared whenever the exponent changes
    public_value: Option<BigUint>,
    session_id: Option<SessionId>,
    accumulator: Option<SessionKeyAccumulator>,
    state: SessionState,

    sequence: u64,
    tick_count: u64,
    sent: BTreeMap<&'static str, u64>,
}

impl Participant {
    /// Creates a participant and registers it with `medium`.
    ///
    /// Nothing is sent until [`Participant::join`].
    pub fn new(
        id: ParticipantId,
        medium: Arc<Medium>,
        group: Arc<DhGroup>,
        rng: StdRng,
        exponent_bits: u64,
    ) -> Self {
        let inbox = medium.register(&id);
        info!(participant = %id, "initialized");
        Self {
            known_hosts: HostSet::new(id.clone()),
            id,
            medium,
            inbox,
            group,
            rng,
            exponent_bits,
            private_exponent: None,
            public_value: None,
            session_id: None,
            accumulator: None,
            state: SessionState::Idle,
            sequence: 0,
            tick_count: 0,
            sent: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &ParticipantId {
        &self.id
    }

    pub fn known_hosts(&self) -> &HostSet {
        &self.known_hosts
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    pub fn accumulator(&self) -> Option<&SessionKeyAccumulator> {
        self.accumulator.as_ref()
    }

    /// The completed session secret, available only in `Complete`
    pub fn session_key(&self) -> Option<&BigUint> {
        match self.state {
            SessionState::Complete => self.accumulator.as_ref().and_then(|acc| acc.value()),
            _ => None,
        }
    }

    /// Number of `process_one` calls so far
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Frames waiting in the inbound queue
    pub fn pending(&self) -> usize {
        self.inbox.len()
    }

    pub fn is_drained(&self) -> bool {
        self.inbox.is_empty()
    }

    /// How many messages of `kind` (e.g. `"ping"`) this participant has sent
    pub fn sent(&self, kind: &str) -> u64 {
        self.sent.get(kind).copied().unwrap_or(0)
    }

    /// `g^x mod p` for the current exponent, computed once per exponent.
    pub fn public_value(&mut self) -> Result<Option<&BigUint>, DhError> {
        if self.public_value.is_none() {
            if let Some(exponent) = &self.private_exponent {
                self.public_value = Some(self.group.public_value(exponent.expose_secret())?);
            }
        }
        Ok(self.public_value.as_ref())
    }

    /// Announces this participant and probes for live peers.
    pub fn join(&mut self) -> Result<(), DhError> {
        self.broadcast(Message::Announce)?;
        self.broadcast(Message::Ping)
    }

    /// Asks every peer missing from the local host set to announce itself.
    pub fn request_hosts(&mut self) -> Result<(), DhError> {
        let known_hosts = self.known_hosts.to_vec();
        self.broadcast(Message::HostsRequest { known_hosts })
    }

    /// Starts a key exchange under a freshly minted session id.
    ///
    /// The initiator settles its own candidate at once: it seeds its
    /// contribution and forwards it in the same call.
    pub fn begin_session(&mut self) -> Result<SessionId, DhError> {
        let session_id = self.mint_session_id(None);
        info!(participant = %self.id, session = %session_id, "initiating session");
        self.propose(session_id.clone())?;
        Ok(session_id)
    }

    /// Dequeues and fully handles at most one frame.
    ///
    /// Sends made while handling land in other inboxes and are seen on later
    /// ticks.
    ///
    /// # Errors
    /// Fails on frames that do not decode (including unknown message types)
    /// and on arithmetic errors from the group parameters. Routine protocol
    /// events are reported as [`Tick::Discarded`].
    pub fn process_one(&mut self) -> Result<Tick, DhError> {
        self.tick_count += 1;
        let Some(frame) = self.inbox.pop() else {
            return Ok(Tick::Empty);
        };

        let envelope = codec::decode(&frame).map_err(|e| {
            warn!(participant = %self.id, error = %e, "rejected inbound frame");
            e
        })?;
        self.handle(envelope)
    }

    fn handle(&mut self, envelope: Envelope) -> Result<Tick, DhError> {
        if !envelope.is_for(&self.id) {
            return Ok(Tick::Discarded(Discard::NotAddressed));
        }
        if envelope.source() == &self.id {
            return Ok(Tick::Discarded(Discard::OwnEcho));
        }

        let kind = envelope.message().kind();
        debug!(
            participant = %self.id,
            source = %envelope.source(),
            class = ?envelope.message().message_type(),
            kind,
            session = ?envelope.session_id(),
            seq = envelope.sequence_hint(),
            "received"
        );

        let source = envelope.source().clone();
        match envelope.into_message() {
            Message::Ping => {
                self.learn(source);
                self.broadcast(Message::Pong)?;
            }
            Message::Pong | Message::Announce => {
                self.learn(source);
            }
            Message::HostsRequest { known_hosts } => {
                self.learn(source);
                if !known_hosts.contains(&self.id) {
                    self.broadcast(Message::Announce)?;
                }
            }
            Message::NewSessionRequest {
                session_id,
                known_hosts,
            } => return self.on_session_request(source, session_id, known_hosts),
            Message::PublicKeyForward {
                session_id,
                hosts_included,
                value,
            } => return self.on_forward(source, session_id, hosts_included, value),
        }

        Ok(Tick::Handled(kind))
    }

    fn learn(&mut self, host: ParticipantId) {
        if self.known_hosts.insert(host.clone()) {
            debug!(
                participant = %self.id,
                host = %host,
                known = self.known_hosts.len(),
                "discovered host"
            );
        }
    }

    fn on_session_request(
        &mut self,
        source: ParticipantId,
        session_id: SessionId,
        known_hosts: Vec<ParticipantId>,
    ) -> Result<Tick, DhError> {
        if !known_hosts.contains(&self.id) {
            // The requester does not account for us: counter-propose.
            let own = self.mint_session_id(Some(&session_id));
            info!(
                participant = %self.id,
                source = %source,
                rejected = %session_id,
                session = %own,
                "absent from requester's host set; proposing own session"
            );
            self.propose(own)?;
            return Ok(Tick::Handled("newSessionRequest"));
        }

        if self.session_id.as_ref() == Some(&session_id) {
            return Ok(Tick::Discarded(Discard::AlreadyAdopted));
        }

        info!(participant = %self.id, source = %source, session = %session_id, "adopting session");
        self.settle(session_id)?;
        Ok(Tick::Handled("newSessionRequest"))
    }

    fn on_forward(
        &mut self,
        source: ParticipantId,
        session_id: SessionId,
        hosts_included: Vec<ParticipantId>,
        value: BigUint,
    ) -> Result<Tick, DhError> {
        if self.session_id.as_ref() != Some(&session_id) {
            debug!(participant = %self.id, source = %source, session = %session_id, "forward for another session");
            return Ok(Tick::Discarded(Discard::SessionMismatch));
        }

        if hosts_included.contains(&self.id) {
            self.state = SessionState::Compromised;
            warn!(
                participant = %self.id,
                source = %source,
                session = %session_id,
                hosts = hosts_included.len(),
                "folded value came back around in the clear; session compromised"
            );
            return Ok(Tick::Discarded(Discard::KeyCompromised));
        }

        if self.state == SessionState::Compromised {
            return Ok(Tick::Discarded(Discard::AfterCompromise));
        }

        if let Some(acc) = &self.accumulator {
            let held = self.known_hosts.overlap(acc.hosts_included());
            let incoming = self.known_hosts.overlap(&hosts_included);
            if acc.session_id() == &session_id && held > incoming {
                debug!(participant = %self.id, source = %source, held, incoming, "stale chain");
                return Ok(Tick::Discarded(Discard::StaleChain));
            }
        }

        let Some(exponent) = &self.private_exponent else {
            return Ok(Tick::Discarded(Discard::NotSeeded));
        };
        let folded = self.group.fold(&value, exponent.expose_secret())?;
        self.accumulator = Some(SessionKeyAccumulator::folded(
            session_id,
            &hosts_included,
            self.id.clone(),
            folded,
        ));

        self.advance()?;
        Ok(Tick::Handled("publicKeyForward"))
    }

    /// Broadcasts a session request for `session_id` and settles on it.
    fn propose(&mut self, session_id: SessionId) -> Result<(), DhError> {
        let known_hosts = self.known_hosts.to_vec();
        self.session_id = Some(session_id.clone());
        self.state = SessionState::AwaitingSessionId;
        self.broadcast(Message::NewSessionRequest {
            session_id: session_id.clone(),
            known_hosts,
        })?;
        self.settle(session_id)
    }

    /// Adopts `session_id`: fresh exponent, seeded accumulator, first forward.
    fn settle(&mut self, session_id: SessionId) -> Result<(), DhError> {
        self.session_id = Some(session_id.clone());
        self.accumulator = Some(SessionKeyAccumulator::pending(session_id.clone()));
        self.state = SessionState::AwaitingSessionId;

        self.private_exponent = Some(PrivateExponent::new(random_bits(
            &mut self.rng,
            self.exponent_bits,
        )?));
        self.public_value = None;

        let public_value = self
            .public_value()?
            .cloned()
            .ok_or_else(|| DhError::InvalidParameter("private exponent missing".to_string()))?;
        self.accumulator = Some(SessionKeyAccumulator::seeded(
            session_id,
            self.id.clone(),
            public_value,
        ));
        self.state = SessionState::Exchanging;

        self.advance()
    }

    /// Completes when the accumulator covers every known host, otherwise
    /// hands it to the ring successor.
    fn advance(&mut self) -> Result<(), DhError> {
        let Some(acc) = &self.accumulator else {
            return Ok(());
        };

        if self.known_hosts.is_exactly(acc.hosts_included()) {
            self.state = SessionState::Complete;
            let key = acc.value().map(fingerprint).unwrap_or_default();
            info!(
                participant = %self.id,
                session = %acc.session_id(),
                hosts = acc.hosts_included().len(),
                key = %key,
                "session key complete"
            );
            return Ok(());
        }

        let Some(next) = self.known_hosts.next_hop().cloned() else {
            return Ok(());
        };
        let Some(value) = acc.value().cloned() else {
            return Ok(());
        };
        let message = Message::PublicKeyForward {
            session_id: acc.session_id().clone(),
            hosts_included: acc.hosts_vec(),
            value,
        };
        self.send_to(next, message)
    }

    /// Random session id distinct from the current one and from `avoid`.
    fn mint_session_id(&mut self, avoid: Option<&SessionId>) -> SessionId {
        loop {
            let candidate = SessionId::random(&mut self.rng);
            if Some(&candidate) != self.session_id.as_ref() && Some(&candidate) != avoid {
                return candidate;
            }
        }
    }

    fn broadcast(&mut self, message: Message) -> Result<(), DhError> {
        let envelope = Envelope::broadcast(self.id.clone(), self.next_sequence(), message);
        self.dispatch(envelope)
    }

    fn send_to(&mut self, destination: ParticipantId, message: Message) -> Result<(), DhError> {
        let envelope =
            Envelope::addressed(self.id.clone(), destination, self.next_sequence(), message);
        self.dispatch(envelope)
    }

    fn dispatch(&mut self, envelope: Envelope) -> Result<(), DhError> {
        *self.sent.entry(envelope.message().kind()).or_default() += 1;
        self.medium.send(&self.id, &envelope)?;
        Ok(())
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.sequence;
        self.sequence += 1;
        seq
    }
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("session_id", &self.session_id)
            .field("known_hosts", &self.known_hosts)
            .field("accumulator", &self.accumulator)
            .field("pending", &self.inbox.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn id(s: &str) -> ParticipantId {
        ParticipantId::from(s)
    }

    fn toy_group() -> Arc<DhGroup> {
        Arc::new(DhGroup::new(BigUint::from(5u32), BigUint::from(23u32)).unwrap())
    }

    fn participant(name: &str, medium: &Arc<Medium>, seed: u64) -> Participant {
        Participant::new(
            id(name),
            Arc::clone(medium),
            toy_group(),
            StdRng::seed_from_u64(seed),
            16,
        )
    }

    /// Decodes everything an observer inbox has collected.
    fn drain(inbox: &Inbox) -> Vec<Envelope> {
        std::iter::from_fn(|| inbox.pop())
            .map(|frame| codec::decode(&frame).unwrap())
            .collect()
    }

    fn inject(medium: &Medium, envelope: Envelope) {
        let source = envelope.source().clone();
        medium.send(&source, &envelope).unwrap();
    }

    #[test]
    fn test_ping_is_answered_with_pong() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        let observer = medium.register(&id("observer"));

        inject(&medium, Envelope::broadcast(id("b"), 0, Message::Ping));
        drain(&observer);

        assert_eq!(a.process_one().unwrap(), Tick::Handled("ping"));
        assert!(a.known_hosts().contains(&id("b")));

        let sent = drain(&observer);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message(), &Message::Pong);
        assert_eq!(a.sent("pong"), 1);
    }

    #[test]
    fn test_pong_and_announce_are_not_answered() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        let observer = medium.register(&id("observer"));

        inject(&medium, Envelope::broadcast(id("b"), 0, Message::Pong));
        inject(&medium, Envelope::broadcast(id("c"), 0, Message::Announce));
        drain(&observer);

        a.process_one().unwrap();
        a.process_one().unwrap();
        assert_eq!(a.known_hosts().to_vec(), vec![id("a"), id("b"), id("c")]);
        assert!(drain(&observer).is_empty());
        assert_eq!(a.process_one().unwrap(), Tick::Empty);
        assert_eq!(a.tick_count(), 3);
    }

    #[test]
    fn test_hosts_request_announces_only_when_missing() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        let observer = medium.register(&id("observer"));

        inject(
            &medium,
            Envelope::broadcast(
                id("b"),
                0,
                Message::HostsRequest {
                    known_hosts: vec![id("a"), id("b")],
                },
            ),
        );
        inject(
            &medium,
            Envelope::broadcast(
                id("c"),
                0,
                Message::HostsRequest {
                    known_hosts: vec![id("c")],
                },
            ),
        );
        drain(&observer);

        a.process_one().unwrap();
        assert!(drain(&observer).is_empty());

        a.process_one().unwrap();
        let sent = drain(&observer);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message(), &Message::Announce);
        assert!(a.known_hosts().contains(&id("c")));
    }

    #[test]
    fn test_envelope_for_someone_else_is_discarded() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);

        inject(&medium, Envelope::addressed(id("b"), id("c"), 0, Message::Ping));
        assert_eq!(
            a.process_one().unwrap(),
            Tick::Discarded(Discard::NotAddressed)
        );
        assert!(!a.known_hosts().contains(&id("b")));
    }

    #[test]
    fn test_unknown_frame_is_an_error() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        a.inbox.push(r#"{"source":"b","sequenceHint":0,"type":"initKeyExchange"}"#.to_string());
        assert!(matches!(a.process_one(), Err(DhError::Codec(_))));
    }

    #[test]
    fn test_single_member_ring_completes_without_forwarding() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        let observer = medium.register(&id("observer"));

        a.begin_session().unwrap();
        let sent = drain(&observer);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].message().kind(), "newSessionRequest");

        assert_eq!(a.state(), SessionState::Complete);
        assert!(a.session_key().is_some());
        assert_eq!(a.sent("publicKeyForward"), 0);
    }

    #[test]
    fn test_public_value_is_cached_per_exponent() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        assert!(a.public_value().unwrap().is_none());

        a.begin_session().unwrap();
        let first = a.public_value().unwrap().cloned().unwrap();
        let expected = toy_group()
            .public_value(a.private_exponent.as_ref().unwrap().expose_secret())
            .unwrap();
        assert_eq!(first, expected);
        assert_eq!(a.accumulator().unwrap().value(), Some(&first));
    }

    #[test]
    fn test_forward_is_folded_and_passed_on() {
        let medium = Arc::new(Medium::new());
        let mut b = participant("b", &medium, 2);
        let observer = medium.register(&id("observer"));

        for host in ["a", "c"] {
            inject(&medium, Envelope::broadcast(id(host), 0, Message::Announce));
        }
        b.process_one().unwrap();
        b.process_one().unwrap();

        let session = SessionId::new("s1");
        inject(
            &medium,
            Envelope::broadcast(
                id("a"),
                1,
                Message::NewSessionRequest {
                    session_id: session.clone(),
                    known_hosts: vec![id("a"), id("b"), id("c")],
                },
            ),
        );
        b.process_one().unwrap();
        assert_eq!(b.session_id(), Some(&session));
        assert_eq!(b.state(), SessionState::Exchanging);

        inject(
            &medium,
            Envelope::addressed(
                id("a"),
                id("b"),
                2,
                Message::PublicKeyForward {
                    session_id: session.clone(),
                    hosts_included: vec![id("a")],
                    value: BigUint::from(8u32),
                },
            ),
        );
        // drops b's own seed forward and the injected frame
        drain(&observer);
        assert_eq!(b.process_one().unwrap(), Tick::Handled("publicKeyForward"));

        let x = b.private_exponent.as_ref().unwrap().expose_secret().clone();
        let expected = BigUint::from(8u32).modpow(&x, &BigUint::from(23u32));
        let acc = b.accumulator().unwrap();
        assert_eq!(acc.hosts_vec(), vec![id("a"), id("b")]);
        assert_eq!(acc.value(), Some(&expected));

        let sent = drain(&observer);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].destination(), Some(&id("c")));
        match sent[0].message() {
            Message::PublicKeyForward {
                hosts_included,
                value,
                ..
            } => {
                assert_eq!(hosts_included, &vec![id("a"), id("b")]);
                assert_eq!(value, &expected);
            }
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn test_forward_for_other_session_is_discarded() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        a.begin_session().unwrap();

        inject(
            &medium,
            Envelope::addressed(
                id("b"),
                id("a"),
                0,
                Message::PublicKeyForward {
                    session_id: SessionId::new("elsewhere"),
                    hosts_included: vec![id("b")],
                    value: BigUint::from(3u32),
                },
            ),
        );
        assert_eq!(
            a.process_one().unwrap(),
            Tick::Discarded(Discard::SessionMismatch)
        );
    }

    #[test]
    fn test_stale_chain_is_ignored() {
        let medium = Arc::new(Medium::new());
        let mut d = participant("d", &medium, 4);
        for host in ["a", "b", "c"] {
            inject(&medium, Envelope::broadcast(id(host), 0, Message::Announce));
            d.process_one().unwrap();
        }
        let session = d.begin_session().unwrap();

        let forward = |hosts: Vec<ParticipantId>, seq| {
            Envelope::addressed(
                id("c"),
                id("d"),
                seq,
                Message::PublicKeyForward {
                    session_id: session.clone(),
                    hosts_included: hosts,
                    value: BigUint::from(4u32),
                },
            )
        };

        inject(&medium, forward(vec![id("b"), id("c")], 0));
        assert_eq!(d.process_one().unwrap(), Tick::Handled("publicKeyForward"));
        let progressed = d.accumulator().unwrap().clone();
        assert_eq!(progressed.hosts_included().len(), 3);

        inject(&medium, forward(vec![id("c")], 1));
        assert_eq!(
            d.process_one().unwrap(),
            Tick::Discarded(Discard::StaleChain)
        );
        assert_eq!(d.accumulator(), Some(&progressed));
    }

    #[test]
    fn test_returning_chain_marks_compromise() {
        let medium = Arc::new(Medium::new());
        let mut a = participant("a", &medium, 1);
        inject(&medium, Envelope::broadcast(id("b"), 0, Message::Announce));
        a.process_one().unwrap();
        let session = a.begin_session().unwrap();
        let forwards_before = a.sent("publicKeyForward");

        let returning = Envelope::addressed(
            id("b"),
            id("a"),
            1,
            Message::PublicKeyForward {
                session_id: session.clone(),
                hosts_included: vec![id("a"), id("b")],
                value: BigUint::from(9u32),
            },
        );
        inject(&medium, returning.clone());
        inject(&medium, returning);

        assert_eq!(
            a.process_one().unwrap(),
            Tick::Discarded(Discard::KeyCompromised)
        );
        assert_eq!(a.state(), SessionState::Compromised);
        assert_eq!(
            a.process_one().unwrap(),
            Tick::Discarded(Discard::KeyCompromised)
        );
        assert_eq!(a.state(), SessionState::Compromised);
        assert!(a.session_key().is_none());
        assert_eq!(a.sent("publicKeyForward"), forwards_before);
    }

    #[test]
    fn test_duplicate_session_request_is_not_reapplied() {
        let medium = Arc::new(Medium::new());
        let mut b = participant("b", &medium, 2);
        let request = Envelope::broadcast(
            id("a"),
            0,
            Message::NewSessionRequest {
                session_id: SessionId::new("s1"),
                known_hosts: vec![id("a"), id("b")],
            },
        );
        inject(&medium, request.clone());
        inject(&medium, request);

        b.process_one().unwrap();
        let seeded = b.accumulator().unwrap().clone();
        assert_eq!(
            b.process_one().unwrap(),
            Tick::Discarded(Discard::AlreadyAdopted)
        );
        assert_eq!(b.accumulator(), Some(&seeded));
    }
}
