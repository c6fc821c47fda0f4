//! Message types exchanged over the medium

use super::codec::hex_biguint;
use crate::modexp::random_hex;
use num_bigint::BigUint;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Participant identifier.
///
/// Ordered lexicographically; the ring order is the sorted sequence of ids.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Random lowercase hex identity of `bytes` bytes
    pub fn random<R: RngCore + ?Sized>(rng: &mut R, bytes: usize) -> Self {
        Self(random_hex(rng, bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Scopes one key-exchange run.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn random<R: RngCore + ?Sized>(rng: &mut R) -> Self {
        Self(random_hex(rng, 8))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Protocol message body.
///
/// On the wire the variant name is the envelope's `type` field and the
/// variant fields form its `payload`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum Message {
    /// Discovery: liveness probe, answered with `Pong`
    Ping,

    /// Discovery: answer to `Ping`
    Pong,

    /// Discovery: presence announcement, never answered
    Announce,

    /// Discovery: ask peers missing from `known_hosts` to announce themselves
    #[serde(rename_all = "camelCase")]
    HostsRequest { known_hosts: Vec<ParticipantId> },

    /// Key exchange: propose a session id for the given host set
    #[serde(rename_all = "camelCase")]
    NewSessionRequest {
        session_id: SessionId,
        known_hosts: Vec<ParticipantId>,
    },

    /// Key exchange: partially folded value handed to the next ring position
    #[serde(rename_all = "camelCase")]
    PublicKeyForward {
        session_id: SessionId,
        hosts_included: Vec<ParticipantId>,
        #[serde(with = "hex_biguint")]
        value: BigUint,
    },
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::Ping
            | Message::Pong
            | Message::Announce
            | Message::HostsRequest { .. } => MessageType::Discovery,
            Message::NewSessionRequest { .. } | Message::PublicKeyForward { .. } => {
                MessageType::KeyExchange
            }
        }
    }

    /// Short name used in logs
    pub fn kind(&self) -> &'static str {
        match self {
            Message::Ping => "ping",
            Message::Pong => "pong",
            Message::Announce => "announce",
            Message::HostsRequest { .. } => "hostsRequest",
            Message::NewSessionRequest { .. } => "newSessionRequest",
            Message::PublicKeyForward { .. } => "publicKeyForward",
        }
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Message::NewSessionRequest { session_id, .. }
            | Message::PublicKeyForward { session_id, .. } => Some(session_id),
            _ => None,
        }
    }
}

/// Message classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Discovery,
    KeyExchange,
}

/// The wire unit. Immutable once built; forwarding builds a new envelope.
///
/// `session_id` mirrors the session carried by key-exchange payloads so a
/// receiver can scope a frame without looking inside it.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    source: ParticipantId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination: Option<ParticipantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<SessionId>,
    sequence_hint: u64,
    #[serde(flatten)]
    message: Message,
}

impl Envelope {
    /// Envelope visible to every participant
    pub fn broadcast(source: ParticipantId, sequence_hint: u64, message: Message) -> Self {
        Self {
            source,
            destination: None,
            session_id: message.session_id().cloned(),
            sequence_hint,
            message,
        }
    }

    /// Envelope meant for `destination` only; other receivers discard it
    pub fn addressed(
        source: ParticipantId,
        destination: ParticipantId,
        sequence_hint: u64,
        message: Message,
    ) -> Self {
        Self {
            source,
            destination: Some(destination),
            session_id: message.session_id().cloned(),
            sequence_hint,
            message,
        }
    }

    pub fn source(&self) -> &ParticipantId {
        &self.source
    }

    pub fn destination(&self) -> Option<&ParticipantId> {
        self.destination.as_ref()
    }

    pub fn sequence_hint(&self) -> u64 {
        self.sequence_hint
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn into_message(self) -> Message {
        self.message
    }

    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// True when the envelope is a broadcast or addressed to `id`
    pub fn is_for(&self, id: &ParticipantId) -> bool {
        self.destination.as_ref().map_or(true, |dest| dest == id)
    }
}
