//! JSON envelope codec.
//!
//! Field names are stable (`type`, `source`, `destination`, `sessionId`,
//! `sequenceHint`, `payload`) and big integers travel as hexadecimal strings
//! so no consumer has to round them through a float. Key-exchange frames
//! carry `sessionId` both at the top level and in the payload; the two must
//! agree.

use super::messages::Envelope;
use crate::error::DhError;

/// A serialized envelope as it sits in an inbound queue
pub type Frame = String;

pub fn encode(envelope: &Envelope) -> Result<Frame, DhError> {
    Ok(serde_json::to_string(envelope)?)
}

/// Decodes a frame, rejecting unknown message types and malformed fields.
pub fn decode(frame: &str) -> Result<Envelope, DhError> {
    let envelope: Envelope = serde_json::from_str(frame)?;
    if envelope.session_id() != envelope.message().session_id() {
        return Err(DhError::MalformedValue(format!(
            "envelope session {:?} disagrees with payload session {:?}",
            envelope.session_id(),
            envelope.message().session_id()
        )));
    }
    Ok(envelope)
}

/// Serde adapter rendering a `BigUint` as lowercase big-endian hex.
pub mod hex_biguint {
    use num_bigint::BigUint;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value.to_bytes_be()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let text = String::deserialize(deserializer)?;
        // hex::decode needs an even number of digits
        let padded = if text.len() % 2 == 1 {
            format!("0{}", text)
        } else {
            text
        };
        let bytes = hex::decode(&padded).map_err(de::Error::custom)?;
        Ok(BigUint::from_bytes_be(&bytes))
    }
}
