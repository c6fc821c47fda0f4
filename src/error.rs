//! Error types for the ring key-agreement library

/// Errors surfaced by the primitives, the codec and the simulation driver.
///
/// Routine protocol events (session mismatches, stale chains, compromise
/// detection) are not errors; they are reported through
/// [`crate::participant::Discard`] and logged.
#[derive(thiserror::Error, Debug)]
pub enum DhError {
    /// Modular exponentiation was invoked with a negative exponent
    #[error("invalid exponent: exponent must be non-negative")]
    InvalidExponent,
    /// Modular exponentiation was invoked with a modulus below 1
    #[error("invalid modulus: modulus must be positive")]
    InvalidModulus,
    /// Invalid configuration or group parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// A big integer field could not be parsed from its wire form
    #[error("malformed value: {0}")]
    MalformedValue(String),
    /// Envelope encoding/decoding failed (including unknown message types)
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
    /// The driver watchdog gave up before every inbound queue drained
    #[error("simulation did not reach quiescence after {passes} passes")]
    NonConvergence { passes: u64 },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
