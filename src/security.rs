//! Protection for secret exponents and safe rendering of secrets in logs
//!
//! This module provides:
//! - A private exponent wrapper that is wiped on drop and never printed
//! - Fingerprints that identify a key in logs without revealing it

use blake2::{Blake2b512, Digest};
use num_bigint::BigUint;
use num_traits::Zero;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of digest bytes rendered by [`fingerprint`]
const FINGERPRINT_BYTES: usize = 8;

/// Wrapper for a participant's private exponent.
///
/// # Security
/// - Overwritten with zero when dropped or replaced
/// - `Debug` output is redacted
pub struct PrivateExponent {
    value: BigUint,
}

impl PrivateExponent {
    pub fn new(value: BigUint) -> Self {
        Self { value }
    }

    /// Get a reference to the inner value
    ///
    /// # Security Warning
    /// The caller must ensure this reference is not used to leak the value
    pub fn expose_secret(&self) -> &BigUint {
        &self.value
    }
}

impl Zeroize for PrivateExponent {
    fn zeroize(&mut self) {
        // BigUint does not expose its limbs mutably; dropping the old
        // allocation after assigning zero is the best available here.
        self.value = BigUint::zero();
    }
}

impl ZeroizeOnDrop for PrivateExponent {}

impl Drop for PrivateExponent {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl std::fmt::Debug for PrivateExponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PrivateExponent([REDACTED])")
    }
}

/// Short, log-safe identifier for a secret value.
///
/// Blake2b-512 over a domain tag and the big-endian bytes, truncated to
/// [`FINGERPRINT_BYTES`] and hex encoded.
pub fn fingerprint(value: &BigUint) -> String {
    let mut hasher = Blake2b512::new();
    hasher.update(b"ring-dh-fingerprint-v1:");
    hasher.update(value.to_bytes_be());
    let digest = hasher.finalize();
    hex::encode(&digest[..FINGERPRINT_BYTES])
}
