//! Modular exponentiation and the random integer source.
//!
//! `modpow` is the single arithmetic primitive of the protocol: every
//! public contribution and every hop of a forwarding chain is one call.

use crate::error::DhError;
use num_bigint::{BigInt, BigUint};
use num_traits::{Signed, Zero};
use rand::RngCore;

/// Largest bit length [`random_bits`] will draw
pub const MAX_RANDOM_BITS: u64 = 1 << 16;

/// Computes `base^exponent mod modulus` on signed big integers.
///
/// The result lies in `[0, modulus)`, also for negative bases.
///
/// # Errors
/// * [`DhError::InvalidExponent`] if `exponent` is negative
/// * [`DhError::InvalidModulus`] if `modulus` is zero or negative
pub fn modpow(base: &BigInt, exponent: &BigInt, modulus: &BigInt) -> Result<BigInt, DhError> {
    if exponent.is_negative() {
        return Err(DhError::InvalidExponent);
    }
    if !modulus.is_positive() {
        return Err(DhError::InvalidModulus);
    }
    Ok(base.modpow(exponent, modulus))
}

/// Unsigned variant used on the protocol path, where exponents are
/// non-negative by construction.
///
/// # Errors
/// Returns [`DhError::InvalidModulus`] if `modulus` is zero.
pub fn modpow_unsigned(
    base: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, DhError> {
    if modulus.is_zero() {
        return Err(DhError::InvalidModulus);
    }
    Ok(base.modpow(exponent, modulus))
}

/// Draws a uniformly random non-zero integer below `2^bits`.
///
/// # Errors
/// Returns [`DhError::InvalidParameter`] if `bits` is zero or above
/// [`MAX_RANDOM_BITS`].
pub fn random_bits<R: RngCore + ?Sized>(rng: &mut R, bits: u64) -> Result<BigUint, DhError> {
    if bits == 0 || bits > MAX_RANDOM_BITS {
        return Err(DhError::InvalidParameter(format!(
            "bit length must lie in [1, {}], got {}",
            MAX_RANDOM_BITS, bits
        )));
    }

    let len = bits.div_ceil(8) as usize;
    let excess = (len as u64 * 8 - bits) as u32;
    let mut buf = vec![0u8; len];

    loop {
        rng.fill_bytes(&mut buf);
        buf[0] &= 0xffu8 >> excess;

        let value = BigUint::from_bytes_be(&buf);
        if !value.is_zero() {
            return Ok(value);
        }
    }
}

/// Draws `bytes` random bytes and renders them as a lowercase hex token.
pub fn random_hex<R: RngCore + ?Sized>(rng: &mut R, bytes: usize) -> String {
    let mut buf = vec![0u8; bytes];
    rng.fill_bytes(&mut buf);
    hex::encode(buf)
}
