//! Diffie-Hellman group parameters.
//!
//! The protocol treats `(generator, prime)` as pre-agreed configuration. The
//! built-in table carries the MODP groups of RFC 2409 and RFC 3526; a table in
//! the `primes.json` layout can also be loaded from disk:
//!
//! ```json
//! [{ "generator": 2, "prime": "FFFFFFFF..." }]
//! ```

use crate::error::DhError;
use crate::modexp::modpow_unsigned;
use num_bigint::BigUint;
use num_traits::One;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const MODP_768: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A63A3620FFFFFFFFFFFFFFFF";

const MODP_1024: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE65381FFFFFFFFFFFFFFFF";

const MODP_1536: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA237327FFFFFFFFFFFFFFFF";

const MODP_2048: &str = "\
    FFFFFFFFFFFFFFFFC90FDAA22168C234C4C6628B80DC1CD129024E088A67CC74\
    020BBEA63B139B22514A08798E3404DDEF9519B3CD3A431B302B0A6DF25F1437\
    4FE1356D6D51C245E485B576625E7EC6F44C42E9A637ED6B0BFF5CB6F406B7ED\
    EE386BFB5A899FA5AE9F24117C4B1FE649286651ECE45B3DC2007CB8A163BF05\
    98DA48361C55D39A69163FA8FD24CF5F83655D23DCA3AD961C62F356208552BB\
    9ED529077096966D670C354E4ABC9804F1746C08CA18217C32905E462E36CE3B\
    E39E772C180E86039B2783A2EC07A28FB5C55DF06F4C52C9DE2BCBF695581718\
    3995497CEA956AE515D2261898FA051015728E5A8AACAA68FFFFFFFFFFFFFFFF";

/// A `(generator, prime)` pair shared by every participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DhGroup {
    generator: BigUint,
    prime: BigUint,
}

impl DhGroup {
    /// Creates a group from explicit parameters.
    ///
    /// # Errors
    /// Returns an error if the prime is below 3 or even, or if the generator
    /// is not in `[2, prime - 1)`.
    pub fn new(generator: BigUint, prime: BigUint) -> Result<Self, DhError> {
        if prime < BigUint::from(3u32) || !prime.bit(0) {
            return Err(DhError::InvalidParameter(format!(
                "prime must be an odd integer >= 3, got {}",
                prime
            )));
        }
        let upper = &prime - BigUint::one();
        if generator < BigUint::from(2u32) || generator >= upper {
            return Err(DhError::InvalidParameter(format!(
                "generator must lie in [2, p - 1), got {}",
                generator
            )));
        }
        Ok(Self { generator, prime })
    }

    /// Looks up a built-in MODP group by its IKE group number (1, 2, 5 or 14).
    pub fn modp(id: u16) -> Result<Self, DhError> {
        let hex = match id {
            1 => MODP_768,
            2 => MODP_1024,
            5 => MODP_1536,
            14 => MODP_2048,
            other => {
                return Err(DhError::InvalidParameter(format!(
                    "unknown MODP group {}, expected one of 1, 2, 5, 14",
                    other
                )))
            }
        };
        Self::new(BigUint::from(2u32), parse_hex(hex)?)
    }

    pub fn generator(&self) -> &BigUint {
        &self.generator
    }

    pub fn prime(&self) -> &BigUint {
        &self.prime
    }

    /// Bit length of the prime modulus
    pub fn bits(&self) -> u64 {
        self.prime.bits()
    }

    /// Computes `g^x mod p`.
    pub fn public_value(&self, exponent: &BigUint) -> Result<BigUint, DhError> {
        modpow_unsigned(&self.generator, exponent, &self.prime)
    }

    /// Folds `exponent` into an accumulated value: `value^x mod p`.
    pub fn fold(&self, value: &BigUint, exponent: &BigUint) -> Result<BigUint, DhError> {
        modpow_unsigned(value, exponent, &self.prime)
    }
}

/// Parses a hexadecimal big integer, tolerating an optional `0x` prefix.
pub(crate) fn parse_hex(text: &str) -> Result<BigUint, DhError> {
    let digits = text.trim();
    let digits = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
        .unwrap_or(digits);
    BigUint::parse_bytes(digits.as_bytes(), 16)
        .ok_or_else(|| DhError::MalformedValue(format!("not a hex integer: {:?}", text)))
}

/// Generator as written in a parameter table: a JSON number or a decimal string.
#[derive(Deserialize)]
#[serde(untagged)]
enum GeneratorField {
    Number(u64),
    Text(String),
}

#[derive(Deserialize)]
struct GroupEntry {
    generator: GeneratorField,
    prime: String,
}

/// An ordered table of groups loaded from the `primes.json` layout.
#[derive(Clone, Debug)]
pub struct GroupTable {
    groups: Vec<DhGroup>,
}

impl GroupTable {
    pub fn from_json(text: &str) -> Result<Self, DhError> {
        let entries: Vec<GroupEntry> = serde_json::from_str(text)?;
        let groups = entries
            .into_iter()
            .map(|entry| {
                let generator = match entry.generator {
                    GeneratorField::Number(n) => BigUint::from(n),
                    GeneratorField::Text(s) => s.trim().parse::<BigUint>().map_err(|e| {
                        DhError::MalformedValue(format!("generator {:?}: {}", s, e))
                    })?,
                };
                DhGroup::new(generator, parse_hex(&entry.prime)?)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { groups })
    }

    pub fn from_file(path: &Path) -> Result<Self, DhError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    pub fn get(&self, index: usize) -> Result<&DhGroup, DhError> {
        self.groups.get(index).ok_or_else(|| {
            DhError::InvalidParameter(format!(
                "group index {} out of range (table has {} groups)",
                index,
                self.groups.len()
            ))
        })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Where the simulation takes its group parameters from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum GroupSource {
    /// Built-in MODP group by IKE group number
    Modp { id: u16 },
    /// Entry `index` of a `primes.json` table
    File { path: PathBuf, index: usize },
}

impl Default for GroupSource {
    fn default() -> Self {
        GroupSource::Modp { id: 14 }
    }
}

impl GroupSource {
    pub fn resolve(&self) -> Result<DhGroup, DhError> {
        match self {
            GroupSource::Modp { id } => DhGroup::modp(*id),
            GroupSource::File { path, index } => GroupTable::from_file(path)?.get(*index).cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_groups() {
        for (id, bits) in [(1u16, 768u64), (2, 1024), (5, 1536), (14, 2048)] {
            let group = DhGroup::modp(id).unwrap();
            assert_eq!(group.bits(), bits);
            assert_eq!(group.generator(), &BigUint::from(2u32));
            assert!(group.prime().bit(0));
        }
        assert!(DhGroup::modp(3).is_err());
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(DhGroup::new(BigUint::from(2u32), BigUint::from(10u32)).is_err());
        assert!(DhGroup::new(BigUint::from(1u32), BigUint::from(23u32)).is_err());
        assert!(DhGroup::new(BigUint::from(22u32), BigUint::from(23u32)).is_err());
        assert!(DhGroup::new(BigUint::from(5u32), BigUint::from(23u32)).is_ok());
    }

    #[test]
    fn test_two_party_agreement() {
        let group = DhGroup::new(BigUint::from(5u32), BigUint::from(23u32)).unwrap();
        let a = BigUint::from(6u32);
        let b = BigUint::from(15u32);

        let big_a = group.public_value(&a).unwrap();
        let big_b = group.public_value(&b).unwrap();
        assert_eq!(big_a, BigUint::from(8u32));
        assert_eq!(big_b, BigUint::from(19u32));

        let s_a = group.fold(&big_b, &a).unwrap();
        let s_b = group.fold(&big_a, &b).unwrap();
        assert_eq!(s_a, s_b);
        assert_eq!(s_a, BigUint::from(2u32));
    }

    #[test]
    fn test_table_from_json() {
        let text = r#"[
            {"generator": 2, "prime": "17"},
            {"generator": "5", "prime": "0x17"}
        ]"#;
        let table = GroupTable::from_json(text).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0).unwrap().prime(), &BigUint::from(23u32));
        assert_eq!(table.get(1).unwrap().generator(), &BigUint::from(5u32));
        assert!(table.get(2).is_err());
    }

    #[test]
    fn test_table_rejects_bad_prime() {
        let text = r#"[{"generator": 2, "prime": "not-hex"}]"#;
        assert!(matches!(
            GroupTable::from_json(text),
            Err(DhError::MalformedValue(_))
        ));
    }
}
