use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

// Provably-fair randomness: a fresh 32-byte server seed per spin, committed to with
// SHA-256 before use and revealed afterwards.
// seed + nonce -> HMAC-SHA256 -> first 4 bytes -> value in [0,1]

pub type HmacSha256 = Hmac<Sha256>;

pub const SEED_LEN: usize = 32;

/// Secret per-spin randomness. The text form is lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Seed([u8; SEED_LEN]);

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SeedParseError {
    #[error("seed must be {expected} hex characters, got {actual}")]
    Length { expected: usize, actual: usize },
    #[error("seed is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl Seed {
    pub const fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Public commitment to this seed.
    pub fn commitment(&self) -> String {
        commit(self)
    }
}

impl fmt::Display for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// Seeds stay out of logs until they are revealed on purpose through Display.
impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(..)")
    }
}

impl FromStr for Seed {
    type Err = SeedParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != SEED_LEN * 2 {
            return Err(SeedParseError::Length {
                expected: SEED_LEN * 2,
                actual: s.len(),
            });
        }
        let mut out = [0u8; SEED_LEN];
        hex::decode_to_slice(s, &mut out)?;
        Ok(Self(out))
    }
}

impl Serialize for Seed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Seed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Draws a fresh seed from the operating system CSPRNG.
pub fn generate_seed() -> Seed {
    let mut bytes = [0u8; SEED_LEN];
    OsRng.fill_bytes(&mut bytes);
    Seed(bytes)
}

/// Where the spin transaction gets its seeds from. Every call must return a fresh seed.
pub trait SeedSource: Send + Sync {
    fn next_seed(&self) -> Seed;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OsSeedSource;

impl SeedSource for OsSeedSource {
    fn next_seed(&self) -> Seed {
        generate_seed()
    }
}

pub fn derive_hash_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// SHA-256 over the raw seed bytes, hex encoded.
pub fn commit(seed: &Seed) -> String {
    derive_hash_hex(seed.as_bytes())
}

pub fn hmac_bytes(seed: &Seed, nonce: u32) -> [u8; 32] {
    let key = seed.to_hex();
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC takes keys of any length");
    let msg = format!("{key}:{nonce}");
    mac.update(msg.as_bytes());
    let res = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&res);
    out
}

/// Maps (seed, nonce) to a value in [0, 1].
///
/// The first four HMAC bytes are read as a big-endian `u32` and divided by
/// `u32::MAX`, so an all-ones prefix yields exactly 1.0. Callers that index
/// into a table must clamp.
pub fn unit_interval(seed: &Seed, nonce: u32) -> f64 {
    let bytes = hmac_bytes(seed, nonce);
    let v = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    f64::from(v) / f64::from(u32::MAX)
}
