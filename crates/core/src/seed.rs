use crate::result::Error;
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use std::fmt;

const RNG_DOMAIN: &[u8] = b"OBSCURA_MATH_OBFUSCATION";
const LABEL_DOMAIN: &[u8] = b"OBSCURA_FUNCTION_STREAM";

/// A 256-bit seed from which every random choice of a run is derived.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    inner: [u8; 32],
}

impl Seed {
    /// Generate a new random 256-bit seed
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        rand::rng().fill_bytes(&mut seed);
        Self { inner: seed }
    }

    /// Create from hex string (with or without 0x prefix)
    pub fn from_hex(hex: &str) -> Result<Self, Error> {
        let hex = hex.strip_prefix("0x").unwrap_or(hex);
        if hex.len() != 64 {
            return Err(Error::InvalidSeedLength(hex.len()));
        }

        let bytes = hex::decode(hex).map_err(|_| Error::InvalidSeedHex)?;
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&bytes);
        Ok(Self { inner: seed })
    }

    /// Convert to hex string with 0x prefix
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.inner))
    }

    /// RNG for a whole run. The same seed always yields the same rewrite choices.
    pub fn create_deterministic_rng(&self) -> StdRng {
        let mut hasher = Sha3_256::new();
        hasher.update(RNG_DOMAIN);
        hasher.update(self.inner);
        StdRng::from_seed(hasher.finalize().into())
    }

    /// RNG dedicated to `label`, independent of every other label's stream.
    ///
    /// Used to make a function's rewrites insensitive to which functions precede it.
    pub fn rng_for(&self, label: &str) -> StdRng {
        let mut hasher = Sha3_256::new();
        hasher.update(LABEL_DOMAIN);
        hasher.update(self.inner);
        hasher.update((label.len() as u64).to_le_bytes());
        hasher.update(label.as_bytes());
        StdRng::from_seed(hasher.finalize().into())
    }

    /// Get a hash of this seed for integrity/identification purposes
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha3_256::new();
        hasher.update(self.inner);
        hasher.finalize().into()
    }

    /// Get the hash as hex string
    pub fn hash_hex(&self) -> String {
        format!("0x{}", hex::encode(self.hash()))
    }
}

// Only the fingerprint is printed.
impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Seed").field("hash", &self.hash_hex()).finish()
    }
}
