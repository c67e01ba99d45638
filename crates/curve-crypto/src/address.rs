// curve-crypto/src/address.rs

use crate::{hash::keccak256, CryptoError, CryptoResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account address (20 bytes, Ethereum layout)
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd)]
pub struct Address([u8; 20]);

impl Address {
    /// Derive an address from arbitrary seed material (public key bytes, a
    /// label). Takes the low 20 bytes of the Keccak-256 digest.
    pub fn derive(seed: &[u8]) -> Self {
        let hash = keccak256(seed);
        let mut address = [0u8; 20];
        address.copy_from_slice(&hash.as_bytes()[12..32]);
        Self(address)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s)
            .map_err(|e| CryptoError::DeserializationError(e.to_string()))?;
        if bytes.len() != 20 {
            return Err(CryptoError::InvalidAddress("Invalid address length".into()));
        }
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn zero() -> Self {
        Self([0u8; 20])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl FromStr for Address {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
