//! 256-bit storage word

use std::fmt;
use primitive_types::U256;
use thiserror::Error;

use crate::left_pad_32;

/// Word parsing error
#[derive(Debug, Error, PartialEq, Eq)]
pub enum WordError {
    /// Invalid hex string
    #[error("invalid hex string: {0}")]
    InvalidHex(String),
    /// Input longer than a word
    #[error("invalid word length: at most 32 bytes, got {0}")]
    TooLong(usize),
}

/// 32-byte value used for storage keys, storage values and hashes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct Word256([u8; 32]);

impl Word256 {
    /// Size in bytes
    pub const LEN: usize = 32;

    /// Zero word
    pub const ZERO: Word256 = Word256([0u8; 32]);

    /// Create from bytes
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Word256(bytes)
    }

    /// Create from a slice of at most 32 bytes, left-padding with zeros
    pub fn left_pad(slice: &[u8]) -> Result<Self, WordError> {
        left_pad_32(slice)
            .map(Word256)
            .ok_or(WordError::TooLong(slice.len()))
    }

    /// Create from an integer
    pub fn from_u64(n: u64) -> Self {
        Self::from(U256::from(n))
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, WordError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| WordError::InvalidHex(e.to_string()))?;
        Self::left_pad(&bytes)
    }

    /// Get as bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Interpret as a big-endian integer
    pub fn to_u256(&self) -> U256 {
        U256::from_big_endian(&self.0)
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word256({})", self.to_hex())
    }
}

impl fmt::Display for Word256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for Word256 {
    fn from(bytes: [u8; 32]) -> Self {
        Word256(bytes)
    }
}

impl From<U256> for Word256 {
    fn from(value: U256) -> Self {
        let mut bytes = [0u8; 32];
        value.to_big_endian(&mut bytes);
        Word256(bytes)
    }
}

impl AsRef<[u8]> for Word256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(feature = "serde")]
mod serde_impl {
    use super::*;
    use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

    impl Serialize for Word256 {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(&self.to_hex())
        }
    }

    impl<'de> Deserialize<'de> for Word256 {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            Word256::from_hex(&s).map_err(de::Error::custom)
        }
    }
}
