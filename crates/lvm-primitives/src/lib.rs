//! # lvm-primitives
//!
//! Primitive types shared by every LedgerVM crate.
//!
//! Addresses and storage words are both 256 bits wide. Shorter byte strings are
//! left-padded with zeros, so a 20-byte identifier and its padded 32-byte form
//! name the same account.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod word;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use word::{Word256, WordError};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Block height type
pub type BlockHeight = u64;

/// Account nonce type
pub type Nonce = u64;

/// Gas type
pub type Gas = u64;

/// Left-pad `bytes` to 32 bytes. Returns `None` when the input is longer than a word.
pub fn left_pad_32(bytes: &[u8]) -> Option<[u8; 32]> {
    if bytes.len() > 32 {
        return None;
    }
    let mut out = [0u8; 32];
    out[32 - bytes.len()..].copy_from_slice(bytes);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u256_wraps_with_overflowing_add() {
        let (sum, overflow) = U256::MAX.overflowing_add(U256::one());
        assert!(overflow);
        assert_eq!(sum, U256::zero());
    }

    #[test]
    fn test_left_pad_32() {
        let padded = left_pad_32(&[0xab, 0xcd]).unwrap();
        assert_eq!(&padded[..30], &[0u8; 30]);
        assert_eq!(&padded[30..], &[0xab, 0xcd]);
        assert!(left_pad_32(&[0u8; 33]).is_none());
        assert_eq!(left_pad_32(&[]).unwrap(), [0u8; 32]);
    }
}
