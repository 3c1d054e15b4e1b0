//! # lvm-crypto
//!
//! Hash functions used by the interpreter and the native contracts.
//!
//! - Keccak-256 (`SHA3` opcode, contract address derivation)
//! - SHA-256 (native contract at address 2)

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, sha256};
