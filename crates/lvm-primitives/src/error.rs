//! Common error types for primitives

use thiserror::Error;
use crate::address::AddressError;
use crate::word::WordError;

/// Primitive operation error
#[derive(Debug, Error)]
pub enum PrimitiveError {
    /// Address error
    #[error("address error: {0}")]
    Address(#[from] AddressError),

    /// Word error
    #[error("word error: {0}")]
    Word(#[from] WordError),
}
