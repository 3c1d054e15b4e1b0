//! State error types

use lvm_primitives::Address;
use lvm_storage::StorageError;
use thiserror::Error;

/// State access errors
#[derive(Debug, Error)]
pub enum StateError {
    /// Underlying key-value failure
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Stored account bytes do not decode
    #[error("corrupt account record for {0}")]
    CorruptAccount(Address),

    /// The global permissions account has not been created
    #[error("global permissions account missing")]
    MissingGlobalPermissions,
}

/// Result type for state operations
pub type StateResult<T> = Result<T, StateError>;
