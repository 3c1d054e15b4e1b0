//! Interpreter error types

use lvm_state::StateError;
use thiserror::Error;

/// Errors that terminate a frame
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VmError {
    /// Stack underflow
    #[error("stack underflow")]
    StackUnderflow,

    /// Stack overflow
    #[error("stack overflow")]
    StackOverflow,

    /// Invalid opcode
    #[error("invalid opcode: 0x{0:02x}")]
    InvalidOpcode(u8),

    /// Invalid jump destination
    #[error("invalid jump destination: {0}")]
    InvalidJumpDest(usize),

    /// Out of gas
    #[error("out of gas")]
    OutOfGas,

    /// Insufficient balance for a value transfer
    #[error("insufficient balance")]
    InsufficientBalance,

    /// Permission bit not granted
    #[error("permission denied: {0}")]
    PermissionDenied(&'static str),

    /// Call depth exceeded
    #[error("call depth exceeded")]
    CallDepthExceeded,

    /// Memory offset or size beyond the configured limit
    #[error("memory expansion too large")]
    MemoryExpansionTooLarge,

    /// CREATE derived an address that already holds code
    #[error("contract address collision")]
    CreateCollision,

    /// REVERT executed, carrying its output
    #[error("execution reverted")]
    Reverted(Vec<u8>),

    /// The global permissions account is absent
    #[error("global permissions account missing")]
    MissingGlobalPermissions,

    /// Account store failure
    #[error("state error: {0}")]
    State(String),
}

impl From<StateError> for VmError {
    fn from(err: StateError) -> Self {
        match err {
            StateError::MissingGlobalPermissions => VmError::MissingGlobalPermissions,
            other => VmError::State(other.to_string()),
        }
    }
}

/// Result type for interpreter operations
pub type VmResult<T> = Result<T, VmError>;
