//! CLI error types

use lvm_state::StateError;
use thiserror::Error;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid address format
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid hex string
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    /// Invalid balance or value
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Unknown permission name
    #[error("Unknown permission: {0}")]
    InvalidPermission(String),

    /// Account store failure while seeding or reading state
    #[error("State error: {0}")]
    State(#[from] StateError),

    /// The call itself failed
    #[error("Execution failed: {0}")]
    Execution(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
