//! Event error types

use std::time::Duration;

use thiserror::Error;

/// Event delivery errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EventError {
    /// No event arrived in time
    #[error("timed out after {0:?} waiting for event")]
    Timeout(Duration),

    /// Every sender for the subscription is gone
    #[error("event channel closed")]
    Closed,
}

/// Result type for event operations
pub type EventResult<T> = Result<T, EventError>;
