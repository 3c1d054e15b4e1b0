//! Event payloads

use lvm_primitives::{Address, Word256};

/// Parameters of one call
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CallData {
    /// Calling account
    pub caller: Address,
    /// Called account
    pub callee: Address,
    /// Input bytes
    pub data: Vec<u8>,
    /// Value transferred
    pub value: u128,
    /// Gas made available to the call
    pub gas: u64,
}

/// Outcome of one call, top-level or nested
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDataCall {
    /// The call itself
    pub call_data: CallData,
    /// Account that started the top-level call
    pub origin: Address,
    /// Call depth, 0 for the top level
    pub depth: usize,
    /// Output bytes
    pub return_data: Vec<u8>,
    /// Error description, empty on success
    pub exception: String,
}

/// Outcome of a whole transaction
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDataTx {
    /// Transaction hash
    pub tx_hash: Word256,
    /// Output bytes
    pub return_data: Vec<u8>,
    /// Error description, empty on success
    pub exception: String,
}

/// A log record emitted by LOG0..LOG4
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventDataLog {
    /// Emitting account
    pub address: Address,
    /// Indexed topics
    pub topics: Vec<Word256>,
    /// Unindexed payload
    pub data: Vec<u8>,
    /// Block height of execution
    pub height: u64,
}

/// Any published event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventData {
    /// Call completion
    Call(EventDataCall),
    /// Transaction completion
    Tx(EventDataTx),
    /// Log record
    Log(EventDataLog),
}

impl EventData {
    /// The exception carried by a call or transaction event, `None` on success
    /// and for logs
    pub fn exception(&self) -> Option<&str> {
        let exception = match self {
            EventData::Call(call) => &call.exception,
            EventData::Tx(tx) => &tx.exception,
            EventData::Log(_) => return None,
        };
        if exception.is_empty() {
            None
        } else {
            Some(exception)
        }
    }
}
