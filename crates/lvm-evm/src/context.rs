//! Execution context

use lvm_primitives::{Address, Word256};

/// Block-level parameters shared by every frame of one top-level call
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Params {
    /// Block height
    pub block_height: u64,
    /// Hash of the block at `block_height`
    pub block_hash: Word256,
    /// Block timestamp
    pub block_time: u64,
    /// Block gas limit
    pub gas_limit: u64,
}

/// How a frame was entered
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallKind {
    /// Top-level entry or CALL
    Call,
    /// CALLCODE
    CallCode,
    /// DELEGATECALL
    DelegateCall,
    /// CREATE
    Create,
}

/// One interpreter invocation
#[derive(Clone, Debug)]
pub struct CallFrame {
    /// Value of CALLER
    pub caller: Address,
    /// Account whose storage and balance the frame acts on (ADDRESS)
    pub callee: Address,
    /// Account the running code was loaded from
    pub code_address: Address,
    /// Call data
    pub input: Vec<u8>,
    /// Value of CALLVALUE
    pub value: u128,
    /// Nesting depth, 0 for the top level
    pub depth: usize,
    /// Entry kind
    pub kind: CallKind,
}
