//! Topic strings
//!
//! Addresses are rendered as 64 upper-case hex digits.

use lvm_primitives::Address;

/// Fired when `address` is the callee of a completed call
pub fn acc_call(address: &Address) -> String {
    format!("Acc/{}/Call", address.to_topic_hex())
}

/// Fired when a transaction from `address` is applied
pub fn acc_input(address: &Address) -> String {
    format!("Acc/{}/Input", address.to_topic_hex())
}

/// Fired when a transaction to `address` is applied
pub fn acc_output(address: &Address) -> String {
    format!("Acc/{}/Output", address.to_topic_hex())
}

/// Fired for every LOG opcode executed by `address`
pub fn log(address: &Address) -> String {
    format!("Log/{}", address.to_topic_hex())
}
