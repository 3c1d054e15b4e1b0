//! # lvm-evm
//!
//! Bytecode interpreter for LedgerVM.
//!
//! This crate provides:
//! - The interpreter core: opcode decoding, stack, memory, jump analysis
//! - Gas metering with a configurable [`GasSchedule`]
//! - The call dispatcher for CALL, CALLCODE, DELEGATECALL and CREATE
//! - Permission gating through [`lvm_state::has_permission`]
//! - Call and log events published to any [`lvm_events::Fireable`]
//!
//! Every frame runs against a journaled view of the account store. A frame
//! that fails for any reason undoes its own writes, value transfer included,
//! before its parent sees the failure.
//!
//! ```
//! use std::sync::Arc;
//! use lvm_evm::{asm, Asm, GasMeter, Opcode, Params, Vm, VmConfig};
//! use lvm_primitives::Address;
//! use lvm_state::permission::{global_permissions_account, DEFAULT_PERMISSIONS};
//! use lvm_state::{AccountStore, CacheState};
//! use lvm_storage::MemoryKvStore;
//!
//! let mut state = CacheState::new(Arc::new(MemoryKvStore::new()));
//! state.update_account(global_permissions_account(DEFAULT_PERMISSIONS)).unwrap();
//!
//! let mut vm = Vm::new(state, Params::default(), Address::ZERO, VmConfig::default());
//! let code = asm::concat(&[&Asm::new().push(&[20]).build(), &asm::return_word()]);
//! let mut gas = GasMeter::new(1_000);
//! let out = vm
//!     .call(&Address::from_u64(1), &Address::from_u64(2), &code, &[], 0, &mut gas)
//!     .unwrap();
//! assert_eq!(out[31], 20);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod asm;
mod config;
mod context;
mod error;
pub mod gas;
mod interpreter;
mod journal;
mod memory;
pub mod natives;
mod opcode;
mod stack;
mod vm;

pub use asm::{return_word, Asm};
pub use config::VmConfig;
pub use context::{CallFrame, CallKind, Params};
pub use error::{VmError, VmResult};
pub use gas::{GasMeter, GasSchedule};
pub use interpreter::{analyze_jump_dests, create_address, Interpreter};
pub use journal::{Checkpoint, JournaledState};
pub use opcode::Opcode;
pub use vm::Vm;
