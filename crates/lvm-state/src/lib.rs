//! # lvm-state
//!
//! Ledger state as the interpreter sees it.
//!
//! - [`Account`] records and their binary encoding
//! - The two-level permission model ([`permission`])
//! - The [`AccountStore`] capability and [`CacheState`], its implementation
//!   over a [`KvCache`](lvm_storage::KvCache) overlay

#![warn(missing_docs)]
#![warn(clippy::all)]

mod account;
mod cache_state;
mod error;
pub mod permission;
mod store;

pub use account::Account;
pub use cache_state::{account_key, storage_key, CacheState};
pub use error::{StateError, StateResult};
pub use permission::{has_permission, BasePermissions, PermFlag, GLOBAL_PERMISSIONS_ADDRESS};
pub use store::AccountStore;
