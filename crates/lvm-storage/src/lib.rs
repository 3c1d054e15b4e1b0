//! # lvm-storage
//!
//! Storage layer for LedgerVM.
//!
//! This crate provides:
//! - [`KvCache`], a concurrent overlay with tombstones and snapshot iterators
//! - Reader/writer/iterator traits a backend implements
//! - [`MemoryKvStore`], an ordered in-memory backend with version counting
//! - The versioned commit adapter used at block boundaries
//!
//! Keys are raw byte strings ordered byte-lexicographically. Range queries
//! everywhere use the half-open domain `[start, end)`, where an empty `start`
//! means the lowest key and an empty `end` means past the highest key.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod domain;
mod error;
mod kvcache;
mod memory;
mod traits;
pub mod versioned;

pub use error::{StorageError, StorageResult};
pub use kvcache::{CacheEntry, KvCache, KvCacheIterator};
pub use memory::{MemoryKvStore, SnapshotIterator};
pub use traits::{KvBackend, KvIterable, KvIterator, KvReader, KvWriter};
pub use versioned::{stutter_save, version_at_height, VersionedTree};
