//! Concurrent write overlay with tombstones

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::domain;
use crate::error::StorageResult;
use crate::traits::{KvIterable, KvIterator, KvReader, KvWriter};

/// One overlay entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CacheEntry {
    /// Pending upsert
    Value(Vec<u8>),
    /// Pending deletion
    Tombstone,
}

impl CacheEntry {
    /// Value carried by the entry, `None` for a tombstone
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            CacheEntry::Value(v) => Some(v),
            CacheEntry::Tombstone => None,
        }
    }

    /// Whether this entry records a deletion
    pub fn is_deleted(&self) -> bool {
        matches!(self, CacheEntry::Tombstone)
    }
}

/// In-memory overlay of pending writes over some backend.
///
/// A key is in one of three states: absent (never touched), holding a value,
/// or tombstoned. All methods take `&self` and are safe to call from many
/// threads at once.
///
/// [`KvCache::reset`] swaps in a fresh map, so iterators opened before a
/// reset keep reading the entries they were opened over.
#[derive(Debug, Default)]
pub struct KvCache {
    entries: RwLock<Arc<DashMap<Vec<u8>, CacheEntry>>>,
}

impl KvCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw overlay entry: `None` if the key was never touched
    pub fn info(&self, key: &[u8]) -> Option<CacheEntry> {
        self.entries.read().get(key).map(|e| e.value().clone())
    }

    /// Overlay value, `None` when absent or tombstoned
    pub fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.entries
            .read()
            .get(key)
            .and_then(|e| e.value().value().map(<[u8]>::to_vec))
    }

    /// Whether the overlay holds a live value. False for tombstones.
    pub fn has(&self, key: &[u8]) -> bool {
        self.entries
            .read()
            .get(key)
            .map(|e| !e.value().is_deleted())
            .unwrap_or(false)
    }

    /// Upsert into the overlay
    pub fn set(&self, key: &[u8], value: &[u8]) {
        self.entries
            .read()
            .insert(key.to_vec(), CacheEntry::Value(value.to_vec()));
    }

    /// Tombstone `key` in the overlay
    pub fn delete(&self, key: &[u8]) {
        self.entries.read().insert(key.to_vec(), CacheEntry::Tombstone);
    }

    /// Number of overlay entries, tombstones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the overlay is empty
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Every overlay key, ascending or descending
    pub fn sorted_keys(&self, reverse: bool) -> Vec<Vec<u8>> {
        let mut keys: Vec<Vec<u8>> = self
            .entries
            .read()
            .iter()
            .map(|e| e.key().clone())
            .collect();
        keys.sort();
        if reverse {
            keys.reverse();
        }
        keys
    }

    /// Overlay keys inside `[start, end)`, ascending
    pub fn sorted_keys_in_domain(&self, start: &[u8], end: &[u8]) -> Vec<Vec<u8>> {
        domain::select_in_domain(&self.sorted_keys(false), start, end, false)
    }

    /// Ascending iterator over `[start, end)`. The key set is fixed now; values
    /// are read from the overlay when asked for.
    pub fn iterator(&self, start: &[u8], end: &[u8]) -> KvCacheIterator {
        self.new_iterator(start, end, false)
    }

    /// Descending iterator over `[start, end)`
    pub fn reverse_iterator(&self, start: &[u8], end: &[u8]) -> KvCacheIterator {
        self.new_iterator(start, end, true)
    }

    fn new_iterator(&self, start: &[u8], end: &[u8], reverse: bool) -> KvCacheIterator {
        let keys = domain::select_in_domain(&self.sorted_keys(false), start, end, reverse);
        KvCacheIterator {
            entries: Arc::clone(&self.entries.read()),
            start: start.to_vec(),
            end: end.to_vec(),
            keys,
            index: 0,
        }
    }

    /// Flush every entry into `writer` in key order. Tombstones become deletes.
    /// The overlay is left untouched.
    pub fn write_to(&self, writer: &dyn KvWriter) -> StorageResult<()> {
        // snapshot first so a writer that is itself this cache cannot deadlock a shard
        let mut pending: Vec<(Vec<u8>, CacheEntry)> = self
            .entries
            .read()
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        pending.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(entries = pending.len(), "flushing kv cache");
        for (key, entry) in pending {
            match entry {
                CacheEntry::Value(value) => writer.set(&key, &value)?,
                CacheEntry::Tombstone => writer.delete(&key)?,
            }
        }
        Ok(())
    }

    /// Discard all overlay entries. Open iterators keep the old map.
    pub fn reset(&self) {
        *self.entries.write() = Arc::new(DashMap::new());
    }
}

impl KvReader for KvCache {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(KvCache::get(self, key))
    }

    fn has(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(KvCache::has(self, key))
    }
}

impl KvWriter for KvCache {
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        KvCache::set(self, key, value);
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        KvCache::delete(self, key);
        Ok(())
    }
}

impl KvIterable for KvCache {
    fn iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_> {
        Box::new(KvCache::iterator(self, start, end))
    }

    fn reverse_iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_> {
        Box::new(KvCache::reverse_iterator(self, start, end))
    }
}

/// Iterator over a snapshot of [`KvCache`] keys
#[derive(Debug)]
pub struct KvCacheIterator {
    entries: Arc<DashMap<Vec<u8>, CacheEntry>>,
    start: Vec<u8>,
    end: Vec<u8>,
    keys: Vec<Vec<u8>>,
    index: usize,
}

impl KvCacheIterator {
    fn current(&self) -> &[u8] {
        match self.keys.get(self.index) {
            Some(key) => key,
            None => panic!("KvCacheIterator used after exhaustion"),
        }
    }
}

impl KvIterator for KvCacheIterator {
    fn domain(&self) -> (&[u8], &[u8]) {
        (&self.start, &self.end)
    }

    fn valid(&self) -> bool {
        self.index < self.keys.len()
    }

    fn next(&mut self) {
        if !self.valid() {
            panic!("KvCacheIterator::next called on invalid iterator");
        }
        self.index += 1;
    }

    fn key(&self) -> &[u8] {
        self.current()
    }

    fn value(&self) -> Option<Vec<u8>> {
        self.entries
            .get(self.current())
            .and_then(|e| e.value().value().map(<[u8]>::to_vec))
    }

    fn info(&self) -> (Vec<u8>, Option<Vec<u8>>, bool) {
        let key = self.current().to_vec();
        match self.entries.get(key.as_slice()).map(|e| e.value().clone()) {
            Some(CacheEntry::Value(v)) => (key, Some(v), false),
            Some(CacheEntry::Tombstone) => (key, None, true),
            None => (key, None, false),
        }
    }

    fn close(&mut self) {
        self.index = self.keys.len();
    }
}
