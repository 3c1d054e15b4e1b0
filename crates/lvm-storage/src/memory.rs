//! Ordered in-memory backend

use std::collections::BTreeMap;

use lvm_crypto::keccak256;
use lvm_primitives::Word256;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::domain;
use crate::error::StorageResult;
use crate::traits::{KvIterable, KvIterator, KvReader, KvWriter};
use crate::versioned::VersionedTree;

#[derive(Debug, Default)]
struct Inner {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    version: u64,
    last_hash: Word256,
}

/// Byte-ordered key-value store held in memory.
///
/// Stands in for the persistent tree engine: it accepts flushes from a
/// [`KvCache`](crate::KvCache), serves range iterators and counts saved versions.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    inner: RwLock<Inner>,
}

impl MemoryKvStore {
    /// Create an empty store at version 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.inner.read().data.len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.inner.read().data.is_empty()
    }

    /// Hash of the most recent save
    pub fn last_hash(&self) -> Word256 {
        self.inner.read().last_hash
    }

    fn snapshot(&self, start: &[u8], end: &[u8], reverse: bool) -> SnapshotIterator {
        let inner = self.inner.read();
        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = if domain::is_empty_domain(start, end) {
            Vec::new()
        } else {
            inner
                .data
                .range(start.to_vec()..)
                .take_while(|(k, _)| end.is_empty() || k.as_slice() < end)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        };
        if reverse {
            entries.reverse();
        }
        SnapshotIterator {
            start: start.to_vec(),
            end: end.to_vec(),
            entries,
            index: 0,
        }
    }
}

impl KvReader for MemoryKvStore {
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        Ok(self.inner.read().data.get(key).cloned())
    }
}

impl KvWriter for MemoryKvStore {
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()> {
        trace!(key = %hex_key(key), "backend set");
        self.inner.write().data.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> StorageResult<()> {
        trace!(key = %hex_key(key), "backend delete");
        self.inner.write().data.remove(key);
        Ok(())
    }
}

impl KvIterable for MemoryKvStore {
    fn iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_> {
        Box::new(self.snapshot(start, end, false))
    }

    fn reverse_iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_> {
        Box::new(self.snapshot(start, end, true))
    }
}

impl VersionedTree for MemoryKvStore {
    fn save(&self) -> StorageResult<(Word256, u64)> {
        let mut inner = self.inner.write();
        let mut preimage = Vec::new();
        for (k, v) in &inner.data {
            preimage.extend_from_slice(&(k.len() as u32).to_be_bytes());
            preimage.extend_from_slice(k);
            preimage.extend_from_slice(&(v.len() as u32).to_be_bytes());
            preimage.extend_from_slice(v);
        }
        inner.version += 1;
        inner.last_hash = keccak256(&preimage);
        debug!(version = inner.version, hash = %inner.last_hash, "saved tree version");
        Ok((inner.last_hash, inner.version))
    }

    fn version(&self) -> u64 {
        self.inner.read().version
    }
}

fn hex_key(key: &[u8]) -> String {
    key.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Iterator over entries copied out of a [`MemoryKvStore`]
#[derive(Debug)]
pub struct SnapshotIterator {
    start: Vec<u8>,
    end: Vec<u8>,
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    index: usize,
}

impl SnapshotIterator {
    fn current(&self) -> &(Vec<u8>, Vec<u8>) {
        match self.entries.get(self.index) {
            Some(entry) => entry,
            None => panic!("SnapshotIterator used after exhaustion"),
        }
    }
}

impl KvIterator for SnapshotIterator {
    fn domain(&self) -> (&[u8], &[u8]) {
        (&self.start, &self.end)
    }

    fn valid(&self) -> bool {
        self.index < self.entries.len()
    }

    fn next(&mut self) {
        if !self.valid() {
            panic!("SnapshotIterator::next called on invalid iterator");
        }
        self.index += 1;
    }

    fn key(&self) -> &[u8] {
        &self.current().0
    }

    fn value(&self) -> Option<Vec<u8>> {
        Some(self.current().1.clone())
    }

    fn info(&self) -> (Vec<u8>, Option<Vec<u8>>, bool) {
        let (k, v) = self.current();
        (k.clone(), Some(v.clone()), false)
    }

    fn close(&mut self) {
        self.index = self.entries.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(mut it: Box<dyn KvIterator + '_>) -> Vec<Vec<u8>> {
        let mut out = Vec::new();
        while it.valid() {
            out.push(it.key().to_vec());
            it.next();
        }
        out
    }

    #[test]
    fn test_set_get_delete() {
        let store = MemoryKvStore::new();
        store.set(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        assert!(store.has(b"a").unwrap());
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_range_iteration() {
        let store = MemoryKvStore::new();
        for k in [b"k1", b"k2", b"k3"] {
            store.set(k, b"v").unwrap();
        }
        assert_eq!(keys(store.iterator(b"k1", b"k3")), vec![b"k1".to_vec(), b"k2".to_vec()]);
        assert_eq!(
            keys(store.reverse_iterator(b"k1", b"k3")),
            vec![b"k2".to_vec(), b"k1".to_vec()]
        );
        assert_eq!(keys(store.iterator(b"", b"")).len(), 3);
        assert!(keys(store.iterator(b"k3", b"k1")).is_empty());
    }

    #[test]
    fn test_save_bumps_version_and_hash_tracks_content() {
        let store = MemoryKvStore::new();
        assert_eq!(store.version(), 0);
        let (h1, v1) = store.save().unwrap();
        assert_eq!(v1, 1);
        let (h2, v2) = store.save().unwrap();
        assert_eq!(v2, 2);
        assert_eq!(h1, h2);

        store.set(b"x", b"y").unwrap();
        let (h3, _) = store.save().unwrap();
        assert_ne!(h2, h3);
        assert_eq!(store.last_hash(), h3);
    }
}
