//! Key-value access traits shared by the cache and backends

use crate::error::StorageResult;

/// Read access to a key-value store
pub trait KvReader: Send + Sync {
    /// Get the value stored under `key`
    fn get(&self, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Check whether `key` holds a value
    fn has(&self, key: &[u8]) -> StorageResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

/// Write access to a key-value store.
///
/// This is the interface [`KvCache::write_to`](crate::KvCache::write_to)
/// flushes into. Implementations synchronize internally.
pub trait KvWriter: Send + Sync {
    /// Upsert `value` under `key`
    fn set(&self, key: &[u8], value: &[u8]) -> StorageResult<()>;

    /// Remove `key`
    fn delete(&self, key: &[u8]) -> StorageResult<()>;
}

/// Cursor over a range of keys.
///
/// A fresh iterator is positioned on the first key of its domain. Calling
/// [`next`](KvIterator::next), [`key`](KvIterator::key) or
/// [`info`](KvIterator::info) once [`valid`](KvIterator::valid) returns false
/// panics.
pub trait KvIterator {
    /// The `(start, end)` domain this iterator was created with
    fn domain(&self) -> (&[u8], &[u8]);

    /// Whether the iterator is positioned on an entry
    fn valid(&self) -> bool;

    /// Advance to the next entry
    fn next(&mut self);

    /// Current key
    fn key(&self) -> &[u8];

    /// Current value, `None` when the entry is deleted or gone
    fn value(&self) -> Option<Vec<u8>>;

    /// Current `(key, value, deleted)`
    fn info(&self) -> (Vec<u8>, Option<Vec<u8>>, bool);

    /// Release the iterator
    fn close(&mut self);
}

/// Stores that can open range iterators
pub trait KvIterable {
    /// Ascending iterator over `[start, end)`
    fn iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_>;

    /// Descending iterator over `[start, end)`
    fn reverse_iterator(&self, start: &[u8], end: &[u8]) -> Box<dyn KvIterator + '_>;
}

/// A backend the state layer can read from and scan
pub trait KvBackend: KvReader + KvIterable + Send + Sync {}

impl<T: KvReader + KvIterable + Send + Sync> KvBackend for T {}
