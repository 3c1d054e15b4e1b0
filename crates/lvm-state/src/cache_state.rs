//! Account store over a key-value overlay
//!
//! Key layout (byte-lexicographic, so all slots of one account are contiguous):
//!
//! | key | value |
//! |---|---|
//! | `a` ++ address | encoded [`Account`] |
//! | `s` ++ address ++ slot | 32-byte slot value |

use std::collections::BTreeMap;
use std::sync::Arc;

use lvm_primitives::{Address, Word256};
use lvm_storage::{
    domain, CacheEntry, KvBackend, KvCache, KvIterable, KvIterator, KvReader, KvWriter, StorageError,
};
use tracing::{debug, info};

use crate::error::{StateError, StateResult};
use crate::store::AccountStore;
use crate::Account;

const ACCOUNT_PREFIX: u8 = b'a';
const STORAGE_PREFIX: u8 = b's';

/// Backend key of an account record
pub fn account_key(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Address::LEN);
    key.push(ACCOUNT_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

/// Backend key of a storage slot
pub fn storage_key(address: &Address, slot: &Word256) -> Vec<u8> {
    let mut key = storage_prefix(address);
    key.extend_from_slice(slot.as_bytes());
    key
}

fn storage_prefix(address: &Address) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + Address::LEN + Word256::LEN);
    key.push(STORAGE_PREFIX);
    key.extend_from_slice(address.as_bytes());
    key
}

/// [`AccountStore`] that buffers every write in a [`KvCache`] and reads
/// through to a backend for keys the overlay has not touched.
pub struct CacheState {
    cache: Arc<KvCache>,
    backend: Arc<dyn KvBackend>,
}

impl CacheState {
    /// Create a state with an empty overlay
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self {
            cache: Arc::new(KvCache::new()),
            backend,
        }
    }

    /// Create a state sharing an existing overlay
    pub fn with_cache(cache: Arc<KvCache>, backend: Arc<dyn KvBackend>) -> Self {
        Self { cache, backend }
    }

    /// The overlay holding pending writes
    pub fn cache(&self) -> &Arc<KvCache> {
        &self.cache
    }

    fn read(&self, key: &[u8]) -> StateResult<Option<Vec<u8>>> {
        match self.cache.info(key) {
            Some(CacheEntry::Value(v)) => Ok(Some(v)),
            Some(CacheEntry::Tombstone) => Ok(None),
            None => Ok(self.backend.get(key)?),
        }
    }

    /// Flush pending writes into `writer`, then clear the overlay
    pub fn commit(&self, writer: &dyn KvWriter) -> StateResult<()> {
        let pending = self.cache.len();
        self.cache.write_to(writer)?;
        self.cache.reset();
        info!(entries = pending, "committed state cache");
        Ok(())
    }

    /// Drop pending writes
    pub fn discard(&self) {
        debug!(entries = self.cache.len(), "discarding state cache");
        self.cache.reset();
    }

    /// Every non-zero storage slot of `address`, ascending by slot, with
    /// overlay writes taking precedence over the backend.
    pub fn storage_entries(&self, address: &Address) -> StateResult<Vec<(Word256, Word256)>> {
        let start = storage_prefix(address);
        let end = domain::prefix_end(&start);

        let mut merged: BTreeMap<Vec<u8>, Option<Vec<u8>>> = BTreeMap::new();
        let mut it = self.backend.iterator(&start, &end);
        while it.valid() {
            merged.insert(it.key().to_vec(), it.value());
            it.next();
        }
        it.close();

        let mut it = self.cache.iterator(&start, &end);
        while it.valid() {
            let (key, value, _) = it.info();
            merged.insert(key, value);
            it.next();
        }
        it.close();

        let mut entries = Vec::with_capacity(merged.len());
        for (key, value) in merged {
            let Some(value) = value else { continue };
            let slot = Word256::left_pad(&key[start.len()..])
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            let value = Word256::left_pad(&value)
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            entries.push((slot, value));
        }
        Ok(entries)
    }
}

impl AccountStore for CacheState {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        match self.read(&account_key(address))? {
            Some(bytes) => Account::from_bytes(&bytes)
                .map(Some)
                .ok_or(StateError::CorruptAccount(*address)),
            None => Ok(None),
        }
    }

    fn update_account(&mut self, account: Account) -> StateResult<()> {
        self.cache.set(&account_key(&account.address), &account.to_bytes());
        Ok(())
    }

    fn remove_account(&mut self, address: &Address) -> StateResult<()> {
        self.cache.delete(&account_key(address));
        Ok(())
    }

    fn get_storage(&self, address: &Address, key: &Word256) -> StateResult<Word256> {
        match self.read(&storage_key(address, key))? {
            Some(bytes) => Ok(Word256::left_pad(&bytes)
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?),
            None => Ok(Word256::ZERO),
        }
    }

    fn set_storage(&mut self, address: &Address, key: Word256, value: Word256) -> StateResult<()> {
        let k = storage_key(address, &key);
        if value.is_zero() {
            self.cache.delete(&k);
        } else {
            self.cache.set(&k, value.as_bytes());
        }
        Ok(())
    }
}
