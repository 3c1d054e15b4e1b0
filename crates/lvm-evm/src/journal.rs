//! Undo log over an account store
//!
//! Every write through [`JournaledState`] records the value it replaced.
//! A failed frame rolls back to the [`Checkpoint`] taken on its entry.

use lvm_primitives::{Address, Word256};
use lvm_state::{Account, AccountStore, StateResult};
use tracing::trace;

#[derive(Debug)]
enum JournalEntry {
    Account {
        address: Address,
        previous: Option<Account>,
    },
    Storage {
        address: Address,
        key: Word256,
        previous: Word256,
    },
}

/// Position in the undo log
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Checkpoint(usize);

/// Account store wrapper recording an undo entry per write
#[derive(Debug)]
pub struct JournaledState<S> {
    inner: S,
    entries: Vec<JournalEntry>,
}

impl<S: AccountStore> JournaledState<S> {
    /// Wrap `inner` with an empty journal
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: Vec::new(),
        }
    }

    /// Mark the current position
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.entries.len())
    }

    /// Undo every write made after `checkpoint`, newest first
    pub fn revert_to(&mut self, checkpoint: Checkpoint) -> StateResult<()> {
        let undone = self.entries.split_off(checkpoint.0.min(self.entries.len()));
        trace!(to = checkpoint.0, undone = undone.len(), "reverting journal");
        for entry in undone.into_iter().rev() {
            match entry {
                JournalEntry::Account {
                    previous: Some(account),
                    ..
                } => self.inner.update_account(account)?,
                JournalEntry::Account {
                    address,
                    previous: None,
                } => self.inner.remove_account(&address)?,
                JournalEntry::Storage {
                    address,
                    key,
                    previous,
                } => self.inner.set_storage(&address, key, previous)?,
            }
        }
        Ok(())
    }

    /// Forget all undo entries, keeping the writes
    pub fn accept(&mut self) {
        self.entries.clear();
    }

    /// Number of recorded writes
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no writes are recorded
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Underlying store
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Underlying store, bypassing the journal
    pub fn inner_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Unwrap, keeping all writes
    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: AccountStore> AccountStore for JournaledState<S> {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        self.inner.get_account(address)
    }

    fn update_account(&mut self, account: Account) -> StateResult<()> {
        let previous = self.inner.get_account(&account.address)?;
        self.entries.push(JournalEntry::Account {
            address: account.address,
            previous,
        });
        self.inner.update_account(account)
    }

    fn remove_account(&mut self, address: &Address) -> StateResult<()> {
        let previous = self.inner.get_account(address)?;
        self.entries.push(JournalEntry::Account {
            address: *address,
            previous,
        });
        self.inner.remove_account(address)
    }

    fn get_storage(&self, address: &Address, key: &Word256) -> StateResult<Word256> {
        self.inner.get_storage(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: Word256, value: Word256) -> StateResult<()> {
        let previous = self.inner.get_storage(address, &key)?;
        self.entries.push(JournalEntry::Storage {
            address: *address,
            key,
            previous,
        });
        self.inner.set_storage(address, key, value)
    }
}
