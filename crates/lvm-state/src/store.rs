//! Account store capability

use lvm_primitives::{Address, Word256};

use crate::error::StateResult;
use crate::Account;

/// Read/write access to accounts and their storage slots.
///
/// Storage slots that were never written read as zero.
pub trait AccountStore {
    /// Get account by address
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>>;

    /// Insert or replace the account at `account.address`
    fn update_account(&mut self, account: Account) -> StateResult<()>;

    /// Remove the account record
    fn remove_account(&mut self, address: &Address) -> StateResult<()>;

    /// Read a storage slot
    fn get_storage(&self, address: &Address, key: &Word256) -> StateResult<Word256>;

    /// Write a storage slot. Writing zero clears the slot.
    fn set_storage(&mut self, address: &Address, key: Word256, value: Word256) -> StateResult<()>;

    /// Check if account exists
    fn account_exists(&self, address: &Address) -> StateResult<bool> {
        Ok(self.get_account(address)?.is_some())
    }
}

impl<S: AccountStore + ?Sized> AccountStore for &mut S {
    fn get_account(&self, address: &Address) -> StateResult<Option<Account>> {
        (**self).get_account(address)
    }

    fn update_account(&mut self, account: Account) -> StateResult<()> {
        (**self).update_account(account)
    }

    fn remove_account(&mut self, address: &Address) -> StateResult<()> {
        (**self).remove_account(address)
    }

    fn get_storage(&self, address: &Address, key: &Word256) -> StateResult<Word256> {
        (**self).get_storage(address, key)
    }

    fn set_storage(&mut self, address: &Address, key: Word256, value: Word256) -> StateResult<()> {
        (**self).set_storage(address, key, value)
    }
}
