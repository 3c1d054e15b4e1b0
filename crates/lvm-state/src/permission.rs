//! Permission bits and the two-level permission check
//!
//! Each account carries a [`BasePermissions`]: a value bitset and a mask of
//! which bits the account has set explicitly. A bit the account leaves unset
//! is taken from the account at [`GLOBAL_PERMISSIONS_ADDRESS`].

use lvm_primitives::Address;

use crate::error::{StateError, StateResult};
use crate::store::AccountStore;
use crate::Account;

/// A single permission bit (or a union of bits)
pub type PermFlag = u64;

/// Administrative rights
pub const ROOT: PermFlag = 1 << 0;
/// Transfer value
pub const SEND: PermFlag = 1 << 1;
/// Call contract code
pub const CALL: PermFlag = 1 << 2;
/// Deploy contracts
pub const CREATE_CONTRACT: PermFlag = 1 << 3;
/// Create accounts by sending to them
pub const CREATE_ACCOUNT: PermFlag = 1 << 4;
/// Validator bonding
pub const BOND: PermFlag = 1 << 5;
/// Name registry
pub const NAME: PermFlag = 1 << 6;

/// Union of every defined flag
pub const ALL_PERM_FLAGS: PermFlag = (1 << 7) - 1;

/// Flags granted by default: everything except [`ROOT`]
pub const DEFAULT_PERM_FLAGS: PermFlag = ALL_PERM_FLAGS & !ROOT;

/// Default set for the global permissions account: every flag explicitly set
pub const DEFAULT_PERMISSIONS: BasePermissions = BasePermissions {
    perms: DEFAULT_PERM_FLAGS,
    set_bit: ALL_PERM_FLAGS,
};

/// Well-known account holding fallback permission bits
pub const GLOBAL_PERMISSIONS_ADDRESS: Address = Address::ZERO;

/// Permission value bits plus the mask of bits explicitly set
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BasePermissions {
    /// Permission values
    pub perms: PermFlag,
    /// Which bits of `perms` are meaningful
    pub set_bit: PermFlag,
}

impl BasePermissions {
    /// Explicit value of `flag`, `None` if unset
    pub fn get(&self, flag: PermFlag) -> Option<bool> {
        if self.set_bit & flag == 0 {
            None
        } else {
            Some(self.perms & flag != 0)
        }
    }

    /// Set `flag` explicitly
    pub fn set(&mut self, flag: PermFlag, value: bool) {
        self.set_bit |= flag;
        if value {
            self.perms |= flag;
        } else {
            self.perms &= !flag;
        }
    }

    /// Clear `flag`, deferring to the global account again
    pub fn unset(&mut self, flag: PermFlag) {
        self.set_bit &= !flag;
        self.perms &= !flag;
    }

    /// Whether `flag` is explicitly set
    pub fn is_set(&self, flag: PermFlag) -> bool {
        self.set_bit & flag != 0
    }
}

/// Parse a permission name as used in genesis files
pub fn perm_flag_from_name(name: &str) -> Option<PermFlag> {
    match name {
        "root" => Some(ROOT),
        "send" => Some(SEND),
        "call" => Some(CALL),
        "create_contract" => Some(CREATE_CONTRACT),
        "create_account" => Some(CREATE_ACCOUNT),
        "bond" => Some(BOND),
        "name" => Some(NAME),
        _ => None,
    }
}

/// Global permissions account carrying `permissions`
pub fn global_permissions_account(permissions: BasePermissions) -> Account {
    Account {
        permissions,
        ..Account::new(GLOBAL_PERMISSIONS_ADDRESS)
    }
}

/// Resolve `flag` for `address`: the account's own bit when set, otherwise
/// the global permissions account's bit. Unknown accounts use the global bit.
pub fn has_permission<S: AccountStore + ?Sized>(
    store: &S,
    address: &Address,
    flag: PermFlag,
) -> StateResult<bool> {
    if let Some(account) = store.get_account(address)? {
        if let Some(value) = account.permissions.get(flag) {
            return Ok(value);
        }
    }
    let global = store
        .get_account(&GLOBAL_PERMISSIONS_ADDRESS)?
        .ok_or(StateError::MissingGlobalPermissions)?;
    Ok(global.permissions.get(flag).unwrap_or(false))
}
