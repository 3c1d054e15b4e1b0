//! Account record

use lvm_primitives::{Address, Word256};

use crate::permission::BasePermissions;

/// Account data
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Account {
    /// Account address
    pub address: Address,
    /// Account balance
    pub balance: u128,
    /// Contract code, empty for plain accounts
    pub code: Vec<u8>,
    /// Account nonce, bumped on every contract creation
    pub nonce: u64,
    /// Own permission bits
    pub permissions: BasePermissions,
    /// Storage root reported by the backing tree
    pub storage_root: Word256,
}

// address | balance | nonce | perms | set_bit | storage_root | code
const FIXED_LEN: usize = 32 + 16 + 8 + 8 + 8 + 32;

impl Account {
    /// Create a zero-valued account at `address`
    pub fn new(address: Address) -> Self {
        Self {
            address,
            ..Default::default()
        }
    }

    /// Check if account has code
    pub fn has_code(&self) -> bool {
        !self.code.is_empty()
    }

    /// Serialize account to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FIXED_LEN + self.code.len());
        bytes.extend_from_slice(self.address.as_bytes());
        bytes.extend_from_slice(&self.balance.to_le_bytes());
        bytes.extend_from_slice(&self.nonce.to_le_bytes());
        bytes.extend_from_slice(&self.permissions.perms.to_le_bytes());
        bytes.extend_from_slice(&self.permissions.set_bit.to_le_bytes());
        bytes.extend_from_slice(self.storage_root.as_bytes());
        bytes.extend_from_slice(&self.code);
        bytes
    }

    /// Deserialize account from bytes
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < FIXED_LEN {
            return None;
        }
        let address = Address::from_bytes(bytes[0..32].try_into().ok()?);
        let balance = u128::from_le_bytes(bytes[32..48].try_into().ok()?);
        let nonce = u64::from_le_bytes(bytes[48..56].try_into().ok()?);
        let perms = u64::from_le_bytes(bytes[56..64].try_into().ok()?);
        let set_bit = u64::from_le_bytes(bytes[64..72].try_into().ok()?);
        let storage_root = Word256::from_bytes(bytes[72..104].try_into().ok()?);
        Some(Self {
            address,
            balance,
            code: bytes[FIXED_LEN..].to_vec(),
            nonce,
            permissions: BasePermissions { perms, set_bit },
            storage_root,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permission::{DEFAULT_PERMISSIONS, SEND};

    #[test]
    fn test_new_account_is_zero_valued() {
        let account = Account::new(Address::from_u64(7));
        assert_eq!(account.balance, 0);
        assert_eq!(account.nonce, 0);
        assert!(!account.has_code());
        assert_eq!(account.permissions, BasePermissions::default());
    }

    #[test]
    fn test_account_serialization() {
        let mut permissions = DEFAULT_PERMISSIONS;
        permissions.set(SEND, false);
        let account = Account {
            address: Address::from_u64(0xabcd),
            balance: u128::MAX - 1,
            code: vec![0x60, 0x01, 0x00],
            nonce: 42,
            permissions,
            storage_root: Word256::from_bytes([0x02; 32]),
        };
        let bytes = account.to_bytes();
        assert_eq!(bytes.len(), FIXED_LEN + 3);
        assert_eq!(Account::from_bytes(&bytes), Some(account));
    }

    #[test]
    fn test_account_without_code() {
        let account = Account::new(Address::from_u64(1));
        let decoded = Account::from_bytes(&account.to_bytes()).unwrap();
        assert!(decoded.code.is_empty());
    }

    #[test]
    fn test_truncated_bytes_rejected() {
        let bytes = Account::new(Address::ZERO).to_bytes();
        assert!(Account::from_bytes(&bytes[..FIXED_LEN - 1]).is_none());
        assert!(Account::from_bytes(&[]).is_none());
    }
}
