//! Genesis-style JSON state files
//!
//! ```json
//! {
//!   "global_permissions": { "send": false },
//!   "params": { "block_height": 7, "block_time": 1700000000 },
//!   "accounts": [
//!     {
//!       "address": "0x64",
//!       "balance": "0x2710",
//!       "code": "60146000526020600060f3",
//!       "storage": { "0x01": "0x2a" },
//!       "permissions": { "create_contract": false }
//!     }
//!   ]
//! }
//! ```
//!
//! Global permissions start from the default set; listed names override it.
//! Account permissions only set the bits they name.

use std::collections::BTreeMap;
use std::path::Path;

use lvm_evm::Params;
use lvm_primitives::{Address, Word256};
use lvm_state::permission::{
    global_permissions_account, perm_flag_from_name, BasePermissions, DEFAULT_PERMISSIONS,
};
use lvm_state::{Account, AccountStore};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CliError;

/// Whole state file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisState {
    /// Overrides applied to the default global permissions
    pub global_permissions: BTreeMap<String, bool>,
    /// Block parameters
    pub params: GenesisParams,
    /// Accounts to seed
    pub accounts: Vec<GenesisAccount>,
}

/// Block parameters of the run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisParams {
    /// Block height
    pub block_height: u64,
    /// Block hash as hex, zero when absent
    pub block_hash: Option<String>,
    /// Block timestamp
    pub block_time: u64,
    /// Block gas limit
    pub gas_limit: u64,
}

/// One seeded account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Address as hex, left-padded
    pub address: Address,
    /// Balance as hex (`0x` prefix) or decimal
    #[serde(default)]
    pub balance: Option<String>,
    /// Code as hex
    #[serde(default)]
    pub code: Option<String>,
    /// Nonce
    #[serde(default)]
    pub nonce: u64,
    /// Storage slots, hex key to hex value
    #[serde(default)]
    pub storage: BTreeMap<String, String>,
    /// Explicitly set permission bits
    #[serde(default)]
    pub permissions: BTreeMap<String, bool>,
}

impl GenesisState {
    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CliError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Write the global permissions account and every listed account into `store`
    pub fn apply<S: AccountStore>(&self, store: &mut S) -> Result<(), CliError> {
        let mut global = DEFAULT_PERMISSIONS;
        apply_permissions(&mut global, &self.global_permissions)?;
        store.update_account(global_permissions_account(global))?;

        for entry in &self.accounts {
            let mut account = Account::new(entry.address);
            if let Some(balance) = &entry.balance {
                account.balance = parse_amount(balance)?;
            }
            if let Some(code) = &entry.code {
                account.code = parse_hex(code)?;
            }
            account.nonce = entry.nonce;
            apply_permissions(&mut account.permissions, &entry.permissions)?;
            store.update_account(account)?;

            for (key, value) in &entry.storage {
                store.set_storage(&entry.address, parse_word(key)?, parse_word(value)?)?;
            }
            debug!(address = %entry.address, slots = entry.storage.len(), "seeded account");
        }
        Ok(())
    }

    /// Block parameters for the VM
    pub fn params(&self) -> Result<Params, CliError> {
        let block_hash = match &self.params.block_hash {
            Some(hash) => parse_word(hash)?,
            None => Word256::ZERO,
        };
        Ok(Params {
            block_height: self.params.block_height,
            block_hash,
            block_time: self.params.block_time,
            gas_limit: self.params.gas_limit,
        })
    }

    /// The code stored for `address`, if any
    pub fn code_of(&self, address: &Address) -> Result<Option<Vec<u8>>, CliError> {
        match self.accounts.iter().find(|a| a.address == *address) {
            Some(GenesisAccount {
                code: Some(code), ..
            }) => parse_hex(code).map(Some),
            _ => Ok(None),
        }
    }
}

fn apply_permissions(
    perms: &mut BasePermissions,
    names: &BTreeMap<String, bool>,
) -> Result<(), CliError> {
    for (name, value) in names {
        let flag =
            perm_flag_from_name(name).ok_or_else(|| CliError::InvalidPermission(name.clone()))?;
        perms.set(flag, *value);
    }
    Ok(())
}

/// Decode hex with an optional `0x` prefix
pub fn parse_hex(s: &str) -> Result<Vec<u8>, CliError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| CliError::InvalidHex(format!("{}: {}", s, e)))
}

/// Parse an address, left-padding short input
pub fn parse_address(s: &str) -> Result<Address, CliError> {
    Address::from_hex(s).map_err(|e| CliError::InvalidAddress(format!("{}: {}", s, e)))
}

/// Parse `0x`-prefixed hex or decimal into an amount
pub fn parse_amount(s: &str) -> Result<u128, CliError> {
    let parsed = match s.strip_prefix("0x") {
        Some(digits) => u128::from_str_radix(digits, 16),
        None => s.parse(),
    };
    parsed.map_err(|e| CliError::InvalidAmount(format!("{}: {}", s, e)))
}

fn parse_word(s: &str) -> Result<Word256, CliError> {
    Word256::from_hex(s).map_err(|e| CliError::InvalidHex(format!("{}: {}", s, e)))
}
