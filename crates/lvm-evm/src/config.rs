//! VM configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gas::GasSchedule;

/// Default maximum call depth
pub const DEFAULT_MAX_CALL_DEPTH: usize = 64;
/// Default maximum stack depth
pub const DEFAULT_MAX_STACK_DEPTH: usize = 1024;
/// Default memory cap per frame (16 MiB)
pub const DEFAULT_MAX_MEMORY_BYTES: usize = 16 * 1024 * 1024;

/// Limits and costs applied to every frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Deepest nesting of CALL/CALLCODE/DELEGATECALL/CREATE, top level is 0
    pub max_call_depth: usize,
    /// Items a frame's stack may hold
    pub max_stack_depth: usize,
    /// Bytes a frame's memory may grow to
    pub max_memory_bytes: usize,
    /// Gas costs
    pub gas_schedule: GasSchedule,
    /// Dispatch calls to the native contract addresses
    pub enable_natives: bool,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
            max_stack_depth: DEFAULT_MAX_STACK_DEPTH,
            max_memory_bytes: DEFAULT_MAX_MEMORY_BYTES,
            gas_schedule: GasSchedule::default(),
            enable_natives: true,
        }
    }
}

impl VmConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Read and parse a JSON file
    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(std::io::Error::from)
    }
}
