//! Frame memory
//!
//! Memory grows in 32-byte words. Growth is never implicit: the interpreter
//! computes the required size with [`required_size`], charges the expansion
//! gas, then calls [`Memory::resize`]. Accessors assume the range has already
//! been made resident.

use primitive_types::U256;

use crate::error::{VmError, VmResult};
use crate::stack::to_usize;

/// Byte-addressable, word-aligned, expandable memory
#[derive(Clone, Debug, Default)]
pub struct Memory {
    data: Vec<u8>,
}

impl Memory {
    /// Create new empty memory
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// Get current memory size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Grow to cover `end` bytes, rounded up to a word. Never shrinks.
    pub fn resize(&mut self, end: usize) {
        let aligned = end.div_ceil(32) * 32;
        if aligned > self.data.len() {
            self.data.resize(aligned, 0);
        }
    }

    /// Load a 32-byte word
    pub fn load(&self, offset: usize) -> U256 {
        U256::from_big_endian(&self.load_slice(offset, 32))
    }

    /// Store a 32-byte word
    pub fn store(&mut self, offset: usize, value: U256) {
        let mut word = [0u8; 32];
        value.to_big_endian(&mut word);
        self.store_slice(offset, &word);
    }

    /// Store a single byte
    pub fn store8(&mut self, offset: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(offset) {
            *slot = value;
        }
    }

    /// Copy `size` bytes out, zero-filling anything past the end
    pub fn load_slice(&self, offset: usize, size: usize) -> Vec<u8> {
        let mut result = vec![0u8; size];
        if offset < self.data.len() {
            let end = offset.saturating_add(size).min(self.data.len());
            result[..end - offset].copy_from_slice(&self.data[offset..end]);
        }
        result
    }

    /// Write `data` at `offset`, truncated at the end of memory
    pub fn store_slice(&mut self, offset: usize, data: &[u8]) {
        if offset >= self.data.len() {
            return;
        }
        let end = offset.saturating_add(data.len()).min(self.data.len());
        self.data[offset..end].copy_from_slice(&data[..end - offset]);
    }

    /// Get memory contents
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// `size` bytes of `src` starting at `offset`, zero-filled past its end
pub fn padded_slice(src: &[u8], offset: U256, size: usize) -> Vec<u8> {
    let mut chunk = vec![0u8; size];
    if let Some(start) = to_usize(offset) {
        if start < src.len() {
            let end = start.saturating_add(size).min(src.len());
            chunk[..end - start].copy_from_slice(&src[start..end]);
        }
    }
    chunk
}

/// End offset an access of `size` bytes at `offset` needs resident.
///
/// Returns `None` for zero-sized accesses, which never expand memory
/// whatever their offset.
pub fn required_size(offset: U256, size: U256, limit: usize) -> VmResult<Option<usize>> {
    if size.is_zero() {
        return Ok(None);
    }
    let offset = to_usize(offset).ok_or(VmError::MemoryExpansionTooLarge)?;
    let size = to_usize(size).ok_or(VmError::MemoryExpansionTooLarge)?;
    let end = offset
        .checked_add(size)
        .ok_or(VmError::MemoryExpansionTooLarge)?;
    if end > limit {
        return Err(VmError::MemoryExpansionTooLarge);
    }
    Ok(Some(end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_resize_word_alignment() {
        let mut mem = Memory::new();
        assert_eq!(mem.size(), 0);
        mem.resize(1);
        assert_eq!(mem.size(), 32);
        mem.resize(33);
        assert_eq!(mem.size(), 64);
        mem.resize(10);
        assert_eq!(mem.size(), 64);
    }

    #[test]
    fn test_memory_store_load() {
        let mut mem = Memory::new();
        mem.resize(64);
        mem.store(0, U256::from(0x1234));
        assert_eq!(mem.load(0), U256::from(0x1234));
        assert_eq!(mem.data()[31], 0x34);
        assert_eq!(mem.load(32), U256::zero());
    }

    #[test]
    fn test_memory_store8() {
        let mut mem = Memory::new();
        mem.resize(32);
        mem.store8(5, 0xab);
        assert_eq!(mem.data()[5], 0xab);
    }

    #[test]
    fn test_load_slice_beyond_memory() {
        let mut mem = Memory::new();
        mem.resize(32);
        mem.store8(31, 7);
        assert_eq!(mem.load_slice(31, 3), vec![7, 0, 0]);
        assert_eq!(mem.load_slice(100, 2), vec![0, 0]);
        assert!(mem.load_slice(0, 0).is_empty());
    }

    #[test]
    fn test_padded_slice() {
        assert_eq!(padded_slice(&[1, 2, 3], U256::from(1), 4), vec![2, 3, 0, 0]);
        assert_eq!(padded_slice(&[9], U256::MAX, 2), vec![0, 0]);
        assert!(padded_slice(&[9], U256::zero(), 0).is_empty());
    }

    #[test]
    fn test_required_size() {
        let limit = 1024;
        assert_eq!(required_size(U256::MAX, U256::zero(), limit), Ok(None));
        assert_eq!(required_size(U256::from(10), U256::from(22), limit), Ok(Some(32)));
        assert_eq!(
            required_size(U256::from(1000), U256::from(100), limit),
            Err(VmError::MemoryExpansionTooLarge)
        );
        assert_eq!(
            required_size(U256::MAX, U256::one(), limit),
            Err(VmError::MemoryExpansionTooLarge)
        );
    }
}
