//! Bytecode assembly helper

use crate::opcode::Opcode;

/// Builds bytecode one instruction at a time.
///
/// ```
/// use lvm_evm::{Asm, Opcode};
///
/// let code = Asm::new().push(&[20]).op(Opcode::POP).build();
/// assert_eq!(code, vec![0x60, 20, 0x50]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Asm {
    code: Vec<u8>,
}

impl Asm {
    /// Empty program
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one opcode
    pub fn op(mut self, op: Opcode) -> Self {
        self.code.push(op.as_byte());
        self
    }

    /// Append the smallest PUSHn carrying `bytes`.
    ///
    /// Leading zero bytes are kept. An empty slice pushes a single zero byte;
    /// anything longer than 32 bytes keeps its last 32.
    pub fn push(mut self, bytes: &[u8]) -> Self {
        let bytes = match bytes.len() {
            0 => &[0u8][..],
            n if n > 32 => &bytes[n - 32..],
            _ => bytes,
        };
        if let Some(op) = Opcode::push_n(bytes.len()) {
            self.code.push(op.as_byte());
            self.code.extend_from_slice(bytes);
        }
        self
    }

    /// Push `n` using as few bytes as possible
    pub fn push_u64(self, n: u64) -> Self {
        let bytes = n.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count().min(7);
        self.push(&bytes[skip..])
    }

    /// Append raw bytes, e.g. operand data or another program
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.code.extend_from_slice(bytes);
        self
    }

    /// Current length, useful for computing jump targets
    pub fn len(&self) -> usize {
        self.code.len()
    }

    /// Whether nothing has been appended yet
    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// The assembled bytecode
    pub fn build(self) -> Vec<u8> {
        self.code
    }
}

/// `PUSH1 0 MSTORE PUSH1 32 PUSH1 0 RETURN`: stores the top of the stack at
/// memory 0 and returns it as one word
pub fn return_word() -> Vec<u8> {
    Asm::new()
        .push(&[0])
        .op(Opcode::MSTORE)
        .push(&[32])
        .push(&[0])
        .op(Opcode::RETURN)
        .build()
}

/// Concatenate code fragments
pub fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}
