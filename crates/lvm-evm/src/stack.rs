//! Value stack and 256-bit word helpers

use primitive_types::{U256, U512};

use crate::error::{VmError, VmResult};

/// Interpreter stack of 256-bit words with a fixed depth limit
#[derive(Clone, Debug)]
pub struct Stack {
    data: Vec<U256>,
    limit: usize,
}

impl Stack {
    /// Create an empty stack holding at most `limit` items
    pub fn new(limit: usize) -> Self {
        Self {
            data: Vec::with_capacity(limit.min(64)),
            limit,
        }
    }

    /// Push a value onto the stack
    pub fn push(&mut self, value: U256) -> VmResult<()> {
        if self.data.len() >= self.limit {
            return Err(VmError::StackOverflow);
        }
        self.data.push(value);
        Ok(())
    }

    /// Push 1 for true, 0 for false
    pub fn push_bool(&mut self, value: bool) -> VmResult<()> {
        self.push(if value { U256::one() } else { U256::zero() })
    }

    /// Pop a value from the stack
    pub fn pop(&mut self) -> VmResult<U256> {
        self.data.pop().ok_or(VmError::StackUnderflow)
    }

    /// Pop `N` values, top first
    pub fn pop_n<const N: usize>(&mut self) -> VmResult<[U256; N]> {
        if self.data.len() < N {
            return Err(VmError::StackUnderflow);
        }
        let mut out = [U256::zero(); N];
        for slot in out.iter_mut() {
            *slot = self.pop()?;
        }
        Ok(out)
    }

    /// Peek at the top of the stack
    pub fn peek(&self) -> VmResult<&U256> {
        self.data.last().ok_or(VmError::StackUnderflow)
    }

    /// Swap top with item at depth (1 = swap with second item)
    pub fn swap(&mut self, depth: usize) -> VmResult<()> {
        let len = self.data.len();
        if depth == 0 || depth >= len {
            return Err(VmError::StackUnderflow);
        }
        self.data.swap(len - 1, len - 1 - depth);
        Ok(())
    }

    /// Duplicate item at depth to top (1 = dup top)
    pub fn dup(&mut self, depth: usize) -> VmResult<()> {
        if depth == 0 || depth > self.data.len() {
            return Err(VmError::StackUnderflow);
        }
        let value = self.data[self.data.len() - depth];
        self.push(value)
    }

    /// Get current stack size
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if stack is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

// U256 helper functions

const SIGN_BIT: usize = 255;

/// Convert to usize if it fits
pub fn to_usize(value: U256) -> Option<usize> {
    if value > U256::from(usize::MAX) {
        None
    } else {
        Some(value.low_u64() as usize)
    }
}

/// Convert to u64, saturating at `u64::MAX`
pub fn saturating_u64(value: U256) -> u64 {
    if value > U256::from(u64::MAX) {
        u64::MAX
    } else {
        value.low_u64()
    }
}

/// Convert to u128, saturating at `u128::MAX`
pub fn saturating_u128(value: U256) -> u128 {
    if value > U256::from(u128::MAX) {
        u128::MAX
    } else {
        value.low_u128()
    }
}

fn is_negative(value: U256) -> bool {
    value.bit(SIGN_BIT)
}

fn negate(value: U256) -> U256 {
    (!value).overflowing_add(U256::one()).0
}

fn abs(value: U256) -> U256 {
    if is_negative(value) {
        negate(value)
    } else {
        value
    }
}

/// Signed division, zero divisor yields zero
pub fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

/// Signed modulo, result takes the dividend's sign
pub fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let rem = abs(a) % abs(b);
    if is_negative(a) {
        negate(rem)
    } else {
        rem
    }
}

/// (a + b) mod n without intermediate overflow
pub fn addmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    let sum = U512::from(a) + U512::from(b);
    narrow(sum % U512::from(n))
}

/// (a * b) mod n without intermediate overflow
pub fn mulmod(a: U256, b: U256, n: U256) -> U256 {
    if n.is_zero() {
        return U256::zero();
    }
    narrow(a.full_mul(b) % U512::from(n))
}

// Callers only pass values already reduced below a U256 modulus.
fn narrow(value: U512) -> U256 {
    U256::try_from(value).unwrap_or_else(|_| U256::MAX)
}

/// Extend the sign of the low `byte + 1` bytes of `value`
pub fn signextend(byte: U256, value: U256) -> U256 {
    if byte >= U256::from(31) {
        return value;
    }
    let bit = byte.low_u64() as usize * 8 + 7;
    let mask = (U256::one() << bit) - U256::one();
    if value.bit(bit) {
        value | !mask
    } else {
        value & mask
    }
}

/// Signed less-than
pub fn slt(a: U256, b: U256) -> bool {
    let sign = U256::one() << SIGN_BIT;
    (a ^ sign) < (b ^ sign)
}

/// Byte `index` of `value`, counted from the most significant end
pub fn byte_at(index: U256, value: U256) -> U256 {
    match to_usize(index) {
        Some(i) if i < 32 => U256::from(value.byte(31 - i)),
        _ => U256::zero(),
    }
}

/// Logical shift left
pub fn shl(shift: U256, value: U256) -> U256 {
    match to_usize(shift) {
        Some(s) if s < 256 => value << s,
        _ => U256::zero(),
    }
}

/// Logical shift right
pub fn shr(shift: U256, value: U256) -> U256 {
    match to_usize(shift) {
        Some(s) if s < 256 => value >> s,
        _ => U256::zero(),
    }
}

/// Arithmetic shift right
pub fn sar(shift: U256, value: U256) -> U256 {
    let negative = is_negative(value);
    match to_usize(shift) {
        Some(s) if s < 256 => {
            let shifted = value >> s;
            if negative {
                shifted | !(U256::MAX >> s)
            } else {
                shifted
            }
        }
        _ if negative => U256::MAX,
        _ => U256::zero(),
    }
}

/// Number of significant bytes in `value`
pub fn byte_len(value: U256) -> u64 {
    (value.bits() as u64).div_ceil(8)
}
