//! Gas costs and the gas meter

use serde::{Deserialize, Serialize};

use crate::error::{VmError, VmResult};
use crate::opcode::Opcode;

/// Default gas costs
pub mod cost {
    /// Zero gas
    pub const ZERO: u64 = 0;
    /// Base gas
    pub const BASE: u64 = 2;
    /// Very low gas
    pub const VERYLOW: u64 = 3;
    /// Low gas
    pub const LOW: u64 = 5;
    /// Mid gas
    pub const MID: u64 = 8;
    /// High gas
    pub const HIGH: u64 = 10;

    /// Jump dest gas
    pub const JUMPDEST: u64 = 1;
    /// Exp gas
    pub const EXP: u64 = 10;
    /// Exp byte gas
    pub const EXP_BYTE: u64 = 50;
    /// SHA3 base gas
    pub const SHA3: u64 = 30;
    /// SHA3 word gas
    pub const SHA3_WORD: u64 = 6;
    /// Copy gas per word
    pub const COPY: u64 = 3;
    /// Memory gas per word
    pub const MEMORY: u64 = 3;
    /// Quadratic memory divisor
    pub const MEMORY_QUAD_DIVISOR: u64 = 512;

    /// Balance gas
    pub const BALANCE: u64 = 400;
    /// EXTCODESIZE / EXTCODECOPY base gas
    pub const EXT_CODE: u64 = 700;
    /// Blockhash gas
    pub const BLOCKHASH: u64 = 20;

    /// Sload gas
    pub const SLOAD: u64 = 200;
    /// Sstore gas when a zero slot becomes non-zero
    pub const SSTORE_SET: u64 = 20000;
    /// Sstore gas otherwise
    pub const SSTORE_RESET: u64 = 5000;

    /// Log gas
    pub const LOG: u64 = 375;
    /// Log topic gas
    pub const LOG_TOPIC: u64 = 375;
    /// Log data gas (per byte)
    pub const LOG_DATA: u64 = 8;

    /// Create gas
    pub const CREATE: u64 = 32000;
    /// Call gas
    pub const CALL: u64 = 700;
    /// Call value transfer gas
    pub const CALL_VALUE: u64 = 9000;

    /// SHA-256 native base gas
    pub const SHA256: u64 = 60;
    /// SHA-256 native word gas
    pub const SHA256_WORD: u64 = 12;
    /// Identity native base gas
    pub const IDENTITY: u64 = 15;
    /// Identity native word gas
    pub const IDENTITY_WORD: u64 = 3;
}

/// Every tunable gas cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasSchedule {
    /// Base tier
    pub base: u64,
    /// Very-low tier
    pub verylow: u64,
    /// Low tier
    pub low: u64,
    /// Mid tier
    pub mid: u64,
    /// High tier
    pub high: u64,
    /// JUMPDEST
    pub jumpdest: u64,
    /// EXP base
    pub exp: u64,
    /// EXP per exponent byte
    pub exp_byte: u64,
    /// SHA3 base
    pub sha3: u64,
    /// SHA3 per word
    pub sha3_word: u64,
    /// Copy per word
    pub copy: u64,
    /// Memory per word
    pub memory: u64,
    /// Quadratic memory divisor
    pub memory_quad_divisor: u64,
    /// BALANCE
    pub balance: u64,
    /// EXTCODESIZE and EXTCODECOPY base
    pub ext_code: u64,
    /// BLOCKHASH
    pub blockhash: u64,
    /// SLOAD
    pub sload: u64,
    /// SSTORE zero to non-zero
    pub sstore_set: u64,
    /// SSTORE otherwise
    pub sstore_reset: u64,
    /// LOG base
    pub log: u64,
    /// LOG per topic
    pub log_topic: u64,
    /// LOG per data byte
    pub log_data: u64,
    /// CREATE
    pub create: u64,
    /// CALL, CALLCODE, DELEGATECALL
    pub call: u64,
    /// Extra for a call carrying value
    pub call_value: u64,
    /// SHA-256 native base
    pub sha256: u64,
    /// SHA-256 native per word
    pub sha256_word: u64,
    /// Identity native base
    pub identity: u64,
    /// Identity native per word
    pub identity_word: u64,
}

impl Default for GasSchedule {
    fn default() -> Self {
        Self {
            base: cost::BASE,
            verylow: cost::VERYLOW,
            low: cost::LOW,
            mid: cost::MID,
            high: cost::HIGH,
            jumpdest: cost::JUMPDEST,
            exp: cost::EXP,
            exp_byte: cost::EXP_BYTE,
            sha3: cost::SHA3,
            sha3_word: cost::SHA3_WORD,
            copy: cost::COPY,
            memory: cost::MEMORY,
            memory_quad_divisor: cost::MEMORY_QUAD_DIVISOR,
            balance: cost::BALANCE,
            ext_code: cost::EXT_CODE,
            blockhash: cost::BLOCKHASH,
            sload: cost::SLOAD,
            sstore_set: cost::SSTORE_SET,
            sstore_reset: cost::SSTORE_RESET,
            log: cost::LOG,
            log_topic: cost::LOG_TOPIC,
            log_data: cost::LOG_DATA,
            create: cost::CREATE,
            call: cost::CALL,
            call_value: cost::CALL_VALUE,
            sha256: cost::SHA256,
            sha256_word: cost::SHA256_WORD,
            identity: cost::IDENTITY,
            identity_word: cost::IDENTITY_WORD,
        }
    }
}

fn words(len: usize) -> u64 {
    len.div_ceil(32) as u64
}

impl GasSchedule {
    /// Static gas cost for an opcode, charged before it executes
    pub fn static_gas(&self, opcode: Opcode) -> u64 {
        match opcode {
            op if op.is_push() || op.dup_depth() > 0 || op.swap_depth() > 0 => self.verylow,
            op if op.is_log() => self
                .log_topic
                .saturating_mul(op.log_topics() as u64)
                .saturating_add(self.log),

            Opcode::STOP | Opcode::RETURN | Opcode::REVERT | Opcode::INVALID => cost::ZERO,

            Opcode::ADDRESS | Opcode::ORIGIN | Opcode::CALLER | Opcode::CALLVALUE |
            Opcode::CALLDATASIZE | Opcode::CODESIZE | Opcode::GASPRICE |
            Opcode::COINBASE | Opcode::TIMESTAMP | Opcode::NUMBER |
            Opcode::DIFFICULTY | Opcode::GASLIMIT | Opcode::RETURNDATASIZE |
            Opcode::POP | Opcode::PC | Opcode::MSIZE | Opcode::GAS => self.base,

            Opcode::ADD | Opcode::SUB | Opcode::NOT | Opcode::LT | Opcode::GT |
            Opcode::SLT | Opcode::SGT | Opcode::EQ | Opcode::ISZERO |
            Opcode::AND | Opcode::OR | Opcode::XOR | Opcode::BYTE |
            Opcode::SHL | Opcode::SHR | Opcode::SAR |
            Opcode::CALLDATALOAD | Opcode::MLOAD | Opcode::MSTORE | Opcode::MSTORE8 |
            Opcode::CALLDATACOPY | Opcode::CODECOPY | Opcode::RETURNDATACOPY => self.verylow,

            Opcode::MUL | Opcode::DIV | Opcode::SDIV | Opcode::MOD |
            Opcode::SMOD | Opcode::SIGNEXTEND => self.low,

            Opcode::ADDMOD | Opcode::MULMOD | Opcode::JUMP => self.mid,

            Opcode::JUMPI => self.high,

            Opcode::JUMPDEST => self.jumpdest,

            Opcode::EXP => self.exp,
            Opcode::SHA3 => self.sha3,
            Opcode::BALANCE => self.balance,
            Opcode::EXTCODESIZE | Opcode::EXTCODECOPY => self.ext_code,
            Opcode::BLOCKHASH => self.blockhash,
            Opcode::SLOAD => self.sload,
            // depends on the slot's current value
            Opcode::SSTORE => cost::ZERO,
            Opcode::CREATE => self.create,
            Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => self.call,

            // PUSH, DUP, SWAP and LOG are matched by the guards above
            _ => cost::ZERO,
        }
    }

    /// Cost of growing memory from `current_size` to `new_size` bytes
    pub fn memory_gas(&self, current_size: usize, new_size: usize) -> u64 {
        if new_size <= current_size {
            return 0;
        }
        let new_cost = self.memory_word_cost(words(new_size));
        let old_cost = self.memory_word_cost(words(current_size));
        new_cost.saturating_sub(old_cost)
    }

    fn memory_word_cost(&self, words: u64) -> u64 {
        let quad = words.saturating_mul(words) / self.memory_quad_divisor.max(1);
        self.memory.saturating_mul(words).saturating_add(quad)
    }

    /// Per-word cost of CALLDATACOPY, CODECOPY and friends
    pub fn copy_gas(&self, length: usize) -> u64 {
        self.copy.saturating_mul(words(length))
    }

    /// Dynamic EXP cost for an exponent of `exponent_bytes` significant bytes
    pub fn exp_gas(&self, exponent_bytes: u64) -> u64 {
        self.exp_byte.saturating_mul(exponent_bytes)
    }

    /// Dynamic SHA3 cost
    pub fn sha3_gas(&self, length: usize) -> u64 {
        self.sha3_word.saturating_mul(words(length))
    }

    /// Dynamic LOG cost
    pub fn log_data_gas(&self, data_size: usize) -> u64 {
        self.log_data.saturating_mul(data_size as u64)
    }

    /// SSTORE cost given the slot's current and new values
    pub fn sstore_gas(&self, current_is_zero: bool, new_is_zero: bool) -> u64 {
        if current_is_zero && !new_is_zero {
            self.sstore_set
        } else {
            self.sstore_reset
        }
    }
}

/// Remaining gas for one call chain.
///
/// A top-level call owns one meter. Sub-calls take a bounded slice with
/// [`split`](GasMeter::split) and hand back what they did not use with
/// [`refund`](GasMeter::refund).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GasMeter {
    remaining: u64,
}

impl GasMeter {
    /// Meter holding `limit` gas
    pub fn new(limit: u64) -> Self {
        Self { remaining: limit }
    }

    /// Gas left
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Deduct `amount`, failing without deducting anything if it exceeds
    /// what is left
    pub fn charge(&mut self, amount: u64) -> VmResult<()> {
        if amount > self.remaining {
            return Err(VmError::OutOfGas);
        }
        self.remaining -= amount;
        Ok(())
    }

    /// Carve out a sub-budget: `requested` capped at what is left, or
    /// everything when unspecified
    pub fn split(&mut self, requested: Option<u64>) -> GasMeter {
        let amount = requested.map_or(self.remaining, |r| r.min(self.remaining));
        self.remaining -= amount;
        GasMeter::new(amount)
    }

    /// Return a sub-budget's unused gas
    pub fn refund(&mut self, sub: GasMeter) {
        self.remaining = self.remaining.saturating_add(sub.remaining);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_gas() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.static_gas(Opcode::STOP), 0);
        assert_eq!(schedule.static_gas(Opcode::ADD), 3);
        assert_eq!(schedule.static_gas(Opcode::MUL), 5);
        assert_eq!(schedule.static_gas(Opcode::JUMP), 8);
        assert_eq!(schedule.static_gas(Opcode::JUMPI), 10);
        assert_eq!(schedule.static_gas(Opcode::JUMPDEST), 1);
        assert_eq!(schedule.static_gas(Opcode::PUSH32), 3);
        assert_eq!(schedule.static_gas(Opcode::DUP16), 3);
        assert_eq!(schedule.static_gas(Opcode::SWAP1), 3);
        assert_eq!(schedule.static_gas(Opcode::LOG2), 375 * 3);
        assert_eq!(schedule.static_gas(Opcode::CALL), 700);
        assert_eq!(schedule.static_gas(Opcode::CREATE), 32000);
        assert_eq!(schedule.static_gas(Opcode::SSTORE), 0);
    }

    #[test]
    fn test_memory_gas() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.memory_gas(32, 32), 0);
        assert_eq!(schedule.memory_gas(64, 32), 0);
        assert_eq!(schedule.memory_gas(0, 32), 3);
        assert_eq!(schedule.memory_gas(0, 64), 6);
        // 1024 words: 3 * 1024 + 1024 * 1024 / 512
        assert_eq!(schedule.memory_gas(0, 32 * 1024), 3072 + 2048);
    }

    #[test]
    fn test_memory_gas_superlinear() {
        let schedule = GasSchedule::default();
        let first = schedule.memory_gas(0, 32 * 1000);
        let second = schedule.memory_gas(32 * 1000, 32 * 2000);
        assert!(second > first);
    }

    #[test]
    fn test_dynamic_costs() {
        let schedule = GasSchedule::default();
        assert_eq!(schedule.copy_gas(0), 0);
        assert_eq!(schedule.copy_gas(33), 6);
        assert_eq!(schedule.exp_gas(2), 100);
        assert_eq!(schedule.sha3_gas(64), 12);
        assert_eq!(schedule.log_data_gas(10), 80);
        assert_eq!(schedule.sstore_gas(true, false), 20000);
        assert_eq!(schedule.sstore_gas(false, false), 5000);
        assert_eq!(schedule.sstore_gas(true, true), 5000);
    }

    #[test]
    fn test_log_cost_saturates() {
        let schedule = GasSchedule {
            log_topic: u64::MAX / 2,
            ..GasSchedule::default()
        };
        assert_eq!(schedule.static_gas(Opcode::LOG4), u64::MAX);
    }

    #[test]
    fn test_schedule_partial_json() {
        let schedule: GasSchedule = serde_json::from_str(r#"{"sload": 50}"#).unwrap();
        assert_eq!(schedule.sload, 50);
        assert_eq!(schedule.call, cost::CALL);
    }

    #[test]
    fn test_meter_charge() {
        let mut gas = GasMeter::new(10);
        gas.charge(4).unwrap();
        assert_eq!(gas.remaining(), 6);
        assert_eq!(gas.charge(7), Err(VmError::OutOfGas));
        assert_eq!(gas.remaining(), 6);
        gas.charge(6).unwrap();
        assert_eq!(gas.remaining(), 0);
    }

    #[test]
    fn test_meter_split_and_refund() {
        let mut gas = GasMeter::new(100);
        let mut sub = gas.split(Some(30));
        assert_eq!(gas.remaining(), 70);
        sub.charge(10).unwrap();
        gas.refund(sub);
        assert_eq!(gas.remaining(), 90);

        let capped = gas.split(Some(1_000));
        assert_eq!(capped.remaining(), 90);
        assert_eq!(gas.remaining(), 0);
        gas.refund(capped);

        let all = gas.split(None);
        assert_eq!(all.remaining(), 90);
    }
}
