//! Interpreter core

use lvm_crypto::keccak256;
use lvm_events::EventDataLog;
use lvm_primitives::{Address, Word256};
use lvm_state::{permission, Account, AccountStore};
use primitive_types::U256;
use tracing::trace;

use crate::config::VmConfig;
use crate::context::{CallFrame, CallKind};
use crate::error::{VmError, VmResult};
use crate::gas::{GasMeter, GasSchedule};
use crate::memory::{padded_slice, required_size, Memory};
use crate::natives;
use crate::opcode::Opcode;
use crate::stack::{self, Stack};
use crate::vm::{Body, Vm};

/// Mark every offset holding a JUMPDEST that is not PUSH operand data
pub fn analyze_jump_dests(code: &[u8]) -> Vec<bool> {
    let mut dests = vec![false; code.len()];
    let mut i = 0;
    while i < code.len() {
        match Opcode::from_byte(code[i]) {
            Some(Opcode::JUMPDEST) => {
                dests[i] = true;
                i += 1;
            }
            Some(op) => i += 1 + op.push_size(),
            None => i += 1,
        }
    }
    dests
}

/// Address of the contract `creator` deploys with its `nonce`-th CREATE:
/// the last 20 bytes of keccak256(creator ‖ nonce as 8 big-endian bytes)
pub fn create_address(creator: &Address, nonce: u64) -> Address {
    let mut preimage = Vec::with_capacity(Address::LEN + 8);
    preimage.extend_from_slice(creator.as_bytes());
    preimage.extend_from_slice(&nonce.to_be_bytes());
    let hash = keccak256(&preimage);
    let mut tail = [0u8; 20];
    tail.copy_from_slice(&hash.as_bytes()[12..]);
    Address::from(tail)
}

/// Outcome of a sub-call as seen by the calling frame. Store failures are
/// not call-local and abort the caller too.
fn settle(result: VmResult<Vec<u8>>) -> VmResult<(bool, Vec<u8>)> {
    match result {
        Ok(output) => Ok((true, output)),
        Err(VmError::Reverted(output)) => Ok((false, output)),
        Err(err @ (VmError::State(_) | VmError::MissingGlobalPermissions)) => Err(err),
        Err(_) => Ok((false, Vec::new())),
    }
}

/// One frame's program counter, stack and memory
pub struct Interpreter<'a> {
    code: &'a [u8],
    pc: usize,
    stack: Stack,
    memory: Memory,
    return_data: Vec<u8>,
    jump_dests: Vec<bool>,
    memory_limit: usize,
}

impl<'a> Interpreter<'a> {
    /// Prepare `code` for execution
    pub fn new(code: &'a [u8], config: &VmConfig) -> Self {
        Self {
            code,
            pc: 0,
            stack: Stack::new(config.max_stack_depth),
            memory: Memory::new(),
            return_data: Vec::new(),
            jump_dests: analyze_jump_dests(code),
            memory_limit: config.max_memory_bytes,
        }
    }

    /// Execute until RETURN, STOP, the end of the code, or an error
    pub fn run<S: AccountStore>(
        &mut self,
        vm: &mut Vm<S>,
        frame: &CallFrame,
        gas: &mut GasMeter,
    ) -> VmResult<Vec<u8>> {
        while self.pc < self.code.len() {
            let byte = self.code[self.pc];
            let op = Opcode::from_byte(byte).ok_or(VmError::InvalidOpcode(byte))?;
            gas.charge(vm.config.gas_schedule.static_gas(op))?;
            trace!(pc = self.pc, ?op, gas = gas.remaining(), stack = self.stack.len(), "step");
            if let Some(output) = self.execute(vm, frame, gas, op)? {
                return Ok(output);
            }
        }
        Ok(Vec::new())
    }

    fn execute<S: AccountStore>(
        &mut self,
        vm: &mut Vm<S>,
        frame: &CallFrame,
        gas: &mut GasMeter,
        op: Opcode,
    ) -> VmResult<Option<Vec<u8>>> {
        match op {
            Opcode::STOP => return Ok(Some(Vec::new())),

            // Arithmetic
            Opcode::ADD => self.binary(|a, b| a.overflowing_add(b).0)?,
            Opcode::MUL => self.binary(|a, b| a.overflowing_mul(b).0)?,
            Opcode::SUB => self.binary(|a, b| a.overflowing_sub(b).0)?,
            Opcode::DIV => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a / b })?,
            Opcode::SDIV => self.binary(stack::sdiv)?,
            Opcode::MOD => self.binary(|a, b| if b.is_zero() { U256::zero() } else { a % b })?,
            Opcode::SMOD => self.binary(stack::smod)?,
            Opcode::ADDMOD => {
                let [a, b, n] = self.stack.pop_n()?;
                self.stack.push(stack::addmod(a, b, n))?;
            }
            Opcode::MULMOD => {
                let [a, b, n] = self.stack.pop_n()?;
                self.stack.push(stack::mulmod(a, b, n))?;
            }
            Opcode::EXP => {
                let [base, exponent] = self.stack.pop_n()?;
                gas.charge(vm.config.gas_schedule.exp_gas(stack::byte_len(exponent)))?;
                self.stack.push(base.overflowing_pow(exponent).0)?;
            }
            Opcode::SIGNEXTEND => self.binary(stack::signextend)?,

            // Comparison and bitwise
            Opcode::LT => self.compare(|a, b| a < b)?,
            Opcode::GT => self.compare(|a, b| a > b)?,
            Opcode::SLT => self.compare(stack::slt)?,
            Opcode::SGT => self.compare(|a, b| stack::slt(b, a))?,
            Opcode::EQ => self.compare(|a, b| a == b)?,
            Opcode::ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push_bool(a.is_zero())?;
            }
            Opcode::AND => self.binary(|a, b| a & b)?,
            Opcode::OR => self.binary(|a, b| a | b)?,
            Opcode::XOR => self.binary(|a, b| a ^ b)?,
            Opcode::NOT => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            Opcode::BYTE => self.binary(stack::byte_at)?,
            Opcode::SHL => self.binary(stack::shl)?,
            Opcode::SHR => self.binary(stack::shr)?,
            Opcode::SAR => self.binary(stack::sar)?,

            Opcode::SHA3 => {
                let [offset, size] = self.stack.pop_n()?;
                let (offset, size) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, size)?;
                gas.charge(vm.config.gas_schedule.sha3_gas(size))?;
                let hash = keccak256(&self.memory.load_slice(offset, size));
                self.stack.push(hash.to_u256())?;
            }

            // Environment
            Opcode::ADDRESS => self.stack.push(frame.callee.to_word())?,
            Opcode::BALANCE => {
                let address = Address::from_word(self.stack.pop()?);
                let balance = vm.state.get_account(&address)?.map_or(0, |a| a.balance);
                self.stack.push(U256::from(balance))?;
            }
            Opcode::ORIGIN => self.stack.push(vm.origin.to_word())?,
            Opcode::CALLER => self.stack.push(frame.caller.to_word())?,
            Opcode::CALLVALUE => self.stack.push(U256::from(frame.value))?,
            Opcode::CALLDATALOAD => {
                let offset = self.stack.pop()?;
                let word = padded_slice(&frame.input, offset, 32);
                self.stack.push(U256::from_big_endian(&word))?;
            }
            Opcode::CALLDATASIZE => self.stack.push(U256::from(frame.input.len()))?,
            Opcode::CALLDATACOPY => {
                self.copy_to_memory(&vm.config.gas_schedule, gas, &frame.input)?
            }
            Opcode::CODESIZE => self.stack.push(U256::from(self.code.len()))?,
            Opcode::CODECOPY => {
                let code = self.code;
                self.copy_to_memory(&vm.config.gas_schedule, gas, code)?;
            }
            Opcode::GASPRICE => self.stack.push(U256::zero())?,
            Opcode::EXTCODESIZE => {
                let address = Address::from_word(self.stack.pop()?);
                let size = vm.state.get_account(&address)?.map_or(0, |a| a.code.len());
                self.stack.push(U256::from(size))?;
            }
            Opcode::EXTCODECOPY => {
                let address = Address::from_word(self.stack.pop()?);
                let code = vm
                    .state
                    .get_account(&address)?
                    .map(|a| a.code)
                    .unwrap_or_default();
                self.copy_to_memory(&vm.config.gas_schedule, gas, &code)?;
            }
            Opcode::RETURNDATASIZE => self.stack.push(U256::from(self.return_data.len()))?,
            Opcode::RETURNDATACOPY => {
                let data = std::mem::take(&mut self.return_data);
                let copied = self.copy_to_memory(&vm.config.gas_schedule, gas, &data);
                self.return_data = data;
                copied?;
            }

            // Block
            Opcode::BLOCKHASH => {
                let height = self.stack.pop()?;
                let hash = if height == U256::from(vm.params.block_height) {
                    vm.params.block_hash.to_u256()
                } else {
                    U256::zero()
                };
                self.stack.push(hash)?;
            }
            Opcode::COINBASE | Opcode::DIFFICULTY => self.stack.push(U256::zero())?,
            Opcode::TIMESTAMP => self.stack.push(U256::from(vm.params.block_time))?,
            Opcode::NUMBER => self.stack.push(U256::from(vm.params.block_height))?,
            Opcode::GASLIMIT => self.stack.push(U256::from(vm.params.gas_limit))?,

            // Stack, memory, storage and flow
            Opcode::POP => {
                self.stack.pop()?;
            }
            Opcode::MLOAD => {
                let offset = self.stack.pop()?;
                let (offset, _) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, U256::from(32))?;
                self.stack.push(self.memory.load(offset))?;
            }
            Opcode::MSTORE => {
                let [offset, value] = self.stack.pop_n()?;
                let (offset, _) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, U256::from(32))?;
                self.memory.store(offset, value);
            }
            Opcode::MSTORE8 => {
                let [offset, value] = self.stack.pop_n()?;
                let (offset, _) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, U256::one())?;
                self.memory.store8(offset, value.byte(0));
            }
            Opcode::SLOAD => {
                let key = Word256::from(self.stack.pop()?);
                let value = vm.state.get_storage(&frame.callee, &key)?;
                self.stack.push(value.to_u256())?;
            }
            Opcode::SSTORE => {
                let [key, value] = self.stack.pop_n()?;
                let key = Word256::from(key);
                let current = vm.state.get_storage(&frame.callee, &key)?;
                gas.charge(
                    vm.config
                        .gas_schedule
                        .sstore_gas(current.is_zero(), value.is_zero()),
                )?;
                vm.state.set_storage(&frame.callee, key, Word256::from(value))?;
            }
            Opcode::JUMP => {
                let dest = self.stack.pop()?;
                self.pc = self.jump_target(dest)?;
                return Ok(None);
            }
            Opcode::JUMPI => {
                let [dest, condition] = self.stack.pop_n()?;
                if !condition.is_zero() {
                    self.pc = self.jump_target(dest)?;
                    return Ok(None);
                }
            }
            Opcode::PC => self.stack.push(U256::from(self.pc))?,
            Opcode::MSIZE => self.stack.push(U256::from(self.memory.size()))?,
            Opcode::GAS => self.stack.push(U256::from(gas.remaining()))?,
            Opcode::JUMPDEST => {}

            // System
            Opcode::CREATE => self.create(vm, frame, gas)?,
            Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => {
                self.call(vm, frame, gas, op)?
            }
            Opcode::RETURN => {
                let [offset, size] = self.stack.pop_n()?;
                let (offset, size) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, size)?;
                return Ok(Some(self.memory.load_slice(offset, size)));
            }
            Opcode::REVERT => {
                let [offset, size] = self.stack.pop_n()?;
                let (offset, size) =
                    self.expand_memory(&vm.config.gas_schedule, gas, offset, size)?;
                return Err(VmError::Reverted(self.memory.load_slice(offset, size)));
            }
            Opcode::INVALID => return Err(VmError::InvalidOpcode(op.as_byte())),

            op if op.is_push() => {
                let size = op.push_size();
                let operand = padded_slice(self.code, U256::from(self.pc + 1), size);
                self.stack.push(U256::from_big_endian(&operand))?;
                self.pc += size;
            }
            op if op.dup_depth() > 0 => self.stack.dup(op.dup_depth())?,
            op if op.swap_depth() > 0 => self.stack.swap(op.swap_depth())?,
            op if op.is_log() => self.log(vm, frame, gas, op.log_topics())?,
            op => return Err(VmError::InvalidOpcode(op.as_byte())),
        }

        self.pc += 1;
        Ok(None)
    }

    fn binary(&mut self, f: impl FnOnce(U256, U256) -> U256) -> VmResult<()> {
        let [a, b] = self.stack.pop_n()?;
        self.stack.push(f(a, b))
    }

    fn compare(&mut self, f: impl FnOnce(U256, U256) -> bool) -> VmResult<()> {
        let [a, b] = self.stack.pop_n()?;
        self.stack.push_bool(f(a, b))
    }

    fn jump_target(&self, dest: U256) -> VmResult<usize> {
        let target = stack::saturating_u64(dest) as usize;
        if self.jump_dests.get(target).copied().unwrap_or(false) {
            Ok(target)
        } else {
            Err(VmError::InvalidJumpDest(target))
        }
    }

    /// Charge for and perform the growth an access needs. Returns the access
    /// as `(offset, size)`, `(0, 0)` when it is zero-sized.
    fn expand_memory(
        &mut self,
        schedule: &GasSchedule,
        gas: &mut GasMeter,
        offset: U256,
        size: U256,
    ) -> VmResult<(usize, usize)> {
        let Some(end) = required_size(offset, size, self.memory_limit)? else {
            return Ok((0, 0));
        };
        gas.charge(schedule.memory_gas(self.memory.size(), end))?;
        self.memory.resize(end);
        let size = size.low_u64() as usize;
        Ok((end - size, size))
    }

    /// CALLDATACOPY, CODECOPY, EXTCODECOPY and RETURNDATACOPY
    fn copy_to_memory(
        &mut self,
        schedule: &GasSchedule,
        gas: &mut GasMeter,
        src: &[u8],
    ) -> VmResult<()> {
        let [dest, src_offset, size] = self.stack.pop_n()?;
        let (dest, size) = self.expand_memory(schedule, gas, dest, size)?;
        gas.charge(schedule.copy_gas(size))?;
        self.memory.store_slice(dest, &padded_slice(src, src_offset, size));
        Ok(())
    }

    fn log<S: AccountStore>(
        &mut self,
        vm: &mut Vm<S>,
        frame: &CallFrame,
        gas: &mut GasMeter,
        topic_count: usize,
    ) -> VmResult<()> {
        let [offset, size] = self.stack.pop_n()?;
        let mut topics = Vec::with_capacity(topic_count);
        for _ in 0..topic_count {
            topics.push(Word256::from(self.stack.pop()?));
        }
        let (offset, size) = self.expand_memory(&vm.config.gas_schedule, gas, offset, size)?;
        gas.charge(vm.config.gas_schedule.log_data_gas(size))?;
        vm.fire_log_event(EventDataLog {
            address: frame.callee,
            topics,
            data: self.memory.load_slice(offset, size),
            height: vm.params.block_height,
        });
        Ok(())
    }

    #[inline(never)]
    fn create<S: AccountStore>(
        &mut self,
        vm: &mut Vm<S>,
        frame: &CallFrame,
        gas: &mut GasMeter,
    ) -> VmResult<()> {
        let [value, offset, size] = self.stack.pop_n()?;
        let value = stack::saturating_u128(value);
        let (offset, size) = self.expand_memory(&vm.config.gas_schedule, gas, offset, size)?;
        let init_code = self.memory.load_slice(offset, size);

        vm.ensure_permission(&frame.callee, permission::CREATE_CONTRACT, "create_contract")?;
        if value > 0 {
            vm.ensure_permission(&frame.callee, permission::SEND, "send")?;
        }

        // The nonce bump belongs to the creating frame and survives a failed
        // creation.
        let mut creator = vm
            .state
            .get_account(&frame.callee)?
            .unwrap_or_else(|| Account::new(frame.callee));
        let address = create_address(&creator.address, creator.nonce);
        creator.nonce = creator.nonce.saturating_add(1);
        vm.state.update_account(creator)?;

        let sub_frame = CallFrame {
            caller: frame.callee,
            callee: address,
            code_address: address,
            input: Vec::new(),
            value,
            depth: frame.depth + 1,
            kind: CallKind::Create,
        };
        let mut sub_gas = gas.split(None);
        let result = vm.sub_call(
            sub_frame,
            Body::Code(&init_code),
            Some((frame.callee, address)),
            &mut sub_gas,
        );
        gas.refund(sub_gas);

        let (success, output) = settle(result)?;
        if success {
            self.return_data.clear();
            self.stack.push(address.to_word())
        } else {
            self.return_data = output;
            self.stack.push(U256::zero())
        }
    }

    #[inline(never)]
    fn call<S: AccountStore>(
        &mut self,
        vm: &mut Vm<S>,
        frame: &CallFrame,
        gas: &mut GasMeter,
        op: Opcode,
    ) -> VmResult<()> {
        let [gas_limit, to] = self.stack.pop_n()?;
        let value = match op {
            Opcode::DELEGATECALL => 0,
            _ => stack::saturating_u128(self.stack.pop()?),
        };
        let [in_offset, in_size, out_offset, out_size] = self.stack.pop_n()?;
        let target = Address::from_word(to);

        if value > 0 {
            gas.charge(vm.config.gas_schedule.call_value)?;
        }
        let (in_offset, in_size) =
            self.expand_memory(&vm.config.gas_schedule, gas, in_offset, in_size)?;
        let (out_offset, out_size) =
            self.expand_memory(&vm.config.gas_schedule, gas, out_offset, out_size)?;
        let input = self.memory.load_slice(in_offset, in_size);

        vm.ensure_permission(&frame.callee, permission::CALL, "call")?;
        if value > 0 {
            vm.ensure_permission(&frame.callee, permission::SEND, "send")?;
        }

        let native = if vm.config.enable_natives {
            natives::native(&target)
        } else {
            None
        };
        let account = vm.state.get_account(&target)?;
        if op == Opcode::CALL && account.is_none() && native.is_none() {
            vm.ensure_permission(&frame.callee, permission::CREATE_ACCOUNT, "create_account")?;
        }
        let code = account.map(|a| a.code).unwrap_or_default();
        let body = match native {
            Some(native) => Body::Native(native),
            None => Body::Code(&code),
        };

        let depth = frame.depth + 1;
        let (sub_frame, transfer) = match op {
            Opcode::CALL => (
                CallFrame {
                    caller: frame.callee,
                    callee: target,
                    code_address: target,
                    input,
                    value,
                    depth,
                    kind: CallKind::Call,
                },
                Some((frame.callee, target)),
            ),
            Opcode::CALLCODE => (
                CallFrame {
                    caller: frame.callee,
                    callee: frame.callee,
                    code_address: target,
                    input,
                    value,
                    depth,
                    kind: CallKind::CallCode,
                },
                Some((frame.callee, frame.callee)),
            ),
            _ => (
                CallFrame {
                    caller: frame.caller,
                    callee: frame.callee,
                    code_address: target,
                    input,
                    value: frame.value,
                    depth,
                    kind: CallKind::DelegateCall,
                },
                None,
            ),
        };

        let mut sub_gas = gas.split(Some(stack::saturating_u64(gas_limit)));
        let result = vm.sub_call(sub_frame, body, transfer, &mut sub_gas);
        gas.refund(sub_gas);

        let (success, output) = settle(result)?;
        let copied = out_size.min(output.len());
        self.memory.store_slice(out_offset, &output[..copied]);
        self.return_data = output;
        self.stack.push_bool(success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{return_word, Asm};
    use crate::context::Params;
    use lvm_state::permission::{global_permissions_account, DEFAULT_PERMISSIONS};
    use lvm_state::CacheState;
    use lvm_storage::MemoryKvStore;
    use std::sync::Arc;

    fn new_vm(params: Params, config: VmConfig) -> Vm<CacheState> {
        let mut state = CacheState::new(Arc::new(MemoryKvStore::new()));
        state
            .update_account(global_permissions_account(DEFAULT_PERMISSIONS))
            .unwrap();
        Vm::new(state, params, Address::ZERO, config)
    }

    fn run_with(code: &[u8], input: &[u8], gas: u64, config: VmConfig) -> (VmResult<Vec<u8>>, u64) {
        let mut vm = new_vm(Params::default(), config);
        let mut meter = GasMeter::new(gas);
        let result = vm.call(
            &Address::from_u64(100),
            &Address::from_u64(101),
            code,
            input,
            0,
            &mut meter,
        );
        (result, meter.remaining())
    }

    fn run_code(code: &[u8]) -> VmResult<Vec<u8>> {
        run_with(code, &[], 1_000_000, VmConfig::default()).0
    }

    /// Run `body` and return the word it leaves on top of the stack
    fn run_top(body: Asm) -> VmResult<U256> {
        let code = [body.build(), return_word()].concat();
        run_code(&code).map(|out| U256::from_big_endian(&out))
    }

    fn word(n: u64) -> Vec<u8> {
        let mut out = [0u8; 32];
        U256::from(n).to_big_endian(&mut out);
        out.to_vec()
    }

    #[test]
    fn test_analyze_jump_dests_skips_push_data() {
        // PUSH1 0x5b, JUMPDEST, PUSH2 0x5b5b
        let code = [0x60, 0x5b, 0x5b, 0x61, 0x5b, 0x5b];
        let dests = analyze_jump_dests(&code);
        assert_eq!(dests, vec![false, false, true, false, false, false]);
    }

    #[test]
    fn test_push_add() {
        let result = run_top(Asm::new().push(&[2]).push(&[3]).op(Opcode::ADD));
        assert_eq!(result, Ok(U256::from(5)));
    }

    #[test]
    fn test_sub_operand_order() {
        let result = run_top(Asm::new().push(&[3]).push(&[10]).op(Opcode::SUB));
        assert_eq!(result, Ok(U256::from(7)));
    }

    #[test]
    fn test_wraparound() {
        let result = run_top(Asm::new().push(&[0xff; 32]).push(&[1]).op(Opcode::ADD));
        assert_eq!(result, Ok(U256::zero()));
        let result = run_top(Asm::new().push(&[1]).push(&[0]).op(Opcode::SUB));
        assert_eq!(result, Ok(U256::MAX));
    }

    #[test]
    fn test_division_by_zero_is_zero() {
        let result = run_top(Asm::new().push(&[0]).push(&[10]).op(Opcode::DIV));
        assert_eq!(result, Ok(U256::zero()));
        let result = run_top(Asm::new().push(&[0]).push(&[10]).op(Opcode::MOD));
        assert_eq!(result, Ok(U256::zero()));
    }

    #[test]
    fn test_exp_charges_per_byte() {
        let code = Asm::new().push(&[10]).push(&[2]).op(Opcode::EXP).build();
        let (result, left) = run_with(&code, &[], 1000, VmConfig::default());
        assert_eq!(result, Ok(Vec::new()));
        assert_eq!(left, 1000 - 3 - 3 - 10 - 50);
        let result = run_top(Asm::new().push(&[10]).push(&[2]).op(Opcode::EXP));
        assert_eq!(result, Ok(U256::from(1024)));
    }

    #[test]
    fn test_return_word() {
        let code = [Asm::new().push(&[20]).build(), return_word()].concat();
        assert_eq!(run_code(&code), Ok(word(20)));
    }

    #[test]
    fn test_jump_out_of_bounds() {
        assert_eq!(run_code(&[0x60, 0x10, 0x56]), Err(VmError::InvalidJumpDest(16)));
    }

    #[test]
    fn test_jump_into_push_data() {
        // PUSH1 4, JUMP, PUSH1 0x5b: offset 4 is operand data
        let code = [0x60, 0x04, 0x56, 0x60, 0x5b];
        assert_eq!(run_code(&code), Err(VmError::InvalidJumpDest(4)));
    }

    #[test]
    fn test_jumpi() {
        // PUSH1 1, PUSH1 6, JUMPI, INVALID, JUMPDEST, PUSH1 42, <return>
        let taken = [vec![0x60, 0x01, 0x60, 0x06, 0x57, 0xfe, 0x5b, 0x60, 42], return_word()].concat();
        assert_eq!(run_code(&taken), Ok(word(42)));

        let not_taken = [0x60, 0x00, 0x60, 0x06, 0x57, 0xfe, 0x5b];
        assert_eq!(run_code(&not_taken), Err(VmError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn test_infinite_loop_runs_out_of_gas() {
        // JUMPDEST, PUSH1 0, JUMP
        let (result, left) = run_with(&[0x5b, 0x60, 0x00, 0x56], &[], 1000, VmConfig::default());
        assert_eq!(result, Err(VmError::OutOfGas));
        assert!(left < 8);
    }

    #[test]
    fn test_stack_underflow() {
        assert_eq!(run_code(&[Opcode::ADD.as_byte()]), Err(VmError::StackUnderflow));
        assert_eq!(run_code(&[Opcode::SWAP1.as_byte()]), Err(VmError::StackUnderflow));
    }

    #[test]
    fn test_stack_overflow() {
        let config = VmConfig {
            max_stack_depth: 4,
            ..VmConfig::default()
        };
        let code = [0x60, 0x01].repeat(5);
        let (result, _) = run_with(&code, &[], 1000, config);
        assert_eq!(result, Err(VmError::StackOverflow));
    }

    #[test]
    fn test_unknown_opcodes() {
        assert_eq!(run_code(&[0xff]), Err(VmError::InvalidOpcode(0xff)));
        assert_eq!(run_code(&[0x0c]), Err(VmError::InvalidOpcode(0x0c)));
        assert_eq!(run_code(&[0xfe]), Err(VmError::InvalidOpcode(0xfe)));
    }

    #[test]
    fn test_memory_expansion_charged_before_growth() {
        // PUSH1 1, PUSH1 0, MSTORE: 3 + 3 + 3 static + 3 memory
        let code = [0x60, 0x01, 0x60, 0x00, 0x52];
        let (result, left) = run_with(&code, &[], 12, VmConfig::default());
        assert_eq!((result, left), (Ok(Vec::new()), 0));
        let (result, _) = run_with(&code, &[], 11, VmConfig::default());
        assert_eq!(result, Err(VmError::OutOfGas));
    }

    #[test]
    fn test_memory_limit() {
        let config = VmConfig {
            max_memory_bytes: 64,
            ..VmConfig::default()
        };
        // MSTORE at offset 64 needs 96 bytes
        let code = [0x60, 0x01, 0x60, 0x40, 0x52];
        let (result, _) = run_with(&code, &[], 1000, config);
        assert_eq!(result, Err(VmError::MemoryExpansionTooLarge));

        let huge = Asm::new().push(&[1]).push(&[0xff; 32]).op(Opcode::MSTORE).build();
        assert_eq!(run_code(&huge), Err(VmError::MemoryExpansionTooLarge));
    }

    #[test]
    fn test_msize_and_mload() {
        let result = run_top(
            Asm::new()
                .push(&[33])
                .op(Opcode::MLOAD)
                .op(Opcode::POP)
                .op(Opcode::MSIZE),
        );
        assert_eq!(result, Ok(U256::from(96)));
    }

    #[test]
    fn test_calldata() {
        let mut input = vec![0u8; 31];
        input.push(9);
        input.push(0xaa);
        let code = [
            Asm::new().push(&[0]).op(Opcode::CALLDATALOAD).build(),
            return_word(),
        ]
        .concat();
        let (result, _) = run_with(&code, &input, 10_000, VmConfig::default());
        assert_eq!(result, Ok(word(9)));

        let code = [Asm::new().op(Opcode::CALLDATASIZE).build(), return_word()].concat();
        let (result, _) = run_with(&code, &input, 10_000, VmConfig::default());
        assert_eq!(result, Ok(word(33)));
    }

    #[test]
    fn test_codecopy_pads_with_zeros() {
        // CODECOPY(dest 0, offset 0, size 40), RETURN(0, 40)
        let code = Asm::new()
            .push(&[40])
            .push(&[0])
            .push(&[0])
            .op(Opcode::CODECOPY)
            .push(&[40])
            .push(&[0])
            .op(Opcode::RETURN)
            .build();
        let out = run_code(&code).unwrap();
        assert_eq!(out.len(), 40);
        assert_eq!(&out[..code.len()], &code[..]);
        assert!(out[code.len()..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_sha3_empty() {
        let result = run_top(Asm::new().push(&[0]).push(&[0]).op(Opcode::SHA3));
        let expected = keccak256(&[]).to_u256();
        assert_eq!(result, Ok(expected));
    }

    #[test]
    fn test_revert_carries_output() {
        let code = Asm::new()
            .push(&[42])
            .push(&[0])
            .op(Opcode::MSTORE)
            .push(&[32])
            .push(&[0])
            .op(Opcode::REVERT)
            .build();
        assert_eq!(run_code(&code), Err(VmError::Reverted(word(42))));
    }

    #[test]
    fn test_sstore_sload() {
        let code = [
            Asm::new()
                .push(&[7])
                .push(&[1])
                .op(Opcode::SSTORE)
                .push(&[1])
                .op(Opcode::SLOAD)
                .build(),
            return_word(),
        ]
        .concat();
        let (result, left) = run_with(&code, &[], 100_000, VmConfig::default());
        assert_eq!(result, Ok(word(7)));
        // 2 pushes, SSTORE set, push, SLOAD, return epilogue with 3 memory gas
        assert_eq!(left, 100_000 - 6 - 20_000 - 3 - 200 - 18);
    }

    #[test]
    fn test_push_truncated_at_end_of_code() {
        // PUSH2 with a single operand byte ends the code cleanly
        assert_eq!(run_code(&[0x61, 0x01]), Ok(Vec::new()));
    }

    #[test]
    fn test_block_params() {
        let params = Params {
            block_height: 5,
            block_hash: Word256::from_u64(0xbeef),
            block_time: 1234,
            gas_limit: 99,
        };
        let mut vm = new_vm(params, VmConfig::default());
        let mut run = |body: Asm| {
            let code = [body.build(), return_word()].concat();
            let mut gas = GasMeter::new(10_000);
            vm.call(&Address::from_u64(1), &Address::from_u64(2), &code, &[], 0, &mut gas)
                .unwrap()
        };
        assert_eq!(run(Asm::new().push(&[5]).op(Opcode::BLOCKHASH)), word(0xbeef));
        assert_eq!(run(Asm::new().push(&[4]).op(Opcode::BLOCKHASH)), word(0));
        assert_eq!(run(Asm::new().op(Opcode::NUMBER)), word(5));
        assert_eq!(run(Asm::new().op(Opcode::TIMESTAMP)), word(1234));
        assert_eq!(run(Asm::new().op(Opcode::GASLIMIT)), word(99));
    }

    #[test]
    fn test_environment() {
        let result = run_top(Asm::new().op(Opcode::ADDRESS));
        assert_eq!(result, Ok(Address::from_u64(101).to_word()));
        let result = run_top(Asm::new().op(Opcode::CALLER));
        assert_eq!(result, Ok(Address::from_u64(100).to_word()));
        let result = run_top(Asm::new().op(Opcode::PC));
        assert_eq!(result, Ok(U256::zero()));
    }

    #[test]
    fn test_gas_opcode_reports_remaining() {
        let code = [Asm::new().op(Opcode::GAS).build(), return_word()].concat();
        let (result, _) = run_with(&code, &[], 1000, VmConfig::default());
        assert_eq!(result, Ok(word(998)));
    }

    #[test]
    fn test_create_address() {
        let creator = Address::from_u64(7);
        let first = create_address(&creator, 0);
        assert_eq!(first, create_address(&creator, 0));
        assert_ne!(first, create_address(&creator, 1));
        assert!(first.as_bytes()[..12].iter().all(|b| *b == 0));
    }
}
