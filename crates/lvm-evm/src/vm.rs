//! Call entry point and frame dispatch

use std::sync::Arc;

use lvm_events::{topics, CallData, EventData, EventDataCall, EventDataLog, Fireable};
use lvm_primitives::Address;
use lvm_state::{has_permission, Account, AccountStore, PermFlag, GLOBAL_PERMISSIONS_ADDRESS};
use tracing::{debug, warn};

use crate::config::VmConfig;
use crate::context::{CallFrame, CallKind, Params};
use crate::error::{VmError, VmResult};
use crate::gas::GasMeter;
use crate::interpreter::Interpreter;
use crate::journal::JournaledState;
use crate::natives::NativeFn;

/// What a frame runs
#[derive(Clone, Copy)]
pub(crate) enum Body<'a> {
    Code(&'a [u8]),
    Native(NativeFn),
}

/// Executes bytecode against an account store.
///
/// All frames of one top-level [`call`](Vm::call) share the store through a
/// journal, so a failing frame can undo its own writes without touching
/// those of its parents.
pub struct Vm<S: AccountStore> {
    pub(crate) state: JournaledState<S>,
    pub(crate) params: Params,
    pub(crate) origin: Address,
    pub(crate) config: VmConfig,
    fireable: Option<Arc<dyn Fireable>>,
}

impl<S: AccountStore> Vm<S> {
    /// Create a VM over `state`
    pub fn new(state: S, params: Params, origin: Address, config: VmConfig) -> Self {
        Self {
            state: JournaledState::new(state),
            params,
            origin,
            config,
            fireable: None,
        }
    }

    /// Publish call and log events to `fireable`
    pub fn set_fireable(&mut self, fireable: Arc<dyn Fireable>) {
        self.fireable = Some(fireable);
    }

    /// The account store
    pub fn state(&self) -> &S {
        self.state.inner()
    }

    /// Mutable access to the account store, e.g. to seed accounts between calls
    pub fn state_mut(&mut self) -> &mut S {
        self.state.inner_mut()
    }

    /// Consume the VM, returning the account store
    pub fn into_state(self) -> S {
        self.state.into_inner()
    }

    /// Block parameters
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Configuration
    pub fn config(&self) -> &VmConfig {
        &self.config
    }

    /// Run `code` as `callee`, invoked by `caller` with `input` and `value`.
    ///
    /// `value` moves from `caller` to `callee` before the code runs. On any
    /// error every write made by the call, including that transfer, is undone.
    /// Gas consumed stays consumed. The outcome is also published under
    /// `Acc/<callee>/Call`.
    pub fn call(
        &mut self,
        caller: &Address,
        callee: &Address,
        code: &[u8],
        input: &[u8],
        value: u128,
        gas: &mut GasMeter,
    ) -> VmResult<Vec<u8>> {
        let frame = CallFrame {
            caller: *caller,
            callee: *callee,
            code_address: *callee,
            input: input.to_vec(),
            value,
            depth: 0,
            kind: CallKind::Call,
        };
        let start_gas = gas.remaining();
        debug!(caller = %caller, callee = %callee, value, gas = start_gas, "call");

        let result = match self.state.account_exists(&GLOBAL_PERMISSIONS_ADDRESS) {
            Ok(true) => self.run_frame(&frame, Body::Code(code), Some((*caller, *callee)), gas),
            Ok(false) => Err(VmError::MissingGlobalPermissions),
            Err(err) => Err(err.into()),
        };
        self.state.accept();

        debug!(
            gas_used = start_gas - gas.remaining(),
            ok = result.is_ok(),
            "call finished"
        );
        self.fire_call_event(&frame, start_gas, &result);
        result
    }

    /// Run a nested frame on its own sub-budget and publish its outcome
    pub(crate) fn sub_call(
        &mut self,
        frame: CallFrame,
        body: Body<'_>,
        transfer: Option<(Address, Address)>,
        gas: &mut GasMeter,
    ) -> VmResult<Vec<u8>> {
        let start_gas = gas.remaining();
        debug!(
            depth = frame.depth,
            kind = ?frame.kind,
            target = %frame.code_address,
            gas = start_gas,
            "sub-call"
        );
        let result = if frame.depth > self.config.max_call_depth {
            Err(VmError::CallDepthExceeded)
        } else {
            self.run_frame(&frame, body, transfer, gas)
        };
        self.fire_call_event(&frame, start_gas, &result);
        result
    }

    /// Run one frame inside its own checkpoint
    fn run_frame(
        &mut self,
        frame: &CallFrame,
        body: Body<'_>,
        transfer: Option<(Address, Address)>,
        gas: &mut GasMeter,
    ) -> VmResult<Vec<u8>> {
        let checkpoint = self.state.checkpoint();
        let result = self.transfer_and_run(frame, body, transfer, gas);
        match &result {
            Ok(output) => debug!(depth = frame.depth, output_len = output.len(), "frame done"),
            Err(err) => {
                warn!(depth = frame.depth, error = %err, "frame failed, reverting");
                self.state.revert_to(checkpoint)?;
            }
        }
        result
    }

    fn transfer_and_run(
        &mut self,
        frame: &CallFrame,
        body: Body<'_>,
        transfer: Option<(Address, Address)>,
        gas: &mut GasMeter,
    ) -> VmResult<Vec<u8>> {
        if frame.kind == CallKind::Create {
            if let Some(existing) = self.state.get_account(&frame.callee)? {
                if existing.has_code() || existing.nonce > 0 {
                    return Err(VmError::CreateCollision);
                }
            }
        }
        if let Some((from, to)) = transfer {
            self.transfer(&from, &to, frame.value)?;
        }
        let output = match body {
            Body::Native(native) => native(&frame.input, gas, &self.config.gas_schedule)?,
            Body::Code([]) => Vec::new(),
            Body::Code(code) => Interpreter::new(code, &self.config).run(self, frame, gas)?,
        };
        if frame.kind == CallKind::Create {
            let mut account = self
                .state
                .get_account(&frame.callee)?
                .unwrap_or_else(|| Account::new(frame.callee));
            account.code = output.clone();
            self.state.update_account(account)?;
        }
        Ok(output)
    }

    /// Move `value` from `from` to `to`, creating `to` if needed
    pub(crate) fn transfer(&mut self, from: &Address, to: &Address, value: u128) -> VmResult<()> {
        if value > 0 {
            let mut sender = self
                .state
                .get_account(from)?
                .ok_or(VmError::InsufficientBalance)?;
            if sender.balance < value {
                return Err(VmError::InsufficientBalance);
            }
            sender.balance -= value;
            self.state.update_account(sender)?;
        }
        match self.state.get_account(to)? {
            Some(_) if value == 0 => {}
            receiver => {
                let mut receiver = receiver.unwrap_or_else(|| Account::new(*to));
                receiver.balance = receiver.balance.saturating_add(value);
                self.state.update_account(receiver)?;
            }
        }
        Ok(())
    }

    /// Fail with `PermissionDenied(name)` unless `address` holds `flag`
    pub(crate) fn ensure_permission(
        &self,
        address: &Address,
        flag: PermFlag,
        name: &'static str,
    ) -> VmResult<()> {
        if has_permission(&self.state, address, flag)? {
            Ok(())
        } else {
            debug!(address = %address, permission = name, "permission denied");
            Err(VmError::PermissionDenied(name))
        }
    }

    pub(crate) fn fire_log_event(&self, log: EventDataLog) {
        if let Some(fireable) = &self.fireable {
            fireable.fire_event(&topics::log(&log.address), EventData::Log(log));
        }
    }

    fn fire_call_event(&self, frame: &CallFrame, gas: u64, result: &VmResult<Vec<u8>>) {
        let Some(fireable) = &self.fireable else {
            return;
        };
        let (return_data, exception) = match result {
            Ok(output) => (output.clone(), String::new()),
            Err(err @ VmError::Reverted(output)) => (output.clone(), err.to_string()),
            Err(err) => (Vec::new(), err.to_string()),
        };
        let event = EventDataCall {
            call_data: CallData {
                caller: frame.caller,
                callee: frame.code_address,
                data: frame.input.clone(),
                value: frame.value,
                gas,
            },
            origin: self.origin,
            depth: frame.depth,
            return_data,
            exception,
        };
        fireable.fire_event(&topics::acc_call(&frame.code_address), EventData::Call(event));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asm::{return_word, Asm};
    use crate::opcode::Opcode;
    use lvm_state::permission::{global_permissions_account, DEFAULT_PERMISSIONS};
    use lvm_state::CacheState;
    use lvm_storage::MemoryKvStore;

    fn new_vm() -> Vm<CacheState> {
        let mut state = CacheState::new(Arc::new(MemoryKvStore::new()));
        state
            .update_account(global_permissions_account(DEFAULT_PERMISSIONS))
            .unwrap();
        Vm::new(state, Params::default(), Address::ZERO, VmConfig::default())
    }

    fn fund(vm: &mut Vm<CacheState>, address: Address, balance: u128) {
        let mut account = Account::new(address);
        account.balance = balance;
        vm.state_mut().update_account(account).unwrap();
    }

    fn balance(vm: &Vm<CacheState>, address: &Address) -> u128 {
        vm.state()
            .get_account(address)
            .unwrap()
            .map(|a| a.balance)
            .unwrap_or(0)
    }

    #[test]
    fn test_missing_global_permissions() {
        let state = CacheState::new(Arc::new(MemoryKvStore::new()));
        let mut vm = Vm::new(state, Params::default(), Address::ZERO, VmConfig::default());
        let mut gas = GasMeter::new(1000);
        let result = vm.call(&Address::from_u64(1), &Address::from_u64(2), &[], &[], 0, &mut gas);
        assert_eq!(result, Err(VmError::MissingGlobalPermissions));
    }

    #[test]
    fn test_top_level_transfer() {
        let mut vm = new_vm();
        let (a, b) = (Address::from_u64(100), Address::from_u64(101));
        fund(&mut vm, a, 50);
        let mut gas = GasMeter::new(1000);
        vm.call(&a, &b, &[], &[], 20, &mut gas).unwrap();
        assert_eq!(balance(&vm, &a), 30);
        assert_eq!(balance(&vm, &b), 20);
        assert_eq!(gas.remaining(), 1000);
    }

    #[test]
    fn test_insufficient_balance_leaves_balances() {
        let mut vm = new_vm();
        let (a, b) = (Address::from_u64(100), Address::from_u64(101));
        fund(&mut vm, a, 5);
        let mut gas = GasMeter::new(1000);
        let result = vm.call(&a, &b, &[], &[], 6, &mut gas);
        assert_eq!(result, Err(VmError::InsufficientBalance));
        assert_eq!(balance(&vm, &a), 5);
        assert!(vm.state().get_account(&b).unwrap().is_none());
    }

    #[test]
    fn test_failed_call_reverts_transfer_and_storage() {
        let mut vm = new_vm();
        let (a, b) = (Address::from_u64(100), Address::from_u64(101));
        fund(&mut vm, a, 50);
        // SSTORE(1, 1) then an invalid opcode
        let code = Asm::new()
            .push(&[1])
            .push(&[1])
            .op(Opcode::SSTORE)
            .op(Opcode::INVALID)
            .build();
        let mut gas = GasMeter::new(100_000);
        let result = vm.call(&a, &b, &code, &[], 10, &mut gas);
        assert_eq!(result, Err(VmError::InvalidOpcode(0xfe)));
        assert_eq!(balance(&vm, &a), 50);
        let slot = vm
            .state()
            .get_storage(&b, &lvm_primitives::Word256::from_u64(1))
            .unwrap();
        assert!(slot.is_zero());
        // gas spent before the failure is not returned
        assert_eq!(gas.remaining(), 100_000 - 3 - 3 - 20_000);
    }

    #[test]
    fn test_call_returns_word() {
        let mut vm = new_vm();
        let code = [Asm::new().push(&[20]).build(), return_word()].concat();
        let mut gas = GasMeter::new(1000);
        let out = vm
            .call(&Address::from_u64(1), &Address::from_u64(2), &code, &[], 0, &mut gas)
            .unwrap();
        let mut expected = [0u8; 32];
        expected[31] = 20;
        assert_eq!(out, expected.to_vec());
    }
}
