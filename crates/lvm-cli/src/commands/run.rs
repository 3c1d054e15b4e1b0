//! `lvm run`: execute bytecode once and report the outcome

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use lvm_events::{topics, EventCache, EventData, EventSwitch};
use lvm_evm::{GasMeter, Vm, VmConfig, VmError};
use lvm_state::CacheState;
use lvm_storage::MemoryKvStore;
use serde_json::{json, Value};
use tracing::info;

use crate::error::CliError;
use crate::genesis::{parse_address, parse_hex, GenesisState};
use crate::output::Output;

/// Run bytecode as a top-level call
#[derive(Debug, Args)]
pub struct RunArgs {
    /// Code to run as hex; defaults to the callee's code in the state file
    #[arg(long)]
    pub code: Option<String>,

    /// Call data as hex
    #[arg(long, default_value = "")]
    pub input: String,

    /// Gas available to the call
    #[arg(long, default_value_t = 1_000_000)]
    pub gas: u64,

    /// Value moved from caller to callee
    #[arg(long, default_value_t = 0)]
    pub value: u128,

    /// Calling account
    #[arg(long, default_value = "0x01")]
    pub caller: String,

    /// Account the code runs as
    #[arg(long, default_value = "0x02")]
    pub callee: String,

    /// JSON state file to seed accounts from
    #[arg(long)]
    pub genesis: Option<PathBuf>,

    /// JSON VM configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// What one run produced
#[derive(Debug)]
pub struct RunReport {
    /// Return bytes, revert payload included
    pub output: Vec<u8>,
    /// Gas consumed
    pub gas_used: u64,
    /// Error message when the call failed
    pub error: Option<String>,
    /// Non-zero storage of the callee after the call
    pub storage: Vec<(String, String)>,
    /// Log records emitted by the callee
    pub logs: Vec<Value>,
}

impl RunArgs {
    /// Execute and print the outcome
    pub fn execute(&self, json: bool) -> Result<(), CliError> {
        let report = self.run()?;
        let storage: serde_json::Map<String, Value> = report
            .storage
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        let mut out = Output::new(json)
            .field("output", &format!("0x{}", hex::encode(&report.output)))
            .field_u64("gas_used", report.gas_used)
            .field_value("storage", Value::Object(storage))
            .field_value("logs", Value::Array(report.logs.clone()))
            .line(format!("Output: 0x{}", hex::encode(&report.output)))
            .line(format!("Gas used: {}", report.gas_used));
        for (key, value) in &report.storage {
            out = out.line(format!("Storage {} = {}", key, value));
        }
        if !report.logs.is_empty() {
            out = out.line(format!("Logs: {}", report.logs.len()));
        }
        if let Some(error) = &report.error {
            out = out.field("error", error);
        }
        out.print();

        match report.error {
            Some(error) => Err(CliError::Execution(error)),
            None => Ok(()),
        }
    }

    /// Execute against a fresh in-memory store
    pub fn run(&self) -> Result<RunReport, CliError> {
        let caller = parse_address(&self.caller)?;
        let callee = parse_address(&self.callee)?;
        let input = parse_hex(&self.input)?;
        let config = match &self.config {
            Some(path) => VmConfig::load(path)?,
            None => VmConfig::default(),
        };
        let genesis = match &self.genesis {
            Some(path) => GenesisState::load(path)?,
            None => GenesisState::default(),
        };
        let code = match &self.code {
            Some(code) => parse_hex(code)?,
            None => genesis.code_of(&callee)?.unwrap_or_default(),
        };

        let mut state = CacheState::new(Arc::new(MemoryKvStore::new()));
        genesis.apply(&mut state)?;

        let switch = Arc::new(EventSwitch::new());
        let mut log_rx = switch.add_listener_for_event("lvm-run", &topics::log(&callee));
        let cache = Arc::new(EventCache::new(switch));

        let mut vm = Vm::new(state, genesis.params()?, caller, config);
        vm.set_fireable(cache.clone());

        info!(caller = %caller, callee = %callee, code_len = code.len(), gas = self.gas, "running");
        let mut gas = GasMeter::new(self.gas);
        let result = vm.call(&caller, &callee, &code, &input, self.value, &mut gas);
        let gas_used = self.gas - gas.remaining();
        cache.flush();

        let mut logs = Vec::new();
        while let Ok(event) = log_rx.try_recv() {
            if let EventData::Log(log) = event {
                logs.push(json!({
                    "topics": log.topics.iter().map(|t| t.to_hex()).collect::<Vec<_>>(),
                    "data": format!("0x{}", hex::encode(&log.data)),
                }));
            }
        }

        let storage = vm
            .state()
            .storage_entries(&callee)?
            .into_iter()
            .map(|(k, v)| (k.to_hex(), v.to_hex()))
            .collect();

        let (output, error) = match result {
            Ok(output) => (output, None),
            Err(err) => {
                let message = err.to_string();
                match err {
                    VmError::Reverted(output) => (output, Some(message)),
                    _ => (Vec::new(), Some(message)),
                }
            }
        };
        Ok(RunReport {
            output,
            gas_used,
            error,
            storage,
            logs,
        })
    }
}
