//! # Opcode Dispatcher
//!
//! Binds the frozen catalogue to handlers at construction. For every
//! instruction: look up the handler (`UnknownOpcode`), pre-charge the
//! base gas (`OutOfGas`), invoke, and pass the handler's result through
//! unchanged.

use crate::context::ExecutionContext;
use crate::errors::{VmError, VmResult};
use crate::gas::GasTable;
use crate::handlers;
use crate::opcode::{parse_opcode, Opcode, CATALOGUE};
use std::collections::HashMap;

/// Control-flow outcome of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next instruction.
    Continue,
    /// Halt successfully with no output.
    Stop,
    /// Halt successfully with output.
    Return(Vec<u8>),
    /// Halt and revert the enclosing frame, with revert data.
    Revert(Vec<u8>),
}

/// An opcode handler.
pub type Handler = fn(&Dispatcher, &mut ExecutionContext<'_>) -> VmResult<Flow>;

struct Registered {
    name: &'static str,
    handler: Handler,
}

/// The dispatch table; built once at process start, read-only afterwards.
pub struct Dispatcher {
    by_code: HashMap<Opcode, Registered>,
    by_name: HashMap<&'static str, Opcode>,
    gas: GasTable,
}

impl Dispatcher {
    /// Build the dispatcher from the catalogue.
    ///
    /// # Errors
    ///
    /// `DuplicateOpcode` when a name or code registers twice — a fatal
    /// startup condition.
    pub fn new() -> VmResult<Self> {
        let mut dispatcher = Self {
            by_code: HashMap::new(),
            by_name: HashMap::new(),
            gas: GasTable::canonical(),
        };
        for (name, code) in CATALOGUE {
            dispatcher.register(name, *code, handlers::handler_for(name)?)?;
        }
        Ok(dispatcher)
    }

    fn register(&mut self, name: &'static str, code: Opcode, handler: Handler) -> VmResult<()> {
        if self.by_code.contains_key(&code) || self.by_name.contains_key(name) {
            return Err(VmError::DuplicateOpcode {
                name: name.to_string(),
                code: code.0,
            });
        }
        self.by_code.insert(code, Registered { name, handler });
        self.by_name.insert(name, code);
        Ok(())
    }

    /// The catalogued name of an opcode.
    pub fn name_of(&self, code: Opcode) -> Option<&'static str> {
        self.by_code.get(&code).map(|r| r.name)
    }

    /// The opcode bound to a catalogued name.
    pub fn opcode_of(&self, name: &str) -> Option<Opcode> {
        self.by_name.get(name).copied()
    }

    /// Whether a name is in the frozen catalogue.
    pub fn knows(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Execute a single instruction.
    ///
    /// # Errors
    ///
    /// `UnknownOpcode` for unregistered codes, `OutOfGas` when the base
    /// cost cannot be charged; handler errors pass through unchanged.
    pub fn dispatch(&self, code: Opcode, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
        let registered = self
            .by_code
            .get(&code)
            .ok_or(VmError::UnknownOpcode(code.0))?;
        ctx.meter.consume(self.gas.cost(registered.name))?;
        (registered.handler)(self, ctx)
    }

    /// Execute a single instruction by catalogued name.
    pub fn dispatch_name(&self, name: &str, ctx: &mut ExecutionContext<'_>) -> VmResult<Flow> {
        let code = self
            .opcode_of(name)
            .ok_or_else(|| VmError::UnknownOpcodeName(name.to_string()))?;
        self.dispatch(code, ctx)
    }

    /// Run a bytecode sequence (consecutive 3-byte words) to completion.
    ///
    /// # Errors
    ///
    /// Propagates the first instruction error; `Revert` surfaces as
    /// `VmError::Revert` so enclosing frames discard their writes.
    pub fn execute(&self, bytecode: &[u8], ctx: &mut ExecutionContext<'_>) -> VmResult<Vec<u8>> {
        let mut cursor = 0usize;
        while cursor < bytecode.len() {
            let end = cursor + 3;
            if end > bytecode.len() {
                return Err(VmError::InvalidOpcodeLength(bytecode.len() - cursor));
            }
            let code = parse_opcode(&bytecode[cursor..end])?;
            match self.dispatch(code, ctx)? {
                Flow::Continue => cursor = end,
                Flow::Stop => return Ok(Vec::new()),
                Flow::Return(data) => return Ok(data),
                Flow::Revert(data) => return Err(VmError::Revert(data)),
            }
        }
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MessageInfo;
    use crate::opcode::to_bytecode;
    use primitive_types::U256;
    use shared_types::Address;
    use syn_ledger::{LedgerState, StateRW};

    fn msg(gas_limit: u64) -> MessageInfo {
        MessageInfo {
            caller: Address([1u8; 20]),
            origin: Address([1u8; 20]),
            contract: Address([2u8; 20]),
            value: 0,
            gas_price: 1,
            gas_limit,
            block_height: 7,
            timestamp_ms: 1_000,
            chain_id: 1,
        }
    }

    #[test]
    fn test_catalogue_registers_without_collisions() {
        assert!(Dispatcher::new().is_ok());
    }

    #[test]
    fn test_name_roundtrip() {
        let dispatcher = Dispatcher::new().unwrap();
        for (name, code) in CATALOGUE {
            assert_eq!(dispatcher.name_of(*code), Some(*name));
            assert_eq!(dispatcher.opcode_of(name), Some(*code));
        }
    }

    #[test]
    fn test_unknown_opcode() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(1_000), &mut state);
        assert!(matches!(
            dispatcher.dispatch(Opcode(0xFFFFFF), &mut ctx),
            Err(VmError::UnknownOpcode(0xFFFFFF))
        ));
    }

    #[test]
    fn test_gas_precharge_out_of_gas_without_state_mutation() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut state = LedgerState::new();
        state.put(b"probe", b"before").unwrap();

        // opADD costs 3; a 2-gas budget must fail the pre-charge.
        let mut ctx = ExecutionContext::new(msg(2), &mut state);
        ctx.stack.push(U256::from(1)).unwrap();
        ctx.stack.push(U256::from(2)).unwrap();

        let err = dispatcher.dispatch_name("opADD", &mut ctx).unwrap_err();
        assert!(matches!(err, VmError::OutOfGas { needed: 3, remaining: 2 }));
        assert_eq!(state.get(b"probe"), Some(b"before".to_vec()));
    }

    #[test]
    fn test_gas_monotonicity_over_sequence() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(1_000), &mut state);

        // opPUSH0 (2) + opPUSH0 (2) + opADD (3) = 7
        for name in ["opPUSH0", "opPUSH0", "opADD"] {
            dispatcher.dispatch_name(name, &mut ctx).unwrap();
        }
        assert_eq!(ctx.meter.used(), 7);
        assert_eq!(ctx.meter.remaining(), 993);
    }

    #[test]
    fn test_execute_bytecode_stops_cleanly() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(1_000), &mut state);

        let mut bytecode = Vec::new();
        bytecode.extend_from_slice(&to_bytecode("opPUSH0").unwrap());
        bytecode.extend_from_slice(&to_bytecode("opSTOP").unwrap());
        bytecode.extend_from_slice(&to_bytecode("opPUSH0").unwrap());

        let output = dispatcher.execute(&bytecode, &mut ctx).unwrap();
        assert!(output.is_empty());
        assert_eq!(ctx.stack.len(), 1, "instructions after opSTOP never ran");
    }

    #[test]
    fn test_execute_rejects_ragged_bytecode() {
        let dispatcher = Dispatcher::new().unwrap();
        let mut state = LedgerState::new();
        let mut ctx = ExecutionContext::new(msg(1_000), &mut state);
        assert!(matches!(
            dispatcher.execute(&[0x01, 0x00], &mut ctx),
            Err(VmError::InvalidOpcodeLength(2))
        ));
    }
}
