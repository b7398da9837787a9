//! Execution context handed to opcode handlers.

use crate::gas::GasMeter;
use crate::memory::Memory;
use crate::stack::Stack;
use primitive_types::U256;
use shared_types::Address;
use syn_ledger::StateRW;

/// Message-level metadata for one execution.
#[derive(Debug, Clone)]
pub struct MessageInfo {
    /// Immediate caller.
    pub caller: Address,
    /// Transaction originator.
    pub origin: Address,
    /// Code owner being executed.
    pub contract: Address,
    /// Value attached to the call.
    pub value: u128,
    /// Gas price of the enclosing transaction.
    pub gas_price: u64,
    /// Gas ceiling of the enclosing transaction.
    pub gas_limit: u64,
    /// Height of the block under execution.
    pub block_height: u64,
    /// Timestamp of the block under execution.
    pub timestamp_ms: u64,
    /// Chain identifier.
    pub chain_id: u64,
}

/// Everything a handler sees: message metadata, stack, memory, gas meter
/// and the ledger's state contract.
pub struct ExecutionContext<'a> {
    /// Message metadata.
    pub msg: MessageInfo,
    /// 256-bit word stack.
    pub stack: Stack,
    /// Growable memory.
    pub memory: Memory,
    /// Gas accounting.
    pub meter: GasMeter,
    /// State handle; writes respect the active snapshot frame.
    pub state: &'a mut dyn StateRW,
    /// Call input data.
    pub input: Vec<u8>,
    /// Nested call depth.
    pub depth: u32,
    /// True inside a static call; state writes are rejected.
    pub read_only: bool,
}

impl<'a> ExecutionContext<'a> {
    /// Fresh context with an empty stack and memory.
    pub fn new(msg: MessageInfo, state: &'a mut dyn StateRW) -> Self {
        let meter = GasMeter::new(msg.gas_limit);
        Self {
            msg,
            stack: Stack::new(),
            memory: Memory::new(),
            meter,
            state,
            input: Vec::new(),
            depth: 0,
            read_only: false,
        }
    }

    /// Attach call input data.
    pub fn with_input(mut self, input: Vec<u8>) -> Self {
        self.input = input;
        self
    }

    /// Address as a right-aligned 256-bit word.
    pub fn address_word(address: &Address) -> U256 {
        let mut bytes = [0u8; 32];
        bytes[12..].copy_from_slice(address.as_bytes());
        U256::from_big_endian(&bytes)
    }

    /// Low 20 bytes of a word as an address.
    pub fn word_address(word: U256) -> Address {
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes[12..]);
        Address(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn_ledger::LedgerState;

    #[test]
    fn test_address_word_roundtrip() {
        let address = Address([0x11u8; 20]);
        let word = ExecutionContext::address_word(&address);
        assert_eq!(ExecutionContext::word_address(word), address);
    }

    #[test]
    fn test_meter_starts_at_gas_limit() {
        let mut state = LedgerState::new();
        let ctx = ExecutionContext::new(
            MessageInfo {
                caller: Address::ZERO,
                origin: Address::ZERO,
                contract: Address::ZERO,
                value: 0,
                gas_price: 1,
                gas_limit: 500,
                block_height: 1,
                timestamp_ms: 0,
                chain_id: 1,
            },
            &mut state,
        );
        assert_eq!(ctx.meter.remaining(), 500);
    }
}
