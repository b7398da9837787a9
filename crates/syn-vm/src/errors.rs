//! VM error types.

use syn_ledger::LedgerError;
use thiserror::Error;

/// Errors raised by the dispatcher, the gas meter and opcode handlers.
#[derive(Debug, Error)]
pub enum VmError {
    #[error("Unknown opcode: {0:#08x}")]
    UnknownOpcode(u32),

    #[error("Unknown opcode name: {0}")]
    UnknownOpcodeName(String),

    #[error("Duplicate opcode registration: {name} at {code:#08x}")]
    DuplicateOpcode { name: String, code: u32 },

    #[error("Opcode words are 3 bytes, got {0}")]
    InvalidOpcodeLength(usize),

    #[error("Out of gas: needed {needed}, remaining {remaining}")]
    OutOfGas { needed: u64, remaining: u64 },

    #[error("Stack underflow")]
    StackUnderflow,

    #[error("Stack overflow")]
    StackOverflow,

    #[error("Memory limit exceeded: requested {requested}, max {max}")]
    MemoryLimitExceeded { requested: usize, max: usize },

    #[error("Invalid call target: {0}")]
    InvalidCallTarget(String),

    #[error("Call depth limit reached")]
    CallDepthExceeded,

    #[error("State write in static context")]
    StaticViolation,

    #[error("Execution reverted")]
    Revert(Vec<u8>),

    #[error("State error: {0}")]
    State(#[from] LedgerError),
}

/// Result type for VM operations.
pub type VmResult<T> = Result<T, VmError>;
