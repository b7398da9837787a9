//! Node startup errors.
//!
//! Every variant is fatal: the process exits non-zero with a single-line
//! diagnostic.

use syn_ledger::StartupError;
use syn_vm::VmError;
use thiserror::Error;

/// Fatal node startup failures.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Treasury address must not be zero")]
    InvalidTreasury,

    #[error("Initial difficulty bits out of range: {0}")]
    InvalidDifficulty(u32),

    #[error("Ledger startup failed: {0}")]
    Ledger(#[from] StartupError),

    #[error("Opcode registration failed: {0}")]
    Opcode(#[from] VmError),
}
