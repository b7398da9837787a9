//! Consensus error types.

use syn_ledger::LedgerError;
use thiserror::Error;

/// Errors from proposing, voting and sealing.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("Insufficient PoS votes: {votes} of {active} active validators")]
    InsufficientVotes { votes: usize, active: usize },

    #[error("No active validators")]
    NoActiveValidators,

    #[error("Serialization failure: {0}")]
    Serialization(String),

    #[error("PoW search cancelled")]
    SealCancelled,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for consensus operations.
pub type ConsensusResult<T> = Result<T, ConsensusError>;
