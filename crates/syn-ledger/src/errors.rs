//! Error types for the ledger subsystem.

use shared_types::{CodecError, Hash};
use thiserror::Error;

/// Fatal errors during ledger startup. The process exits on these.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("WAL corrupt at record {record}: {reason}")]
    CorruptWal { record: usize, reason: String },

    #[error("Snapshot unreadable: {0}")]
    CorruptSnapshot(String),

    #[error("Genesis block invalid: {0}")]
    InvalidGenesis(String),

    #[error("I/O failure during startup: {0}")]
    Io(String),
}

/// Chain-structure violations. The ledger is never left partially
/// updated after one of these.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("Height mismatch: expected {expected}, got {actual}")]
    HeightMismatch { expected: u64, actual: u64 },

    #[error("Previous hash does not match chain head")]
    PrevHashMismatch,

    #[error("PoW hash does not meet the difficulty target")]
    PowTargetNotMet,

    #[error("PoW hash does not match the header preimage")]
    PowHashMismatch,

    #[error("PoH digest mismatch in sub-block at height {height}")]
    PohMismatch { height: u64 },

    #[error("Sub-block header signature invalid at height {height}")]
    SubBlockSignatureInvalid { height: u64 },

    #[error("Duplicate block: {0}")]
    DuplicateBlock(String),

    #[error("Too many sub-block headers: {count} > {limit}")]
    TooManySubBlocks { count: usize, limit: usize },

    #[error("Sub-block height {actual} not above last {last}")]
    SubBlockHeightNotIncreasing { last: u64, actual: u64 },

    #[error("Sub-block body too large: {count} > {limit}")]
    SubBlockTooLarge { count: usize, limit: usize },
}

/// Transaction pool admission errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Duplicate transaction: {0}")]
    DuplicateTransaction(String),

    #[error("Invalid transaction signature")]
    InvalidSignature,

    #[error("Stale nonce: {got}, account is at {current}")]
    StaleNonce { got: u64, current: u64 },

    #[error("Gas price must be positive")]
    NonPositiveGasPrice,

    #[error("Transaction too large: {size} bytes > {limit} bytes")]
    Oversized { size: usize, limit: usize },

    #[error("Pool is full: capacity {capacity}")]
    PoolFull { capacity: usize },

    #[error("Sender public key does not match the from address")]
    SenderMismatch,
}

/// Ledger operation errors.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// WAL/snapshot/archive read or write failure.
    #[error("I/O error: {0}")]
    Io(String),

    #[error(transparent)]
    Invariant(#[from] InvariantError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Insufficient balance: have {have}, need {need}")]
    InsufficientBalance { have: u128, need: u128 },

    #[error("Supply cap exceeded for token {token:#010x}: cap {cap}, would be {would_be}")]
    SupplyCapExceeded { token: u32, cap: u128, would_be: u128 },

    /// A snapshot closure failed; all its writes were discarded.
    #[error("Snapshot rolled back: {0}")]
    SnapshotRolledBack(String),
}

impl LedgerError {
    /// Helper for duplicate-block reporting.
    pub fn duplicate_block(hash: &Hash) -> Self {
        LedgerError::Invariant(InvariantError::DuplicateBlock(hex::encode(hash)))
    }
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
