//! # Synnergy Ledger
//!
//! Append-only chain of main blocks, pending sub-block buffer, account
//! and UTXO state, token registry, transaction pool, write-ahead log,
//! snapshots and pruning/archival.
//!
//! ## Durability contract
//!
//! - WAL writes precede in-memory mutation; replay restores exactly the
//!   committed state.
//! - Snapshot closures are all-or-nothing; an error discards every write.
//! - Pruned blocks are gzipped into the archive and remain servable.

#![warn(clippy::all)]

pub mod archive;
pub mod chain;
pub mod config;
pub mod errors;
pub mod keys;
pub mod ledger;
pub mod pending;
pub mod pool;
pub mod snapshot;
pub mod state;
pub mod tokens;
pub mod wal;

// Re-exports
pub use config::LedgerConfig;
pub use errors::{InvariantError, LedgerError, LedgerResult, PoolError, StartupError};
pub use ledger::{CallDispatcher, Ledger};
pub use pool::{PoolConfig, TransactionPool};
pub use state::{with_frame, CallKind, LedgerState, SnapshotFrame, StateRW};
pub use tokens::TokenMeta;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
