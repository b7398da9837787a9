//! Ledger configuration.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use shared_types::Block;
use std::path::PathBuf;

/// Configuration for opening a [`crate::Ledger`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Write-ahead log file.
    pub wal_path: PathBuf,
    /// Snapshot file (atomic temp + rename writes).
    pub snapshot_path: PathBuf,
    /// Directory receiving gzipped pruned blocks.
    pub archive_path: PathBuf,
    /// Take a snapshot every this many appended blocks.
    pub snapshot_interval: u64,
    /// Keep this many recent blocks in memory; older ones are archived.
    pub prune_interval: u64,
    /// Genesis block used when neither WAL nor snapshot exist.
    pub genesis: Block,
    /// Initial PoW difficulty target (big-endian integer ceiling).
    pub initial_difficulty: U256,
    /// Maximum transactions held in the pool.
    pub pool_capacity: usize,
    /// Maximum encoded transaction size accepted by the pool.
    pub max_tx_bytes: usize,
    /// Pending sub-blocks not consumed within this window are dropped.
    pub sub_block_retention_ms: u64,
}

impl LedgerConfig {
    /// A configuration rooted at `dir` with production-shaped defaults.
    pub fn in_dir(dir: impl Into<PathBuf>, genesis: Block) -> Self {
        let dir = dir.into();
        LedgerConfig {
            wal_path: dir.join("ledger.wal"),
            snapshot_path: dir.join("ledger.snapshot"),
            archive_path: dir.join("archive"),
            snapshot_interval: 128,
            prune_interval: 1_024,
            genesis,
            initial_difficulty: U256::MAX,
            pool_capacity: 65_536,
            max_tx_bytes: 128 * 1024,
            sub_block_retention_ms: 2 * 900_000,
        }
    }
}
