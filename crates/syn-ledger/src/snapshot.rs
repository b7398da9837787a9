//! Point-in-time ledger snapshots.
//!
//! A snapshot captures the full state map plus the chain cursor so the
//! WAL can be truncated. Writes go through a temp file and an atomic
//! rename; a half-written snapshot therefore never shadows a good one.

use crate::errors::{LedgerError, LedgerResult, StartupError};
use serde::{Deserialize, Serialize};
use shared_types::{canonical_decode, canonical_encode, Hash};
use std::io::Write;
use std::path::Path;

/// Serialized snapshot contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotData {
    /// Height of the last appended block.
    pub height: u64,
    /// Canonical hash of the last appended block.
    pub last_hash: Hash,
    /// Height of the last appended sub-block.
    pub sub_block_height: u64,
    /// Full state map at this height.
    pub entries: Vec<(Vec<u8>, Vec<u8>)>,
    /// The unpruned block window at this height.
    pub blocks: Vec<shared_types::Block>,
}

/// Write a snapshot atomically (temp file + rename + fsync).
pub fn write_snapshot(path: &Path, data: &SnapshotData) -> LedgerResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| LedgerError::Io(e.to_string()))?;
    }
    let bytes = canonical_encode(data)?;
    let temp_path = path.with_extension("tmp");
    let mut file =
        std::fs::File::create(&temp_path).map_err(|e| LedgerError::Io(e.to_string()))?;
    file.write_all(&bytes)
        .map_err(|e| LedgerError::Io(e.to_string()))?;
    file.sync_all().map_err(|e| LedgerError::Io(e.to_string()))?;
    std::fs::rename(&temp_path, path).map_err(|e| LedgerError::Io(e.to_string()))
}

/// Load the snapshot at `path`, if one exists.
///
/// # Errors
///
/// `StartupError::CorruptSnapshot` when the file exists but does not
/// decode.
pub fn load_snapshot(path: &Path) -> Result<Option<SnapshotData>, StartupError> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = std::fs::read(path).map_err(|e| StartupError::Io(e.to_string()))?;
    let data =
        canonical_decode(&bytes).map_err(|e| StartupError::CorruptSnapshot(e.to_string()))?;
    Ok(Some(data))
}
