//! Archival of pruned blocks.
//!
//! Blocks older than the prune window leave memory and land as gzipped
//! canonical encodings under the archive directory, one file per height.
//! Archived blocks stay servable for range sync.

use crate::errors::{LedgerError, LedgerResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use shared_types::{canonical_decode, canonical_encode, Block};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

fn block_path(archive_dir: &Path, height: u64) -> PathBuf {
    archive_dir.join(format!("block-{height:012}.bin.gz"))
}

/// Gzip and store `block` under the archive directory.
pub fn archive_block(archive_dir: &Path, block: &Block) -> LedgerResult<()> {
    std::fs::create_dir_all(archive_dir).map_err(|e| LedgerError::Io(e.to_string()))?;
    let bytes = canonical_encode(block)?;

    let path = block_path(archive_dir, block.header.height);
    let temp_path = path.with_extension("tmp");
    let file = std::fs::File::create(&temp_path).map_err(|e| LedgerError::Io(e.to_string()))?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(&bytes)
        .map_err(|e| LedgerError::Io(e.to_string()))?;
    encoder
        .finish()
        .map_err(|e| LedgerError::Io(e.to_string()))?;
    std::fs::rename(&temp_path, &path).map_err(|e| LedgerError::Io(e.to_string()))
}

/// Load an archived block by height, if present.
pub fn load_archived_block(archive_dir: &Path, height: u64) -> LedgerResult<Option<Block>> {
    let path = block_path(archive_dir, height);
    if !path.exists() {
        return Ok(None);
    }
    let file = std::fs::File::open(&path).map_err(|e| LedgerError::Io(e.to_string()))?;
    let mut decoder = GzDecoder::new(file);
    let mut bytes = Vec::new();
    decoder
        .read_to_end(&mut bytes)
        .map_err(|e| LedgerError::Io(e.to_string()))?;
    Ok(Some(canonical_decode(&bytes)?))
}
