//! Pending sub-block buffer.
//!
//! Sub-blocks live here from proposal until a main block consumes them
//! or their retention window lapses. Heights are strictly increasing.

use crate::errors::{InvariantError, LedgerResult};
use shared_types::{Hash, SubBlock, MAX_TXS_PER_SUB_BLOCK};
use std::collections::BTreeMap;

/// Buffer of not-yet-included sub-blocks, ordered by insertion.
#[derive(Debug, Default)]
pub struct PendingSubBlocks {
    /// Height-ordered pending sub-blocks (insertion order coincides with
    /// height order because heights are strictly increasing).
    by_height: BTreeMap<u64, SubBlock>,
    /// Header-hash index.
    by_hash: BTreeMap<Hash, u64>,
    /// Height of the last appended sub-block, including consumed ones.
    last_height: u64,
}

impl PendingSubBlocks {
    /// Empty buffer starting above `last_height`.
    pub fn new(last_height: u64) -> Self {
        Self {
            by_height: BTreeMap::new(),
            by_hash: BTreeMap::new(),
            last_height,
        }
    }

    /// Height of the most recently appended sub-block.
    pub fn last_height(&self) -> u64 {
        self.last_height
    }

    /// Number of pending sub-blocks.
    pub fn len(&self) -> usize {
        self.by_height.len()
    }

    /// True when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.by_height.is_empty()
    }

    /// Append a sub-block.
    ///
    /// # Errors
    ///
    /// - `SubBlockHeightNotIncreasing` unless `height > last_height`
    /// - `SubBlockTooLarge` when the body exceeds the limit
    pub fn append(&mut self, sub_block: SubBlock) -> LedgerResult<()> {
        let height = sub_block.header.height;
        if height <= self.last_height {
            return Err(InvariantError::SubBlockHeightNotIncreasing {
                last: self.last_height,
                actual: height,
            }
            .into());
        }
        if sub_block.transactions.len() > MAX_TXS_PER_SUB_BLOCK {
            return Err(InvariantError::SubBlockTooLarge {
                count: sub_block.transactions.len(),
                limit: MAX_TXS_PER_SUB_BLOCK,
            }
            .into());
        }
        self.last_height = height;
        self.by_hash
            .insert(sub_block.header.canonical_hash(), height);
        self.by_height.insert(height, sub_block);
        Ok(())
    }

    /// Look up a pending sub-block by header hash.
    pub fn get_by_hash(&self, hash: &Hash) -> Option<&SubBlock> {
        self.by_hash
            .get(hash)
            .and_then(|height| self.by_height.get(height))
    }

    /// All pending sub-blocks, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &SubBlock> {
        self.by_height.values()
    }

    /// Remove sub-blocks consumed by a main block, by header hash.
    pub fn consume(&mut self, hashes: &[Hash]) {
        for hash in hashes {
            if let Some(height) = self.by_hash.remove(hash) {
                self.by_height.remove(&height);
            }
        }
    }

    /// Discard sub-blocks older than the retention window. Returns the
    /// header hashes of the expired sub-blocks.
    pub fn expire(&mut self, now_ms: u64, retention_ms: u64) -> Vec<Hash> {
        let cutoff = now_ms.saturating_sub(retention_ms);
        let expired: Vec<(u64, Hash)> = self
            .by_height
            .iter()
            .filter(|(_, sb)| sb.header.timestamp_ms < cutoff)
            .map(|(height, sb)| (*height, sb.header.canonical_hash()))
            .collect();
        for (height, hash) in &expired {
            self.by_height.remove(height);
            self.by_hash.remove(hash);
        }
        expired.into_iter().map(|(_, hash)| hash).collect()
    }
}
