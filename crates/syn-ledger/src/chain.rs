//! In-memory chain store.
//!
//! Holds the recent block window plus the chain cursor. Older blocks are
//! pruned to the archive by the ledger.

use shared_types::{Block, Hash};
use std::collections::BTreeMap;

/// Recent blocks and the chain head.
#[derive(Debug, Default)]
pub struct ChainStore {
    blocks: BTreeMap<u64, Block>,
    by_hash: BTreeMap<Hash, u64>,
    last_height: u64,
    last_hash: Hash,
}

impl ChainStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the chain head.
    pub fn last_height(&self) -> u64 {
        self.last_height
    }

    /// Canonical hash of the chain head.
    pub fn last_hash(&self) -> Hash {
        self.last_hash
    }

    /// Number of blocks currently held in memory.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when no block has been inserted.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Whether a block with this header hash is held in memory.
    pub fn has_hash(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Block by height, if in the in-memory window.
    pub fn get_by_height(&self, height: u64) -> Option<&Block> {
        self.blocks.get(&height)
    }

    /// Block by header hash, if in the in-memory window.
    pub fn get_by_hash(&self, hash: &Hash) -> Option<&Block> {
        self.by_hash
            .get(hash)
            .and_then(|height| self.blocks.get(height))
    }

    /// Insert a block and advance the head.
    pub fn insert(&mut self, block: Block) {
        let height = block.header.height;
        let hash = block.hash();
        if height >= self.last_height || self.blocks.is_empty() {
            self.last_height = height;
            self.last_hash = hash;
        }
        self.by_hash.insert(hash, height);
        self.blocks.insert(height, block);
    }

    /// Every in-memory block, in height order.
    pub fn window_blocks(&self) -> Vec<Block> {
        self.blocks.values().cloned().collect()
    }

    /// Remove and return every block with height below `cutoff`.
    pub fn take_below(&mut self, cutoff: u64) -> Vec<Block> {
        let heights: Vec<u64> = self.blocks.range(..cutoff).map(|(h, _)| *h).collect();
        let mut pruned = Vec::with_capacity(heights.len());
        for height in heights {
            if let Some(block) = self.blocks.remove(&height) {
                self.by_hash.remove(&block.hash());
                pruned.push(block);
            }
        }
        pruned
    }
}
