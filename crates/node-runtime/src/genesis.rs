//! Genesis block builder.

use shared_types::{Block, BlockHeader};

/// Builds the height-0 block a fresh ledger seeds from.
#[derive(Debug, Clone)]
pub struct GenesisBuilder {
    timestamp_ms: u64,
    extra: Vec<u8>,
}

impl GenesisBuilder {
    /// Genesis at a fixed timestamp.
    pub fn new(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            extra: Vec::new(),
        }
    }

    /// Fold network-identifying bytes into the genesis identity, so two
    /// networks with different tags get different genesis hashes.
    pub fn with_network_tag(mut self, tag: &str) -> Self {
        self.extra = tag.as_bytes().to_vec();
        self
    }

    /// Build the genesis block.
    pub fn build(self) -> Block {
        let mut prev_hash = [0u8; 32];
        // The tag perturbs prev_hash, which is otherwise unused at height 0.
        for (i, byte) in self.extra.iter().enumerate() {
            prev_hash[i % 32] ^= byte;
        }
        Block {
            header: BlockHeader {
                height: 0,
                timestamp_ms: self.timestamp_ms,
                prev_hash,
                pow_hash: [0u8; 32],
                nonce: 0,
                miner_pubkey: [0u8; 48],
            },
            sub_blocks: vec![],
            transactions: vec![],
        }
    }
}
