//! # Synnergy Replication
//!
//! Gossip-based block propagation (inventory / get-data / block), range
//! sync for catch-up, and per-hash await — all over a pluggable
//! [`PeerManager`] capability.

#![warn(clippy::all)]

pub mod bus;
pub mod errors;
pub mod messages;
pub mod peer;
pub mod service;

// Re-exports
pub use bus::{InMemoryPeerBus, PeerHandle};
pub use errors::{ReplicationError, ReplicationResult};
pub use messages::{code, Message, TOPIC};
pub use peer::{Envelope, MessageStream, PeerId, PeerInfo, PeerManager};
pub use service::{Replication, ReplicationConfig};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod replication_tests {
    use super::*;
    use shared_types::{sha256, Block, BlockHeader, Shutdown};
    use std::sync::Arc;
    use std::time::Duration;
    use syn_ledger::{Ledger, LedgerConfig};
    use tempfile::TempDir;

    fn genesis() -> Block {
        Block {
            header: BlockHeader {
                height: 0,
                timestamp_ms: 1_000,
                prev_hash: [0u8; 32],
                pow_hash: [0u8; 32],
                nonce: 0,
                miner_pubkey: [0u8; 48],
            },
            sub_blocks: vec![],
            transactions: vec![],
        }
    }

    fn open_ledger(dir: &TempDir, name: &str) -> Arc<Ledger> {
        let config = LedgerConfig::in_dir(dir.path().join(name), genesis());
        Arc::new(Ledger::open(config).unwrap())
    }

    fn seal_child(ledger: &Ledger) -> Block {
        let mut header = BlockHeader {
            height: ledger.last_height() + 1,
            timestamp_ms: 2_000 + ledger.last_height(),
            prev_hash: ledger.last_block_hash(),
            pow_hash: [0u8; 32],
            nonce: 0,
            miner_pubkey: [0u8; 48],
        };
        let mut preimage = header.pow_preimage().unwrap();
        preimage.extend_from_slice(&header.nonce.to_le_bytes());
        header.pow_hash = sha256(&preimage);
        Block {
            header,
            sub_blocks: vec![],
            transactions: vec![],
        }
    }

    fn quick_config() -> ReplicationConfig {
        ReplicationConfig {
            request_timeout: Duration::from_millis(500),
            sync_batch: 4,
        }
    }

    #[tokio::test]
    async fn test_gossip_round_trip_via_inventory() {
        let dir = TempDir::new().unwrap();
        let bus = InMemoryPeerBus::new();

        let ledger_a = open_ledger(&dir, "a");
        let ledger_b = open_ledger(&dir, "b");

        let node_a = Replication::new(
            Arc::new(bus.register("a")),
            Arc::clone(&ledger_a),
            quick_config(),
        );
        let node_b = Replication::new(
            Arc::new(bus.register("b")),
            Arc::clone(&ledger_b),
            quick_config(),
        );

        let (signal, shutdown) = Shutdown::new();
        node_a.clone().start(shutdown.clone());
        node_b.clone().start(shutdown);

        // A seals a block and announces it; B fetches and imports it.
        let block = seal_child(&ledger_a);
        let hash = block.hash();
        ledger_a.add_block(block.clone()).unwrap();
        node_a.replicate_block(&block).await.unwrap();

        for _ in 0..50 {
            if ledger_b.has_block(&hash) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(ledger_b.has_block(&hash));
        assert_eq!(ledger_b.last_block_hash(), ledger_a.last_block_hash());
        signal.cancel();
    }

    #[tokio::test]
    async fn test_range_sync_catches_up_empty_node() {
        let dir = TempDir::new().unwrap();
        let bus = InMemoryPeerBus::new();

        let ledger_a = open_ledger(&dir, "a");
        let ledger_b = open_ledger(&dir, "b");

        for _ in 0..10 {
            ledger_a.add_block(seal_child(&ledger_a)).unwrap();
        }
        assert_eq!(ledger_a.last_height(), 10);

        let node_a = Replication::new(
            Arc::new(bus.register("a")),
            Arc::clone(&ledger_a),
            quick_config(),
        );
        let node_b = Replication::new(
            Arc::new(bus.register("b")),
            Arc::clone(&ledger_b),
            quick_config(),
        );

        let (signal, shutdown) = Shutdown::new();
        node_a.clone().start(shutdown.clone());
        node_b.clone().start(shutdown.clone());

        let mut sync_shutdown = shutdown;
        let height = node_b.synchronize(&mut sync_shutdown).await.unwrap();
        assert_eq!(height, 10);
        assert_eq!(ledger_b.last_block_hash(), ledger_a.last_block_hash());
        signal.cancel();
    }

    #[tokio::test]
    async fn test_request_missing_times_out_without_responders() {
        let dir = TempDir::new().unwrap();
        let bus = InMemoryPeerBus::new();
        let ledger = open_ledger(&dir, "a");

        // A peer exists but never answers.
        bus.register("silent");
        let node = Replication::new(
            Arc::new(bus.register("a")),
            ledger,
            ReplicationConfig {
                request_timeout: Duration::from_millis(100),
                sync_batch: 4,
            },
        );

        let err = node.request_missing(&[9u8; 32]).await.unwrap_err();
        assert!(matches!(err, ReplicationError::DeadlineExceeded(_)));
    }

    #[tokio::test]
    async fn test_request_missing_without_peers() {
        let dir = TempDir::new().unwrap();
        let bus = InMemoryPeerBus::new();
        let ledger = open_ledger(&dir, "a");
        let node = Replication::new(Arc::new(bus.register("a")), ledger, quick_config());

        assert!(matches!(
            node.request_missing(&[9u8; 32]).await.unwrap_err(),
            ReplicationError::NoPeers
        ));
    }
}
