//! Replication round-trip scenarios.

use crate::harness::{build_node, register_validators, signed_tx};
use shared_crypto::Secp256k1KeyPair;
use shared_types::Shutdown;
use syn_replication::InMemoryPeerBus;
use tempfile::TempDir;

/// Scenario: range sync. B starts empty while A holds blocks 1..=10;
/// after `synchronize`, both chains agree block-for-block.
#[tokio::test]
async fn test_range_sync_round_trip() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let node_a = build_node(&bus, dir.path(), "a");
    let node_b = build_node(&bus, dir.path(), "b");
    register_validators(&node_a.ledger, &[&node_a.validator_key]);

    let (signal, shutdown) = Shutdown::new();
    node_a.replication.clone().start(shutdown.clone());
    node_b.replication.clone().start(shutdown.clone());

    // A seals ten blocks, one endorsed sub-block each.
    let wallet = Secp256k1KeyPair::generate();
    for nonce in 1..=10u64 {
        node_a.ledger.add_to_pool(signed_tx(&wallet, nonce)).unwrap();
        node_a.engine.propose_sub_block().await.unwrap().unwrap();
        node_a
            .engine
            .seal_main_block(&shutdown)
            .await
            .unwrap()
            .unwrap();
    }
    assert_eq!(node_a.ledger.last_height(), 10);
    assert_eq!(node_b.ledger.last_height(), 0);

    let mut sync_shutdown = shutdown.clone();
    let height = node_b.replication.synchronize(&mut sync_shutdown).await.unwrap();
    assert_eq!(height, 10);

    // Hashes agree on both sides, block for block.
    for h in 1..=10u64 {
        let a = node_a.ledger.block_by_height(h).unwrap().unwrap();
        let b = node_b.ledger.block_by_height(h).unwrap().unwrap();
        assert_eq!(a.hash(), b.hash(), "height {h}");
    }
    assert_eq!(node_a.ledger.last_block_hash(), node_b.ledger.last_block_hash());
    signal.cancel();
}

/// Sync honors cancellation: a cancelled context terminates the loop
/// cleanly without an error.
#[tokio::test]
async fn test_sync_cancellation_is_clean() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let node_a = build_node(&bus, dir.path(), "a");
    let node_b = build_node(&bus, dir.path(), "b");

    let (signal, shutdown) = Shutdown::new();
    node_a.replication.clone().start(shutdown.clone());
    node_b.replication.clone().start(shutdown.clone());

    signal.cancel();
    let mut sync_shutdown = shutdown;
    let height = node_b.replication.synchronize(&mut sync_shutdown).await.unwrap();
    assert_eq!(height, 0, "cancelled sync imported nothing");
}
