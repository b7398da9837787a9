//! Chain-advance, sealing and quorum scenarios.

use crate::harness::{build_node, register_validators, signed_tx, TREASURY};
use shared_crypto::Secp256k1KeyPair;
use shared_types::{canonical_encode, sha256, Shutdown, TokenId};
use syn_consensus::{block_reward, SubBlockStatus, VoteMsg};
use syn_replication::InMemoryPeerBus;
use tempfile::TempDir;

/// Scenario: minimal chain advance. Pool transactions land in one PoH
/// sub-block signed by the validator, and the pool drains.
#[tokio::test]
async fn test_minimal_chain_advance() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let node = build_node(&bus, dir.path(), "solo");
    register_validators(&node.ledger, &[&node.validator_key]);

    let wallet = Secp256k1KeyPair::generate();
    node.ledger.add_to_pool(signed_tx(&wallet, 1)).unwrap();
    node.ledger.add_to_pool(signed_tx(&wallet, 2)).unwrap();
    assert_eq!(node.ledger.pool_len(), 2);

    let sub_block = node.engine.propose_sub_block().await.unwrap().unwrap();

    // poh_digest == SHA256(tx_bytes… || timestamp_ms_le), recomputed by hand.
    let mut preimage = Vec::new();
    for tx in &sub_block.transactions {
        preimage.extend_from_slice(tx);
    }
    preimage.extend_from_slice(&sub_block.header.timestamp_ms.to_le_bytes());
    assert_eq!(sub_block.header.poh_digest, sha256(&preimage));

    // Signed by the validator's role key over the canonical header hash.
    assert_eq!(
        sub_block.header.validator_pubkey,
        node.validator_key.public_key().to_bytes()
    );
    let hash = sub_block.header.canonical_hash();
    assert!(shared_crypto::verify(
        shared_types::SignatureAlgo::Bls,
        &sub_block.header.validator_pubkey,
        &hash,
        &sub_block.header.signature,
    )
    .unwrap());

    assert_eq!(node.ledger.pool_len(), 0, "pool is empty after the tick");
    assert_eq!(node.ledger.last_sub_block_height(), 1);
}

/// Scenario: main-block seal. With the default easy target, nonce 0
/// already satisfies PoW; the ledger head moves and peers receive the
/// block.
#[tokio::test]
async fn test_main_block_seal_reaches_replica() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let miner = build_node(&bus, dir.path(), "miner");
    let replica = build_node(&bus, dir.path(), "replica");
    register_validators(&miner.ledger, &[&miner.validator_key]);

    let (signal, shutdown) = Shutdown::new();
    miner.replication.clone().start(shutdown.clone());
    replica.replication.clone().start(shutdown.clone());

    let wallet = Secp256k1KeyPair::generate();
    miner.ledger.add_to_pool(signed_tx(&wallet, 1)).unwrap();
    miner.ledger.add_to_pool(signed_tx(&wallet, 2)).unwrap();
    miner.engine.propose_sub_block().await.unwrap().unwrap();

    let block = miner
        .engine
        .seal_main_block(&shutdown)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(block.header.height, 1);
    assert_eq!(block.header.nonce, 0, "easy target seals at nonce 0");
    assert_eq!(miner.ledger.last_block_hash(), block.hash());

    // Replication disseminated the block to the peer.
    for _ in 0..50 {
        if replica.ledger.has_block(&block.hash()) {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(replica.ledger.has_block(&block.hash()));
    signal.cancel();
}

/// Scenario: PoS vote quorum with 4 validators. Two votes keep the
/// sub-block Gossiped (2 < ⌈2/3 × 4⌉ = 3); the third endorses it.
#[tokio::test]
async fn test_vote_quorum_transition() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let node = build_node(&bus, dir.path(), "solo");

    let others: Vec<shared_crypto::BlsKeyPair> =
        (0..3).map(|_| shared_crypto::BlsKeyPair::generate()).collect();
    let mut all = vec![&node.validator_key];
    all.extend(others.iter());
    register_validators(&node.ledger, &all);

    let wallet = Secp256k1KeyPair::generate();
    node.ledger.add_to_pool(signed_tx(&wallet, 1)).unwrap();
    let sub_block = node.engine.propose_sub_block().await.unwrap().unwrap();
    let hash = sub_block.header.canonical_hash();

    // Proposal already cast the self-vote: 1 of 4.
    assert_eq!(node.ledger.vote_count(&hash), 1);
    assert_eq!(
        node.engine.sub_block_status(&hash),
        Some(SubBlockStatus::Gossiped)
    );

    let vote_from = |key: &shared_crypto::BlsKeyPair| {
        canonical_encode(&VoteMsg {
            header_hash: hash,
            validator_pubkey: key.public_key().to_bytes(),
            signature: key.sign(&hash).to_bytes(),
        })
        .unwrap()
    };

    node.engine.handle_vote_bytes(&vote_from(&others[0]));
    assert_eq!(node.ledger.vote_count(&hash), 2);
    assert_eq!(
        node.engine.sub_block_status(&hash),
        Some(SubBlockStatus::Gossiped),
        "2 of 4 is below quorum"
    );

    node.engine.handle_vote_bytes(&vote_from(&others[1]));
    assert_eq!(
        node.engine.sub_block_status(&hash),
        Some(SubBlockStatus::Endorsed)
    );
}

/// Reward conservation at seal time: miner + stakers + treasury equals
/// the halved reward exactly.
#[tokio::test]
async fn test_reward_conservation_on_seal() {
    let dir = TempDir::new().unwrap();
    let bus = InMemoryPeerBus::new();
    let node = build_node(&bus, dir.path(), "solo");
    register_validators(&node.ledger, &[&node.validator_key]);

    let wallet = Secp256k1KeyPair::generate();
    node.ledger.add_to_pool(signed_tx(&wallet, 1)).unwrap();
    node.engine.propose_sub_block().await.unwrap().unwrap();

    let (_signal, shutdown) = Shutdown::new();
    node.engine.seal_main_block(&shutdown).await.unwrap().unwrap();

    let miner = shared_types::Address::from_public_key(&node.engine.validator_pubkey());
    let minted = node.ledger.token_balance(TokenId::SYN, &miner)
        + node.ledger.token_balance(TokenId::SYN, &TREASURY);
    assert_eq!(minted, block_reward(1));
}
