//! Shared test fixtures: a full node harness over a temp directory and
//! the in-process peer bus.

use shared_crypto::{BlsKeyPair, Secp256k1KeyPair};
use shared_types::{Address, Transaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use syn_consensus::{ConsensusConfig, ConsensusEngine};
use syn_ledger::{Ledger, LedgerConfig};
use syn_replication::{InMemoryPeerBus, PeerManager, Replication, ReplicationConfig};

/// Treasury account used across scenarios.
pub const TREASURY: Address = Address([0xEEu8; 20]);

/// A fully wired single node for scenarios.
pub struct TestNode {
    /// This node's ledger.
    pub ledger: Arc<Ledger>,
    /// This node's consensus engine.
    pub engine: Arc<ConsensusEngine>,
    /// This node's replication service.
    pub replication: Arc<Replication>,
    /// The node's validator role key.
    pub validator_key: BlsKeyPair,
}

/// Build a node registered on `bus` with storage under `dir/name`.
pub fn build_node(bus: &InMemoryPeerBus, dir: &Path, name: &str) -> TestNode {
    let genesis = node_runtime::GenesisBuilder::new(1_000)
        .with_network_tag("synnergy/test")
        .build();
    let ledger = Arc::new(Ledger::open(LedgerConfig::in_dir(dir.join(name), genesis)).unwrap());

    let peers: Arc<dyn PeerManager> = Arc::new(bus.register(name));
    let replication = Replication::new(
        Arc::clone(&peers),
        Arc::clone(&ledger),
        ReplicationConfig {
            request_timeout: Duration::from_millis(500),
            sync_batch: 4,
        },
    );

    let validator_key = BlsKeyPair::generate();
    let engine_key = BlsKeyPair::from_secret_bytes(&validator_key.secret_bytes()).unwrap();
    let mut config = ConsensusConfig::with_treasury(TREASURY);
    config.sub_block_interval = Duration::from_millis(50);
    config.main_block_interval = Duration::from_millis(100);
    let engine = ConsensusEngine::new(
        Arc::clone(&ledger),
        peers,
        Arc::clone(&replication),
        engine_key,
        config,
    );

    TestNode {
        ledger,
        engine,
        replication,
        validator_key,
    }
}

/// Register `keys` as active validators on `ledger`.
pub fn register_validators(ledger: &Ledger, keys: &[&BlsKeyPair]) {
    for key in keys {
        ledger
            .register_validator(&shared_types::Validator {
                public_key: key.public_key().to_bytes(),
                stake: 100,
                active: true,
            })
            .unwrap();
    }
}

/// A pool-admissible signed transfer.
pub fn signed_tx(keypair: &Secp256k1KeyPair, nonce: u64) -> Transaction {
    let mut tx = Transaction::transfer(keypair.address(), Address([9u8; 20]), 10, nonce);
    tx.sender_pubkey = keypair.public_key().as_bytes().to_vec();
    tx.signature = *keypair.sign(&tx.signing_bytes()).as_bytes();
    tx.ensure_hash();
    tx
}
