//! Service container.
//!
//! One `Services` value per node, constructed at startup and threaded
//! explicitly into whatever needs it. No process-wide singletons; tests
//! build their own container around a temp directory.

use crate::config::NodeConfig;
use crate::errors::NodeError;
use crate::genesis::GenesisBuilder;
use shared_crypto::BlsKeyPair;
use shared_types::Shutdown;
use std::sync::Arc;
use std::time::Duration;
use syn_consensus::{ConsensusConfig, ConsensusEngine};
use syn_ledger::{Ledger, LedgerConfig};
use syn_replication::{PeerManager, Replication, ReplicationConfig};
use syn_vm::VmService;
use tracing::info;

/// The single authoritative service set for one node.
pub struct Services {
    /// Chain state and persistence.
    pub ledger: Arc<Ledger>,
    /// Opcode dispatcher and execution engine.
    pub vm: Arc<VmService>,
    /// Gossip replication.
    pub replication: Arc<Replication>,
    /// Hybrid consensus engine.
    pub consensus: Arc<ConsensusEngine>,
}

impl Services {
    /// Wire the full service graph from a configuration, a peer-manager
    /// capability and this node's validator role key.
    ///
    /// Ownership is one-way: `Services` owns every component; the
    /// components hold capability handles, never parent pointers.
    pub fn build(
        config: &NodeConfig,
        peers: Arc<dyn PeerManager>,
        validator_key: BlsKeyPair,
    ) -> Result<Self, NodeError> {
        let treasury = config.treasury_address()?;
        let initial_difficulty = config.initial_difficulty()?;

        let genesis = GenesisBuilder::new(0)
            .with_network_tag(&config.network.discovery_tag)
            .build();
        let mut ledger_config = LedgerConfig::in_dir(&config.data_dir, genesis);
        ledger_config.snapshot_interval = config.snapshot_interval;
        ledger_config.prune_interval = config.prune_interval;
        ledger_config.initial_difficulty = initial_difficulty;
        ledger_config.sub_block_retention_ms = 2 * config.main_block_interval_secs * 1_000;
        let ledger = Arc::new(Ledger::open(ledger_config)?);

        let vm = Arc::new(VmService::new(config.chain_id)?);
        ledger.set_call_dispatcher(Arc::clone(&vm) as _);

        let replication = Replication::new(
            Arc::clone(&peers),
            Arc::clone(&ledger),
            ReplicationConfig::default(),
        );

        let consensus_config = ConsensusConfig {
            sub_block_interval: Duration::from_secs(config.sub_block_interval_secs),
            main_block_interval: Duration::from_secs(config.main_block_interval_secs),
            treasury,
            chain_id: config.chain_id,
        };
        let consensus = ConsensusEngine::new(
            Arc::clone(&ledger),
            peers,
            Arc::clone(&replication),
            validator_key,
            consensus_config,
        );

        info!(height = ledger.last_height(), "Services wired");
        Ok(Self {
            ledger,
            vm,
            replication,
            consensus,
        })
    }

    /// Start every background loop. Idempotent; loops stop on `shutdown`.
    pub fn start(&self, shutdown: Shutdown) {
        Arc::clone(&self.replication).start(shutdown.clone());
        Arc::clone(&self.consensus).start(shutdown);
    }
}
