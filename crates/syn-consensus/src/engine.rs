//! The consensus engine.
//!
//! Three cooperating loops: the sub-block proposer (PoH + self-
//! endorsement), the vote subscriber (PoS endorsements over gossip), and
//! the main-block sealer (PoW). A fourth loop receives gossiped sub-block
//! headers and casts this node's vote.
//!
//! Sub-block lifecycle: `Proposed → Gossiped → Endorsed → Included`, or
//! `Expired` when the retention window lapses before endorsement.

use crate::config::ConsensusConfig;
use crate::difficulty::DifficultyWindow;
use crate::errors::{ConsensusError, ConsensusResult};
use crate::rewards::distribute;
use crate::votes::{is_endorsed, VoteMsg, SUB_BLOCK_TOPIC, VOTE_TOPIC};
use crate::weights::{calculate, ConsensusWeights, WeightInputs};
use primitive_types::U256;
use shared_crypto::BlsKeyPair;
use shared_types::{
    canonical_decode, canonical_encode, sha256, Block, BlockHeader, Hash, Shutdown, SubBlock,
    SubBlockHeader, TokenId, MAX_SUB_BLOCKS_PER_BLOCK, MAX_TXS_PER_SUB_BLOCK,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};
use syn_ledger::Ledger;
use syn_replication::{PeerManager, Replication};
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Nonces tried between cancellation checks in the PoW inner loop.
const POW_CANCEL_STRIDE: u64 = 1 << 16;

/// Lifecycle of a sub-block as this node sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubBlockStatus {
    /// Created locally with PoH and self-endorsement.
    Proposed,
    /// Header seen on the gossip topic.
    Gossiped,
    /// Super-majority of PoS votes recorded.
    Endorsed,
    /// Referenced by an appended main block.
    Included,
    /// Retention window lapsed before endorsement.
    Expired,
}

/// Milliseconds since the Unix epoch.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Hybrid PoH/PoS/PoW consensus engine for one node.
pub struct ConsensusEngine {
    ledger: Arc<Ledger>,
    peers: Arc<dyn PeerManager>,
    replication: Arc<Replication>,
    config: ConsensusConfig,
    /// BLS role key: sub-block proposals, votes and the PoW miner id.
    validator_key: BlsKeyPair,
    statuses: Mutex<HashMap<Hash, SubBlockStatus>>,
    window: Mutex<DifficultyWindow>,
    weights: RwLock<ConsensusWeights>,
    started: AtomicBool,
}

impl ConsensusEngine {
    /// Build the engine around its collaborators.
    pub fn new(
        ledger: Arc<Ledger>,
        peers: Arc<dyn PeerManager>,
        replication: Arc<Replication>,
        validator_key: BlsKeyPair,
        config: ConsensusConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            ledger,
            peers,
            replication,
            config,
            validator_key,
            statuses: Mutex::new(HashMap::new()),
            window: Mutex::new(DifficultyWindow::new()),
            weights: RwLock::new(ConsensusWeights::default()),
            started: AtomicBool::new(false),
        })
    }

    /// Start the proposer, sealer, header and vote loops. Idempotent and
    /// returns immediately; loops drain their current iteration and exit
    /// on `shutdown`.
    pub fn start(self: Arc<Self>, shutdown: Shutdown) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let proposer = Arc::clone(&self);
        let mut proposer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = interval(proposer.config.sub_block_interval);
            ticker.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = proposer_shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = proposer.propose_sub_block().await {
                            warn!(error = %e, "Sub-block proposal failed");
                        }
                    }
                }
            }
            debug!("Proposer stopped");
        });

        let sealer = Arc::clone(&self);
        let mut sealer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            let mut ticker = interval(sealer.config.main_block_interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = sealer_shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        match sealer.seal_main_block(&sealer_shutdown).await {
                            Ok(Some(block)) => {
                                info!(height = block.header.height, "Sealed main block");
                            }
                            Ok(None) => debug!("No endorsed sub-blocks; seal skipped"),
                            // Ledger rejections retry next tick with
                            // recomputed contents.
                            Err(e) => warn!(error = %e, "Seal failed; retrying next tick"),
                        }
                    }
                }
            }
            debug!("Sealer stopped");
        });

        let header_handler = Arc::clone(&self);
        let mut header_shutdown = shutdown.clone();
        let mut header_stream = self.peers.subscribe(SUB_BLOCK_TOPIC);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = header_shutdown.cancelled() => break,
                    envelope = header_stream.recv() => {
                        let Some(envelope) = envelope else { break };
                        header_handler.handle_sub_block_header(&envelope.payload).await;
                    }
                }
            }
            header_handler.peers.unsubscribe(SUB_BLOCK_TOPIC);
            debug!("Header subscriber stopped");
        });

        let vote_handler = Arc::clone(&self);
        let mut vote_shutdown = shutdown;
        let mut vote_stream = self.peers.subscribe(VOTE_TOPIC);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = vote_shutdown.cancelled() => break,
                    envelope = vote_stream.recv() => {
                        let Some(envelope) = envelope else { break };
                        vote_handler.handle_vote_bytes(&envelope.payload);
                    }
                }
            }
            vote_handler.peers.unsubscribe(VOTE_TOPIC);
            debug!("Vote subscriber stopped");
        });

        info!("Consensus engine started");
    }

    /// This node's BLS role key bytes.
    pub fn validator_pubkey(&self) -> [u8; 48] {
        self.validator_key.public_key().to_bytes()
    }

    /// Lifecycle status of a sub-block, if this node has seen it.
    pub fn sub_block_status(&self, hash: &Hash) -> Option<SubBlockStatus> {
        // Endorsement can arrive from votes recorded after the last
        // status write; recompute before answering.
        let mut statuses = self.statuses.lock().expect("status lock poisoned");
        if let Some(status) = statuses.get_mut(hash) {
            if matches!(status, SubBlockStatus::Proposed | SubBlockStatus::Gossiped)
                && is_endorsed(&self.ledger, hash)
            {
                *status = SubBlockStatus::Endorsed;
            }
            return Some(*status);
        }
        None
    }

    /// Current dynamic weights.
    pub fn weights(&self) -> ConsensusWeights {
        *self.weights.read().expect("weights lock poisoned")
    }

    /// Recompute the dynamic weights from fresh demand/stake metrics.
    pub fn update_weights(&self, inputs: &WeightInputs) -> ConsensusWeights {
        let weights = calculate(inputs);
        *self.weights.write().expect("weights lock poisoned") = weights;
        weights
    }

    // -------------------------------------------------------------------------
    // SUB-BLOCK PROPOSAL
    // -------------------------------------------------------------------------

    /// Drain the pool into a PoH sub-block, self-endorse, append and
    /// gossip it. Returns the proposed sub-block, or `None` when the pool
    /// is empty.
    pub async fn propose_sub_block(&self) -> ConsensusResult<Option<SubBlock>> {
        let picked = self.ledger.pick(MAX_TXS_PER_SUB_BLOCK);
        if picked.is_empty() {
            return Ok(None);
        }

        let transactions: Vec<Vec<u8>> = picked
            .iter()
            .map(canonical_encode)
            .collect::<Result<_, _>>()
            .map_err(|e| ConsensusError::Serialization(e.to_string()))?;

        let timestamp_ms = now_ms();
        let mut header = SubBlockHeader {
            height: self.ledger.last_sub_block_height() + 1,
            timestamp_ms,
            validator_pubkey: self.validator_pubkey(),
            poh_digest: shared_types::poh_digest(&transactions, timestamp_ms),
            signature: [0u8; 96],
        };
        let hash = header.canonical_hash();
        header.signature = self.validator_key.sign(&hash).to_bytes();

        let sub_block = SubBlock {
            header: header.clone(),
            transactions,
        };
        self.ledger.append_sub_block(sub_block.clone())?;
        self.set_status(hash, SubBlockStatus::Proposed);
        info!(height = header.height, txs = sub_block.transactions.len(), "Proposed sub-block");

        // Broadcast the header, then endorse our own proposal.
        let header_bytes = canonical_encode(&header)
            .map_err(|e| ConsensusError::Serialization(e.to_string()))?;
        for peer in self.peers.peers() {
            if let Err(e) = self
                .peers
                .send_async(&peer.id, SUB_BLOCK_TOPIC, 0, header_bytes.clone())
                .await
            {
                debug!(peer = %peer.id, error = %e, "Header broadcast failed");
            }
        }
        self.set_status(hash, SubBlockStatus::Gossiped);
        self.cast_vote(&hash).await?;
        Ok(Some(sub_block))
    }

    /// Sign and record our endorsement for a header hash, and gossip it.
    async fn cast_vote(&self, hash: &Hash) -> ConsensusResult<()> {
        let vote = VoteMsg {
            header_hash: *hash,
            validator_pubkey: self.validator_pubkey(),
            signature: self.validator_key.sign(hash).to_bytes(),
        };
        self.ledger
            .record_pos_vote(&vote.header_hash, &vote.validator_pubkey, &vote.signature)?;

        let bytes = canonical_encode(&vote)
            .map_err(|e| ConsensusError::Serialization(e.to_string()))?;
        for peer in self.peers.peers() {
            if let Err(e) = self
                .peers
                .send_async(&peer.id, VOTE_TOPIC, 0, bytes.clone())
                .await
            {
                debug!(peer = %peer.id, error = %e, "Vote broadcast failed");
            }
        }
        Ok(())
    }

    /// A gossiped sub-block header: verify the self-endorsement and vote.
    async fn handle_sub_block_header(&self, payload: &[u8]) {
        let Ok(header) = canonical_decode::<SubBlockHeader>(payload) else {
            debug!("Dropped undecodable sub-block header");
            return;
        };
        let hash = header.canonical_hash();
        let signed = shared_crypto::verify(
            shared_types::SignatureAlgo::Bls,
            &header.validator_pubkey,
            &hash,
            &header.signature,
        )
        .unwrap_or(false);
        if !signed {
            debug!(height = header.height, "Dropped sub-block header with bad signature");
            return;
        }

        self.statuses
            .lock()
            .expect("status lock poisoned")
            .entry(hash)
            .or_insert(SubBlockStatus::Gossiped);
        if let Err(e) = self.cast_vote(&hash).await {
            debug!(error = %e, "Vote on gossiped header failed");
        }
    }

    /// A gossiped vote: decode errors drop it silently; valid votes are
    /// recorded with deduplication by validator identity.
    pub fn handle_vote_bytes(&self, payload: &[u8]) {
        let Ok(vote) = canonical_decode::<VoteMsg>(payload) else {
            return;
        };
        if !vote.verify() {
            debug!("Dropped vote with bad signature");
            return;
        }
        if !self.ledger.is_active_validator(&vote.validator_pubkey) {
            debug!("Dropped vote from inactive validator");
            return;
        }
        if let Err(e) =
            self.ledger
                .record_pos_vote(&vote.header_hash, &vote.validator_pubkey, &vote.signature)
        {
            warn!(error = %e, "Vote record failed");
            return;
        }
        if is_endorsed(&self.ledger, &vote.header_hash) {
            let mut statuses = self.statuses.lock().expect("status lock poisoned");
            if let Some(status) = statuses.get_mut(&vote.header_hash) {
                if matches!(status, SubBlockStatus::Proposed | SubBlockStatus::Gossiped) {
                    *status = SubBlockStatus::Endorsed;
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // MAIN-BLOCK SEALING
    // -------------------------------------------------------------------------

    /// One sealer tick: collect endorsed sub-block headers, solve PoW,
    /// append, retarget, distribute rewards and replicate. Returns
    /// `None` when no endorsed sub-blocks exist (not an error).
    pub async fn seal_main_block(&self, shutdown: &Shutdown) -> ConsensusResult<Option<Block>> {
        // Retention expiry first.
        for hash in self.ledger.expire_sub_blocks(now_ms()) {
            self.set_status(hash, SubBlockStatus::Expired);
        }

        let endorsed: Vec<SubBlockHeader> = self
            .ledger
            .pending_sub_blocks()
            .into_iter()
            .filter(|sb| is_endorsed(&self.ledger, &sb.header.canonical_hash()))
            .map(|sb| sb.header)
            .take(MAX_SUB_BLOCKS_PER_BLOCK)
            .collect();
        if endorsed.is_empty() {
            return Ok(None);
        }

        let target = self.ledger.difficulty();
        let mut header = BlockHeader {
            height: self.ledger.last_height() + 1,
            timestamp_ms: now_ms(),
            prev_hash: self.ledger.last_block_hash(),
            pow_hash: [0u8; 32],
            nonce: 0,
            miner_pubkey: self.validator_pubkey(),
        };
        self.solve_pow(&mut header, target, shutdown)?;

        let block = Block {
            header,
            sub_blocks: endorsed,
            // Pool snapshot at zero: transactions ride in sub-blocks.
            transactions: Vec::new(),
        };
        self.ledger.add_block(block.clone())?;

        // Post-append bookkeeping: block time, retarget, rewards, gossip.
        let next_target = {
            let mut window = self.window.lock().expect("window lock poisoned");
            window.record(block.header.timestamp_ms);
            window.retarget(target, self.config.main_block_interval.as_millis() as u64)
        };
        if next_target != target {
            self.ledger.set_difficulty(next_target)?;
            info!(target = %next_target, "Difficulty retargeted");
        }

        for payout in distribute(&block, self.config.treasury) {
            self.ledger.mint(TokenId::SYN, &payout.to, payout.amount)?;
        }

        for sub_header in &block.sub_blocks {
            self.set_status(sub_header.canonical_hash(), SubBlockStatus::Included);
        }

        if let Err(e) = self.replication.replicate_block(&block).await {
            warn!(error = %e, "Block replication failed");
        }
        Ok(Some(block))
    }

    /// Brute-force the PoW nonce: first `n` with
    /// `int(SHA256(serialize(header) || u64_le(n))) ≤ target` wins.
    fn solve_pow(
        &self,
        header: &mut BlockHeader,
        target: U256,
        shutdown: &Shutdown,
    ) -> ConsensusResult<()> {
        let preimage = header
            .pow_preimage()
            .map_err(|e| ConsensusError::Serialization(e.to_string()))?;
        let mut buffer = Vec::with_capacity(preimage.len() + 8);

        for nonce in 0u64.. {
            if nonce % POW_CANCEL_STRIDE == 0 && shutdown.is_cancelled() {
                return Err(ConsensusError::SealCancelled);
            }
            buffer.clear();
            buffer.extend_from_slice(&preimage);
            buffer.extend_from_slice(&nonce.to_le_bytes());
            let pow = sha256(&buffer);
            if U256::from_big_endian(&pow) <= target {
                header.pow_hash = pow;
                header.nonce = nonce;
                return Ok(());
            }
        }
        unreachable!("nonce space exhausted")
    }

    fn set_status(&self, hash: Hash, status: SubBlockStatus) {
        self.statuses
            .lock()
            .expect("status lock poisoned")
            .insert(hash, status);
    }
}
