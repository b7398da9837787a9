//! The ledger facade.
//!
//! Owns chain state and mediates all persistence. Appends are serialised
//! behind a write lock; every durable mutation hits the WAL before the
//! in-memory structures, so a crash replays to exactly the committed
//! state. Snapshots fold the WAL away on an interval; blocks leaving the
//! prune window are gzipped into the archive.

use crate::archive::{archive_block, load_archived_block};
use crate::chain::ChainStore;
use crate::config::LedgerConfig;
use crate::errors::{InvariantError, LedgerError, LedgerResult, StartupError};
use crate::keys;
use crate::pending::PendingSubBlocks;
use crate::pool::{PoolConfig, TransactionPool};
use crate::snapshot::{load_snapshot, write_snapshot, SnapshotData};
use crate::state::{drain_pending_logs, CallKind, LedgerState, SnapshotFrame, StateRW};
use crate::tokens::TokenMeta;
use crate::wal::{Wal, WalRecord};
use primitive_types::U256;
use shared_types::{
    canonical_decode, canonical_encode, sha256, Address, Block, Hash, Log, SignatureAlgo,
    SubBlock, TokenId, Transaction, Validator, MAX_SUB_BLOCKS_PER_BLOCK,
};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// State key holding the current difficulty target (32B BE).
const DIFFICULTY_KEY: &[u8] = b"chain:difficulty";

/// Hook for contract invocation; implemented by the VM and wired in by
/// the node runtime so the ledger never depends on the dispatcher.
pub trait CallDispatcher: Send + Sync {
    /// Execute `target`'s code over `state` and return its output.
    fn dispatch(
        &self,
        kind: CallKind,
        state: &mut dyn StateRW,
        target: Address,
        input: &[u8],
        gas: u64,
    ) -> LedgerResult<Vec<u8>>;
}

struct LedgerInner {
    wal: Wal,
    state: LedgerState,
    chain: ChainStore,
    pending: PendingSubBlocks,
    pool: TransactionPool,
}

/// The authoritative ledger instance for one node.
pub struct Ledger {
    config: LedgerConfig,
    inner: RwLock<LedgerInner>,
    call_dispatcher: RwLock<Option<Arc<dyn CallDispatcher>>>,
}

impl Ledger {
    /// Open a ledger: replay the WAL over the latest snapshot, or seed
    /// from the configured genesis block when neither exists.
    pub fn open(config: LedgerConfig) -> Result<Self, StartupError> {
        if config.genesis.header.height != 0 {
            return Err(StartupError::InvalidGenesis(format!(
                "genesis height {} != 0",
                config.genesis.header.height
            )));
        }

        let mut wal = Wal::open(&config.wal_path)?;
        let snapshot = load_snapshot(&config.snapshot_path)?;
        let records = wal.replay()?;

        let mut state = LedgerState::new();
        let mut chain = ChainStore::new();
        let mut sub_block_height = 0;

        if let Some(data) = snapshot {
            info!(height = data.height, "Restoring ledger from snapshot");
            state = LedgerState::from_entries(data.entries);
            sub_block_height = data.sub_block_height;
            for block in data.blocks {
                chain.insert(block);
            }
        }

        let fresh = chain.is_empty() && records.is_empty();
        if fresh {
            info!("Seeding ledger from genesis");
            let genesis = config.genesis.clone();
            wal.append(&WalRecord::Block(Box::new(genesis.clone())))
                .map_err(|e| StartupError::Io(e.to_string()))?;
            chain.insert(genesis);
        } else {
            debug!(records = records.len(), "Replaying WAL");
            for record in records {
                match record {
                    WalRecord::Block(block) => chain.insert(*block),
                    WalRecord::Put { key, value } => {
                        let _ = state.put(&key, &value);
                    }
                    WalRecord::Delete { key } => {
                        let _ = state.delete(&key);
                    }
                }
            }
        }

        let pool = TransactionPool::new(PoolConfig {
            capacity: config.pool_capacity,
            max_tx_bytes: config.max_tx_bytes,
        });

        let ledger = Ledger {
            inner: RwLock::new(LedgerInner {
                wal,
                state,
                chain,
                pending: PendingSubBlocks::new(sub_block_height),
                pool,
            }),
            config,
            call_dispatcher: RwLock::new(None),
        };

        // Default registry entries exist from the first boot onward.
        if fresh {
            ledger
                .snapshot(|state| {
                    state.register_token(&TokenMeta::base_currency())?;
                    state.register_token(&TokenMeta::syn_id())
                })
                .map_err(|e| StartupError::Io(e.to_string()))?;
        }

        Ok(ledger)
    }

    /// Register the VM hook for contract calls.
    pub fn set_call_dispatcher(&self, dispatcher: Arc<dyn CallDispatcher>) {
        *self
            .call_dispatcher
            .write()
            .expect("call dispatcher lock poisoned") = Some(dispatcher);
    }

    // -------------------------------------------------------------------------
    // CHAIN READS
    // -------------------------------------------------------------------------

    /// Height of the chain head.
    pub fn last_height(&self) -> u64 {
        self.read().chain.last_height()
    }

    /// Canonical hash of the chain head.
    pub fn last_block_hash(&self) -> Hash {
        self.read().chain.last_hash()
    }

    /// Whether a block with this hash is known (memory window only).
    pub fn has_block(&self, hash: &Hash) -> bool {
        self.read().chain.has_hash(hash)
    }

    /// Block by header hash (memory window only).
    pub fn block_by_hash(&self, hash: &Hash) -> Option<Block> {
        self.read().chain.get_by_hash(hash).cloned()
    }

    /// Block by height, falling back to the archive for pruned heights.
    pub fn block_by_height(&self, height: u64) -> LedgerResult<Option<Block>> {
        if let Some(block) = self.read().chain.get_by_height(height).cloned() {
            return Ok(Some(block));
        }
        load_archived_block(&self.config.archive_path, height)
    }

    /// Current PoW difficulty target.
    pub fn difficulty(&self) -> U256 {
        self.read()
            .state
            .get(DIFFICULTY_KEY)
            .map(|bytes| U256::from_big_endian(&bytes))
            .unwrap_or(self.config.initial_difficulty)
    }

    /// Persist a new difficulty target (consensus retarget output).
    pub fn set_difficulty(&self, target: U256) -> LedgerResult<()> {
        let mut bytes = [0u8; 32];
        target.to_big_endian(&mut bytes);
        self.snapshot(|state| state.put(DIFFICULTY_KEY, &bytes))
    }

    // -------------------------------------------------------------------------
    // BLOCK APPEND
    // -------------------------------------------------------------------------

    /// Validate and append a sealed block atomically.
    ///
    /// Validation covers the height chain, the parent hash, the PoW seal
    /// against the current target, the header count cap, and every
    /// referenced sub-block header (BLS signature always; PoH recomputed
    /// whenever the body is still in the pending buffer). The WAL write
    /// precedes all in-memory mutation, so a failure leaves the ledger
    /// exactly as it was.
    pub fn add_block(&self, block: Block) -> LedgerResult<()> {
        let difficulty = self.difficulty();
        let mut inner = self.write();

        Self::validate_block(&inner, &block, difficulty)?;

        // Durability first; an I/O failure aborts with memory untouched.
        inner.wal.append(&WalRecord::Block(Box::new(block.clone())))?;

        let height = block.header.height;
        let consumed: Vec<Hash> = block
            .sub_blocks
            .iter()
            .map(|header| header.canonical_hash())
            .collect();

        // Pending logs emitted since the last block belong to this one.
        let logs = drain_logs_durable(&mut inner, height)?;
        if !logs.is_empty() {
            debug!(height, count = logs.len(), "Persisted block logs");
        }

        inner.pending.consume(&consumed);
        inner.chain.insert(block);

        if height > 0 && height % self.config.snapshot_interval == 0 {
            if let Err(e) = self.write_snapshot_locked(&mut inner) {
                warn!(height, error = %e, "Snapshot failed; WAL retained");
            }
        }

        if let Err(e) = self.prune_locked(&mut inner) {
            warn!(height, error = %e, "Pruning failed");
        }

        info!(height, "Block appended");
        Ok(())
    }

    fn validate_block(inner: &LedgerInner, block: &Block, difficulty: U256) -> LedgerResult<()> {
        let expected = inner.chain.last_height() + 1;
        if block.header.height != expected {
            return Err(InvariantError::HeightMismatch {
                expected,
                actual: block.header.height,
            }
            .into());
        }
        if block.header.prev_hash != inner.chain.last_hash() {
            return Err(InvariantError::PrevHashMismatch.into());
        }
        if inner.chain.has_hash(&block.hash()) {
            return Err(LedgerError::duplicate_block(&block.hash()));
        }
        if block.sub_blocks.len() > MAX_SUB_BLOCKS_PER_BLOCK {
            return Err(InvariantError::TooManySubBlocks {
                count: block.sub_blocks.len(),
                limit: MAX_SUB_BLOCKS_PER_BLOCK,
            }
            .into());
        }

        // PoW seal: recompute and compare against the target ceiling.
        let mut preimage = block.header.pow_preimage()?;
        preimage.extend_from_slice(&block.header.nonce.to_le_bytes());
        let pow = sha256(&preimage);
        if pow != block.header.pow_hash {
            return Err(InvariantError::PowHashMismatch.into());
        }
        if U256::from_big_endian(&pow) > difficulty {
            return Err(InvariantError::PowTargetNotMet.into());
        }

        // Referenced sub-block headers: self-endorsement signature always,
        // PoH recomputation whenever the body is still pending locally.
        for header in &block.sub_blocks {
            let hash = header.canonical_hash();
            let signed = shared_crypto::verify(
                SignatureAlgo::Bls,
                &header.validator_pubkey,
                &hash,
                &header.signature,
            )
            .unwrap_or(false);
            if !signed {
                return Err(InvariantError::SubBlockSignatureInvalid {
                    height: header.height,
                }
                .into());
            }
            if let Some(sub_block) = inner.pending.get_by_hash(&hash) {
                if sub_block.expected_poh() != header.poh_digest {
                    return Err(InvariantError::PohMismatch {
                        height: header.height,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    fn write_snapshot_locked(&self, inner: &mut LedgerInner) -> LedgerResult<()> {
        let data = SnapshotData {
            height: inner.chain.last_height(),
            last_hash: inner.chain.last_hash(),
            sub_block_height: inner.pending.last_height(),
            entries: inner.state.to_entries(),
            blocks: inner.chain.window_blocks(),
        };
        write_snapshot(&self.config.snapshot_path, &data)?;
        inner.wal.truncate()?;
        info!(height = data.height, "Snapshot written, WAL truncated");
        Ok(())
    }

    fn prune_locked(&self, inner: &mut LedgerInner) -> LedgerResult<()> {
        let head = inner.chain.last_height();
        if head < self.config.prune_interval {
            return Ok(());
        }
        let cutoff = head - self.config.prune_interval + 1;
        let pruned = inner.chain.take_below(cutoff);
        for block in &pruned {
            archive_block(&self.config.archive_path, block)?;
        }
        if !pruned.is_empty() {
            info!(count = pruned.len(), cutoff, "Archived pruned blocks");
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // SUB-BLOCKS & VOTES
    // -------------------------------------------------------------------------

    /// Append a sub-block to the pending buffer.
    ///
    /// The height must be strictly above the last appended sub-block and
    /// the PoH digest must match the body.
    pub fn append_sub_block(&self, sub_block: SubBlock) -> LedgerResult<()> {
        if sub_block.expected_poh() != sub_block.header.poh_digest {
            return Err(InvariantError::PohMismatch {
                height: sub_block.header.height,
            }
            .into());
        }
        self.write().pending.append(sub_block)
    }

    /// Height of the last appended sub-block.
    pub fn last_sub_block_height(&self) -> u64 {
        self.read().pending.last_height()
    }

    /// Pending sub-blocks, in insertion order.
    pub fn pending_sub_blocks(&self) -> Vec<SubBlock> {
        self.read().pending.iter().cloned().collect()
    }

    /// Pending sub-block by header hash.
    pub fn pending_sub_block(&self, hash: &Hash) -> Option<SubBlock> {
        self.read().pending.get_by_hash(hash).cloned()
    }

    /// Drop pending sub-blocks past the retention window; returns their
    /// header hashes.
    pub fn expire_sub_blocks(&self, now_ms: u64) -> Vec<Hash> {
        self.write()
            .pending
            .expire(now_ms, self.config.sub_block_retention_ms)
    }

    /// Record a PoS endorsement for a sub-block header.
    ///
    /// The key includes the validator pubkey, so a repeated vote from the
    /// same validator is idempotent.
    pub fn record_pos_vote(
        &self,
        header_hash: &Hash,
        validator_pubkey: &[u8],
        signature: &[u8],
    ) -> LedgerResult<()> {
        let key = keys::vote(header_hash, validator_pubkey);
        self.snapshot(|state| state.put(&key, signature))
    }

    /// Count of unique validators endorsing a header.
    pub fn vote_count(&self, header_hash: &Hash) -> usize {
        self.read()
            .state
            .prefix_iter(&keys::vote_prefix(header_hash))
            .count()
    }

    /// Register (or update) a validator record.
    pub fn register_validator(&self, validator: &Validator) -> LedgerResult<()> {
        let key = keys::validator(&validator.public_key);
        let bytes = canonical_encode(validator)?;
        self.snapshot(move |state| state.put(&key, &bytes))
    }

    /// Whether this pubkey belongs to an active validator.
    pub fn is_active_validator(&self, pubkey: &[u8]) -> bool {
        self.read()
            .state
            .get(&keys::validator(pubkey))
            .and_then(|bytes| canonical_decode::<Validator>(&bytes).ok())
            .map(|v| v.active)
            .unwrap_or(false)
    }

    /// Number of active validators.
    pub fn active_validator_count(&self) -> usize {
        self.read()
            .state
            .prefix_iter(keys::VALIDATOR_PREFIX)
            .filter_map(|(_, bytes)| canonical_decode::<Validator>(&bytes).ok())
            .filter(|v| v.active)
            .count()
    }

    // -------------------------------------------------------------------------
    // POOL
    // -------------------------------------------------------------------------

    /// Admit a transaction to the pool.
    pub fn add_to_pool(&self, tx: Transaction) -> LedgerResult<()> {
        let mut inner = self.write();
        let current_nonce = inner.state.account_nonce(&tx.from);
        inner.pool.add(tx, current_nonce)?;
        Ok(())
    }

    /// Read up to `max` pooled transactions without removing them.
    pub fn list_pool(&self, max: usize) -> Vec<Transaction> {
        self.read().pool.list(max)
    }

    /// Remove and return up to `max` pooled transactions.
    pub fn pick(&self, max: usize) -> Vec<Transaction> {
        self.write().pool.pick(max)
    }

    /// Number of pooled transactions.
    pub fn pool_len(&self) -> usize {
        self.read().pool.len()
    }

    // -------------------------------------------------------------------------
    // STATE
    // -------------------------------------------------------------------------

    /// Run `f` in an isolated state frame; commit its writes (through the
    /// WAL) on `Ok`, discard everything on `Err`. Scheduled selfdestructs
    /// are executed at commit. Nested snapshots collapse into this one.
    pub fn snapshot<T>(
        &self,
        f: impl FnOnce(&mut dyn StateRW) -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        let mut inner = self.write();
        let frame = {
            let mut frame = SnapshotFrame::new(&inner.state);
            match f(&mut frame) {
                Ok(value) => (value, frame.into_writes()),
                Err(e) => return Err(e),
            }
        };
        let (value, writes) = frame;
        apply_writes_durable(&mut inner, writes)?;
        Ok(value)
    }

    /// Read-only access to the live state.
    pub fn with_state<R>(&self, f: impl FnOnce(&dyn StateRW) -> R) -> R {
        f(&self.read().state)
    }

    /// All state pairs under `prefix`, in key order.
    pub fn prefix_iterator(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.read().state.prefix_iter(prefix).collect()
    }

    /// Balance of `address` in `token`.
    pub fn token_balance(&self, token: TokenId, address: &Address) -> u128 {
        self.with_state(|state| state.token_balance(token, address))
    }

    /// Mint through the transactional path.
    pub fn mint(&self, token: TokenId, to: &Address, amount: u128) -> LedgerResult<()> {
        self.snapshot(|state| state.token_mint(token, to, amount))
    }

    /// Burn through the transactional path.
    pub fn burn(&self, token: TokenId, from: &Address, amount: u128) -> LedgerResult<()> {
        self.snapshot(|state| state.token_burn(token, from, amount))
    }

    /// Transfer through the transactional path.
    pub fn transfer(
        &self,
        token: TokenId,
        from: &Address,
        to: &Address,
        amount: u128,
    ) -> LedgerResult<()> {
        self.snapshot(|state| state.token_transfer(token, from, to, amount))
    }

    /// Append an event record to the pending block's log list.
    pub fn emit_log(&self, log: &Log) -> LedgerResult<()> {
        self.snapshot(|state| state.emit_log(log))
    }

    /// Invoke contract code through the registered dispatcher. `Static`
    /// calls discard their writes; other kinds commit on success.
    pub fn call(
        &self,
        kind: CallKind,
        target: Address,
        input: &[u8],
        gas: u64,
    ) -> LedgerResult<Vec<u8>> {
        let dispatcher = self
            .call_dispatcher
            .read()
            .expect("call dispatcher lock poisoned")
            .clone()
            .ok_or_else(|| LedgerError::InvalidState("no call dispatcher registered".into()))?;

        let mut inner = self.write();
        let (output, writes) = {
            let mut frame = SnapshotFrame::new(&inner.state);
            let output = dispatcher.dispatch(kind, &mut frame, target, input, gas)?;
            (output, frame.into_writes())
        };
        if kind != CallKind::Static {
            apply_writes_durable(&mut inner, writes)?;
        }
        Ok(output)
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, LedgerInner> {
        self.inner.read().expect("ledger lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, LedgerInner> {
        self.inner.write().expect("ledger lock poisoned")
    }
}

/// Apply committed frame writes: WAL first, then memory, then any
/// selfdestructs the frame scheduled.
fn apply_writes_durable(
    inner: &mut LedgerInner,
    writes: Vec<(Vec<u8>, Option<Vec<u8>>)>,
) -> LedgerResult<()> {
    // Stage every record durably before mutating memory.
    for (key, write) in &writes {
        let record = match write {
            Some(value) => WalRecord::Put {
                key: key.clone(),
                value: value.clone(),
            },
            None => WalRecord::Delete { key: key.clone() },
        };
        inner.wal.append(&record)?;
    }
    for (key, write) in writes {
        match write {
            Some(value) => inner.state.put(&key, &value)?,
            None => inner.state.delete(&key)?,
        }
    }
    execute_scheduled_selfdestructs(inner)
}

/// Delete every contract with a destroy marker, marker included.
fn execute_scheduled_selfdestructs(inner: &mut LedgerInner) -> LedgerResult<()> {
    let marked: Vec<Vec<u8>> = inner
        .state
        .prefix_iter(keys::CONTRACT_DESTROY_PREFIX)
        .map(|(key, _)| key)
        .collect();
    for marker in marked {
        let hex_addr = &marker[keys::CONTRACT_DESTROY_PREFIX.len()..];
        let Ok(bytes) = hex::decode(hex_addr) else {
            continue;
        };
        let Ok(raw) = TryInto::<[u8; 20]>::try_into(bytes) else {
            continue;
        };
        let address = Address(raw);
        for key in [
            keys::contract_code(&address),
            keys::contract_meta(&address),
            keys::contract_owner(&address),
            keys::contract_paused(&address),
            marker.clone(),
        ] {
            inner.wal.append(&WalRecord::Delete { key: key.clone() })?;
            inner.state.delete(&key)?;
        }
        debug!(%address, "Executed scheduled selfdestruct");
    }
    Ok(())
}

/// Drain pending logs into per-block state keys, through the WAL.
fn drain_logs_durable(inner: &mut LedgerInner, height: u64) -> LedgerResult<Vec<Log>> {
    let logs = {
        let mut frame = SnapshotFrame::new(&inner.state);
        let logs = drain_pending_logs(&mut frame)?;
        let mut stamped = Vec::with_capacity(logs.len());
        for (seq, mut log) in logs.into_iter().enumerate() {
            log.block_height = height;
            let key = format!("logs:block:{height:012}:{seq:08}").into_bytes();
            frame.put(&key, &canonical_encode(&log)?)?;
            stamped.push(log);
        }
        (stamped, frame.into_writes())
    };
    let (stamped, writes) = logs;
    apply_writes_durable(inner, writes)?;
    Ok(stamped)
}
