//! Replication service.
//!
//! Gossip propagation (inventory → get-data → block), per-hash await for
//! missing blocks, and batched range sync for catch-up. Block imports are
//! funneled through one import lane so the ledger sees them serialised;
//! inventory handling stays concurrent.

use crate::errors::{ReplicationError, ReplicationResult};
use crate::messages::{Message, TOPIC};
use crate::peer::{Envelope, PeerId, PeerManager};
use shared_types::{canonical_decode, canonical_encode, Block, Hash, Shutdown};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use syn_ledger::Ledger;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Maximum blocks served for one GetRange request.
const MAX_RANGE_BATCH: u64 = 1_024;

/// Replication tunables.
#[derive(Debug, Clone)]
pub struct ReplicationConfig {
    /// Deadline for a per-hash block request.
    pub request_timeout: Duration,
    /// Heights requested per sync batch.
    pub sync_batch: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            sync_batch: 128,
        }
    }
}

/// Gossip-based block replication over a peer-manager capability.
pub struct Replication {
    peers: Arc<dyn PeerManager>,
    ledger: Arc<Ledger>,
    config: ReplicationConfig,
    /// Waiters for a specific block hash; first arrival wins.
    pending_blocks: Mutex<HashMap<Hash, Vec<oneshot::Sender<Block>>>>,
    /// Waiter for the in-flight range request (one sync loop per node).
    pending_range: Mutex<Option<oneshot::Sender<Vec<Vec<u8>>>>>,
    /// Hashes already announced; dampens republish loops.
    seen: Mutex<HashSet<Hash>>,
    started: AtomicBool,
}

impl Replication {
    /// Build the service over a peer manager and the node's ledger.
    pub fn new(
        peers: Arc<dyn PeerManager>,
        ledger: Arc<Ledger>,
        config: ReplicationConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            peers,
            ledger,
            config,
            pending_blocks: Mutex::new(HashMap::new()),
            pending_range: Mutex::new(None),
            seen: Mutex::new(HashSet::new()),
            started: AtomicBool::new(false),
        })
    }

    /// Gossip fanout: ⌈√N⌉ over the current peer count.
    pub fn fanout(&self) -> usize {
        (self.peers.peers().len() as f64).sqrt().ceil() as usize
    }

    /// Start the reader loop and the serialised import lane. Idempotent;
    /// returns immediately. Loops exit on `shutdown`.
    pub fn start(self: Arc<Self>, shutdown: Shutdown) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        let (import_tx, import_rx) = mpsc::channel::<Block>(256);

        let importer = Arc::clone(&self);
        let mut importer_shutdown = shutdown.clone();
        tokio::spawn(async move {
            importer.import_loop(import_rx, &mut importer_shutdown).await;
        });

        // Subscribe before returning so peers can address us immediately.
        let stream = self.peers.subscribe(TOPIC);
        let reader = Arc::clone(&self);
        let mut reader_shutdown = shutdown;
        tokio::spawn(async move {
            reader.reader_loop(stream, import_tx, &mut reader_shutdown).await;
        });
        info!("Replication started");
    }

    async fn reader_loop(
        self: Arc<Self>,
        mut stream: crate::peer::MessageStream,
        import_tx: mpsc::Sender<Block>,
        shutdown: &mut Shutdown,
    ) {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                envelope = stream.recv() => {
                    let Some(envelope) = envelope else { break };
                    Self::handle(&self, envelope, &import_tx).await;
                }
            }
        }
        self.peers.unsubscribe(TOPIC);
        debug!("Replication reader stopped");
    }

    /// Serialised import lane: one block at a time reaches the ledger.
    async fn import_loop(
        self: Arc<Self>,
        mut import_rx: mpsc::Receiver<Block>,
        shutdown: &mut Shutdown,
    ) {
        loop {
            let block = tokio::select! {
                _ = shutdown.cancelled() => break,
                block = import_rx.recv() => {
                    let Some(block) = block else { break };
                    block
                }
            };
            let hash = block.hash();
            if self.ledger.has_block(&hash) {
                continue;
            }
            match self.ledger.add_block(block) {
                Ok(()) => {
                    // Republish once per hash to keep the gossip flowing
                    // without loops.
                    let fresh = self.seen.lock().expect("seen lock poisoned").insert(hash);
                    if fresh {
                        if let Err(e) = self.announce(&hash).await {
                            debug!(error = %e, "Republish failed");
                        }
                    }
                }
                Err(e) => warn!(error = %e, "Import failed; block skipped"),
            }
        }
        debug!("Replication importer stopped");
    }

    async fn handle(this: &Arc<Self>, envelope: Envelope, import_tx: &mpsc::Sender<Block>) {
        let mut wire = Vec::with_capacity(1 + envelope.payload.len());
        wire.push(envelope.code);
        wire.extend_from_slice(&envelope.payload);

        let message = match Message::decode(&wire) {
            Ok(message) => message,
            Err(e) => {
                debug!(from = %envelope.from, error = %e, "Dropped undecodable message");
                return;
            }
        };

        match message {
            Message::Inventory { hashes } => {
                for hash in hashes {
                    if this.ledger.has_block(&hash) {
                        continue;
                    }
                    let fetcher = Arc::clone(this);
                    let lane = import_tx.clone();
                    tokio::spawn(async move {
                        match fetcher.request_missing(&hash).await {
                            Ok(block) => {
                                let _ = lane.send(block).await;
                            }
                            Err(e) => debug!(error = %e, "Missing-block fetch failed"),
                        }
                    });
                }
            }
            Message::GetData { hashes } => {
                for hash in hashes {
                    if let Some(block) = this.ledger.block_by_hash(&hash) {
                        if let Err(e) = this.send_block(&envelope.from, &block).await {
                            debug!(error = %e, "Block reply failed");
                        }
                    }
                }
            }
            Message::Block { block } => match canonical_decode::<Block>(&block) {
                Ok(block) => {
                    this.resolve_waiters(&block);
                    let _ = import_tx.send(block).await;
                }
                Err(e) => debug!(from = %envelope.from, error = %e, "Dropped undecodable block"),
            },
            Message::GetRange { start, end } => {
                let blocks = this.collect_range(start, end);
                let reply = Message::RangeBlocks { blocks };
                if let Err(e) = this.send(&envelope.from, &reply).await {
                    debug!(error = %e, "Range reply failed");
                }
            }
            Message::RangeBlocks { blocks } => {
                if let Some(waiter) = this
                    .pending_range
                    .lock()
                    .expect("range lock poisoned")
                    .take()
                {
                    let _ = waiter.send(blocks);
                }
            }
        }
    }

    fn resolve_waiters(&self, block: &Block) {
        let waiters = self
            .pending_blocks
            .lock()
            .expect("pending lock poisoned")
            .remove(&block.hash());
        if let Some(waiters) = waiters {
            for waiter in waiters {
                let _ = waiter.send(block.clone());
            }
        }
    }

    fn collect_range(&self, start: u64, end: u64) -> Vec<Vec<u8>> {
        let mut blocks = Vec::new();
        if end < start {
            return blocks;
        }
        let capped_end = end.min(start.saturating_add(MAX_RANGE_BATCH - 1));
        for height in start..=capped_end {
            match self.ledger.block_by_height(height) {
                Ok(Some(block)) => match canonical_encode(&block) {
                    Ok(bytes) => blocks.push(bytes),
                    Err(_) => break,
                },
                // Stop at the first missing height.
                _ => break,
            }
        }
        blocks
    }

    async fn send(&self, peer: &PeerId, message: &Message) -> ReplicationResult<()> {
        let wire = message.encode()?;
        self.peers
            .send_async(peer, TOPIC, wire[0], wire[1..].to_vec())
            .await
    }

    async fn send_block(&self, peer: &PeerId, block: &Block) -> ReplicationResult<()> {
        let bytes =
            canonical_encode(block).map_err(|e| ReplicationError::Decode(e.to_string()))?;
        self.send(peer, &Message::Block { block: bytes }).await
    }

    async fn announce(&self, hash: &Hash) -> ReplicationResult<()> {
        let message = Message::Inventory {
            hashes: vec![*hash],
        };
        for peer in self.peers.sample(self.fanout()) {
            self.send(&peer, &message).await?;
        }
        Ok(())
    }

    /// Announce a freshly sealed block to `⌈√N⌉` sampled peers.
    pub async fn replicate_block(&self, block: &Block) -> ReplicationResult<()> {
        let hash = block.hash();
        self.seen.lock().expect("seen lock poisoned").insert(hash);
        self.announce(&hash).await
    }

    /// Fetch one block by hash: GetData to `fanout + 1` peers
    /// concurrently; the first Block arrival wins.
    ///
    /// # Errors
    ///
    /// - `NoPeers` when nobody can be asked
    /// - `DeadlineExceeded` after `request_timeout`
    pub async fn request_missing(&self, hash: &Hash) -> ReplicationResult<Block> {
        let targets = self.peers.sample(self.fanout() + 1);
        if targets.is_empty() {
            return Err(ReplicationError::NoPeers);
        }

        let (sender, receiver) = oneshot::channel();
        self.pending_blocks
            .lock()
            .expect("pending lock poisoned")
            .entry(*hash)
            .or_default()
            .push(sender);

        let message = Message::GetData {
            hashes: vec![*hash],
        };
        let sends = targets.iter().map(|peer| self.send(peer, &message));
        for result in futures::future::join_all(sends).await {
            if let Err(e) = result {
                debug!(error = %e, "GetData send failed");
            }
        }

        match timeout(self.config.request_timeout, receiver).await {
            Ok(Ok(block)) => Ok(block),
            Ok(Err(_)) => Err(ReplicationError::ChannelClosed),
            Err(_) => {
                // Clean our dead waiter out.
                self.pending_blocks
                    .lock()
                    .expect("pending lock poisoned")
                    .remove(hash);
                Err(ReplicationError::DeadlineExceeded(hex::encode(hash)))
            }
        }
    }

    /// Range sync for catch-up: one chosen peer, batched GetRange from
    /// `last_height + 1`, imports in order, stops on an empty response or
    /// cancellation. Returns the final chain height.
    pub async fn synchronize(&self, shutdown: &mut Shutdown) -> ReplicationResult<u64> {
        let peer = self
            .peers
            .sample(1)
            .into_iter()
            .next()
            .ok_or(ReplicationError::NoPeers)?;
        info!(%peer, "Range sync started");

        loop {
            if shutdown.is_cancelled() {
                break;
            }
            let start = self.ledger.last_height() + 1;
            let end = start + self.config.sync_batch - 1;

            let (sender, receiver) = oneshot::channel();
            *self.pending_range.lock().expect("range lock poisoned") = Some(sender);
            self.send(&peer, &Message::GetRange { start, end }).await?;

            let blocks = tokio::select! {
                _ = shutdown.cancelled() => break,
                result = timeout(self.config.request_timeout, receiver) => match result {
                    Ok(Ok(blocks)) => blocks,
                    Ok(Err(_)) => return Err(ReplicationError::ChannelClosed),
                    Err(_) => {
                        self.pending_range.lock().expect("range lock poisoned").take();
                        return Err(ReplicationError::DeadlineExceeded(format!(
                            "range [{start}, {end}]"
                        )));
                    }
                },
            };

            if blocks.is_empty() {
                break;
            }
            for bytes in blocks {
                match canonical_decode::<Block>(&bytes) {
                    Ok(block) => {
                        if let Err(e) = self.ledger.add_block(block) {
                            warn!(error = %e, "Sync import failed; block skipped");
                        }
                    }
                    Err(e) => debug!(error = %e, "Dropped undecodable sync block"),
                }
            }
        }

        let height = self.ledger.last_height();
        info!(height, "Range sync finished");
        Ok(height)
    }
}
