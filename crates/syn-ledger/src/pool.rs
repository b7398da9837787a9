//! # Transaction Pool
//!
//! FIFO pool with hash-indexed dedup. Admission validates the wallet
//! signature, the sender binding, nonce freshness, gas price and encoded
//! size; transactions are owned by the pool until picked, and picking
//! removes them.

use crate::errors::PoolError;
use shared_types::{Address, Hash, SignatureAlgo, Transaction};
use std::collections::{HashMap, VecDeque};

/// Pool capacity and admission limits.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum transactions held.
    pub capacity: usize,
    /// Maximum encoded transaction size in bytes.
    pub max_tx_bytes: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: 65_536,
            max_tx_bytes: 128 * 1024,
        }
    }
}

/// FIFO transaction pool.
#[derive(Debug, Default)]
pub struct TransactionPool {
    config: PoolConfig,
    /// Insertion-ordered queue; the proposer drains from the front.
    queue: VecDeque<Transaction>,
    /// Hash index for O(1) duplicate detection.
    by_hash: HashMap<Hash, ()>,
}

impl TransactionPool {
    /// Create a pool with the given limits.
    pub fn new(config: PoolConfig) -> Self {
        Self {
            config,
            queue: VecDeque::new(),
            by_hash: HashMap::new(),
        }
    }

    /// Number of pooled transactions.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// True when nothing is pooled.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Whether a transaction with this hash is pooled.
    pub fn contains(&self, hash: &Hash) -> bool {
        self.by_hash.contains_key(hash)
    }

    /// Admit a transaction.
    ///
    /// `current_nonce` is the sender's account nonce at admission time.
    ///
    /// # Errors
    ///
    /// - `DuplicateTransaction` if the hash is already pooled
    /// - `NonPositiveGasPrice` / `Oversized` on limit violations
    /// - `StaleNonce` when the nonce is not in the future
    /// - `SenderMismatch` / `InvalidSignature` on authentication failures
    /// - `PoolFull` at capacity
    pub fn add(&mut self, mut tx: Transaction, current_nonce: u64) -> Result<(), PoolError> {
        tx.ensure_hash();

        if self.by_hash.contains_key(&tx.hash) {
            return Err(PoolError::DuplicateTransaction(tx.id_hex()));
        }
        if tx.gas_price == 0 {
            return Err(PoolError::NonPositiveGasPrice);
        }
        let size = tx.encoded_len();
        if size > self.config.max_tx_bytes {
            return Err(PoolError::Oversized {
                size,
                limit: self.config.max_tx_bytes,
            });
        }
        if tx.nonce <= current_nonce {
            return Err(PoolError::StaleNonce {
                got: tx.nonce,
                current: current_nonce,
            });
        }
        if Address::from_public_key(&tx.sender_pubkey) != tx.from {
            return Err(PoolError::SenderMismatch);
        }
        let valid = shared_crypto::verify(
            SignatureAlgo::Secp256k1,
            &tx.sender_pubkey,
            &tx.signing_bytes(),
            &tx.signature,
        )
        .unwrap_or(false);
        if !valid {
            return Err(PoolError::InvalidSignature);
        }
        if self.queue.len() >= self.config.capacity {
            return Err(PoolError::PoolFull {
                capacity: self.config.capacity,
            });
        }

        self.by_hash.insert(tx.hash, ());
        self.queue.push_back(tx);
        Ok(())
    }

    /// Read up to `max` transactions in insertion order without removing
    /// them.
    pub fn list(&self, max: usize) -> Vec<Transaction> {
        self.queue.iter().take(max).cloned().collect()
    }

    /// Remove and return up to `max` transactions in insertion order.
    pub fn pick(&mut self, max: usize) -> Vec<Transaction> {
        let count = max.min(self.queue.len());
        let picked: Vec<Transaction> = self.queue.drain(..count).collect();
        for tx in &picked {
            self.by_hash.remove(&tx.hash);
        }
        picked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_crypto::Secp256k1KeyPair;

    fn signed_tx(keypair: &Secp256k1KeyPair, nonce: u64) -> Transaction {
        let mut tx = Transaction::transfer(keypair.address(), Address([9u8; 20]), 10, nonce);
        tx.sender_pubkey = keypair.public_key().as_bytes().to_vec();
        tx.signature = *keypair.sign(&tx.signing_bytes()).as_bytes();
        tx.ensure_hash();
        tx
    }

    fn pool() -> TransactionPool {
        TransactionPool::new(PoolConfig::default())
    }

    #[test]
    fn test_admit_and_pick_in_order() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = pool();

        pool.add(signed_tx(&keypair, 1), 0).unwrap();
        pool.add(signed_tx(&keypair, 2), 0).unwrap();
        assert_eq!(pool.len(), 2);

        let listed = pool.list(10);
        assert_eq!(listed.len(), 2);
        assert_eq!(pool.len(), 2, "list is read-only");

        let picked = pool.pick(1);
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].nonce, 1);
        assert_eq!(pool.len(), 1, "pick is destructive");
        assert!(!pool.contains(&picked[0].hash));
    }

    #[test]
    fn test_duplicate_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = pool();
        let tx = signed_tx(&keypair, 1);

        pool.add(tx.clone(), 0).unwrap();
        let err = pool.add(tx, 0).unwrap_err();
        assert!(matches!(err, PoolError::DuplicateTransaction(_)));
    }

    #[test]
    fn test_stale_nonce_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = pool();
        let err = pool.add(signed_tx(&keypair, 3), 3).unwrap_err();
        assert_eq!(err, PoolError::StaleNonce { got: 3, current: 3 });
    }

    #[test]
    fn test_zero_gas_price_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = pool();
        let mut tx = signed_tx(&keypair, 1);
        tx.gas_price = 0;
        assert_eq!(pool.add(tx, 0).unwrap_err(), PoolError::NonPositiveGasPrice);
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = pool();
        let mut tx = signed_tx(&keypair, 1);
        tx.value += 1; // signature no longer covers the contents
        tx.hash = [0u8; 32];
        let err = pool.add(tx, 0).unwrap_err();
        assert_eq!(err, PoolError::InvalidSignature);
    }

    #[test]
    fn test_sender_mismatch_rejected() {
        let keypair = Secp256k1KeyPair::generate();
        let other = Secp256k1KeyPair::generate();
        let mut pool = pool();
        let mut tx = signed_tx(&keypair, 1);
        tx.sender_pubkey = other.public_key().as_bytes().to_vec();
        tx.hash = [0u8; 32];
        let err = pool.add(tx, 0).unwrap_err();
        assert_eq!(err, PoolError::SenderMismatch);
    }

    #[test]
    fn test_capacity_enforced() {
        let keypair = Secp256k1KeyPair::generate();
        let mut pool = TransactionPool::new(PoolConfig {
            capacity: 1,
            ..Default::default()
        });
        pool.add(signed_tx(&keypair, 1), 0).unwrap();
        let err = pool.add(signed_tx(&keypair, 2), 0).unwrap_err();
        assert_eq!(err, PoolError::PoolFull { capacity: 1 });
    }
}
