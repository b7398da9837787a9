//! # Core Domain Entities
//!
//! The chain-level entities shared across subsystems.
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `Hash`, `TokenId`, role key aliases
//! - **Chain**: `SubBlockHeader`, `SubBlock`, `BlockHeader`, `Block`
//! - **Consensus**: `Validator`

use crate::codec::{canonical_encode, canonical_hash, sha256};
use crate::errors::CodecError;
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// A 32-byte digest (double SHA-256 for identities).
pub type Hash = [u8; 32];

/// A 48-byte compressed BLS12-381 public key (validator role key).
pub type BlsPublicKeyBytes = [u8; 48];

/// A 96-byte BLS12-381 signature.
pub type BlsSignatureBytes = [u8; 96];

/// Maximum transactions a sub-block body may carry.
pub const MAX_TXS_PER_SUB_BLOCK: usize = 5_000;

/// Maximum endorsed sub-block headers a main block may reference.
pub const MAX_SUB_BLOCKS_PER_BLOCK: usize = 1_000;

// =============================================================================
// IDENTITY
// =============================================================================

/// A 20-byte account identifier.
///
/// Derived from the last 20 bytes of SHA-256 over the compressed wallet
/// public key.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address. Never a valid treasury or recipient.
    pub const ZERO: Address = Address([0u8; 20]);

    /// Derive an address from a compressed public key.
    pub fn from_public_key(pubkey: &[u8]) -> Self {
        let digest = sha256(pubkey);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest[12..]);
        Address(bytes)
    }

    /// Raw bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// True for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address(bytes)
    }
}

/// A 32-bit token identifier: `0xNNSSSSII`.
///
/// The top byte is the namespace marker, the next 16 bits the token
/// standard code, the low byte the instance ordinal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TokenId(pub u32);

impl TokenId {
    /// Namespace marker for Synnergy-native tokens (`'S'`).
    pub const NAMESPACE: u8 = 0x53;

    /// The governance-eligibility marker token (SYN-ID).
    pub const SYN_ID: TokenId = TokenId::new(0x0001, 0);

    /// The base currency token (SYN).
    pub const SYN: TokenId = TokenId::new(0x0000, 0);

    /// Build a token id from a standard code and instance ordinal.
    pub const fn new(standard: u16, instance: u8) -> Self {
        TokenId(((Self::NAMESPACE as u32) << 24) | ((standard as u32) << 8) | instance as u32)
    }

    /// The namespace marker byte.
    pub const fn namespace(&self) -> u8 {
        (self.0 >> 24) as u8
    }

    /// The 16-bit token standard code.
    pub const fn standard(&self) -> u16 {
        ((self.0 >> 8) & 0xFFFF) as u16
    }

    /// The instance ordinal.
    pub const fn instance(&self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SYN-{:04x}/{:02x}", self.standard(), self.instance())
    }
}

/// Signature algorithm selector for `sign`/`verify` dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignatureAlgo {
    /// secp256k1 ECDSA — wallet and transaction signing.
    Secp256k1,
    /// BLS12-381 — validator endorsements, aggregatable.
    Bls,
    /// Dilithium3 — post-quantum, long-term key operations.
    Dilithium,
}

// =============================================================================
// CHAIN
// =============================================================================

/// Header of a short-interval PoH sub-block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBlockHeader {
    /// Sub-block height, strictly increasing per proposer chain.
    pub height: u64,
    /// Proposal time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// BLS role key of the proposing validator.
    #[serde_as(as = "Bytes")]
    pub validator_pubkey: BlsPublicKeyBytes,
    /// PoH witness: `SHA256(tx_bytes… || timestamp_ms_le)`.
    pub poh_digest: Hash,
    /// BLS self-endorsement over the header's canonical hash.
    #[serde_as(as = "Bytes")]
    pub signature: BlsSignatureBytes,
}

impl SubBlockHeader {
    /// Canonical identity: double-SHA-256 of the encoded header with the
    /// signature zeroed (the signature covers this hash).
    pub fn canonical_hash(&self) -> Hash {
        let mut unsigned = self.clone();
        unsigned.signature = [0u8; 96];
        canonical_hash(&unsigned).expect("header encoding is infallible")
    }
}

/// A sub-block: header plus the ordered raw transactions it batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubBlock {
    /// The signed header.
    pub header: SubBlockHeader,
    /// Ordered transaction byte-strings.
    pub transactions: Vec<Vec<u8>>,
}

impl SubBlock {
    /// Recompute the PoH digest over this body and the header timestamp.
    pub fn expected_poh(&self) -> Hash {
        poh_digest(&self.transactions, self.header.timestamp_ms)
    }
}

/// Compute the PoH digest: `SHA256(concat(tx_bytes…) || timestamp_ms_le)`.
pub fn poh_digest(transactions: &[Vec<u8>], timestamp_ms: u64) -> Hash {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    for tx in transactions {
        hasher.update(tx);
    }
    hasher.update(timestamp_ms.to_le_bytes());
    hasher.finalize().into()
}

/// Header of a PoW-sealed main block.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    /// Block height; parent height + 1.
    pub height: u64,
    /// Seal time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Canonical hash of the parent block.
    pub prev_hash: Hash,
    /// `SHA256(serialize(header_without_seal) || nonce_le)`; must be at
    /// or below the difficulty target interpreted as a big-endian integer.
    pub pow_hash: Hash,
    /// The winning PoW nonce.
    pub nonce: u64,
    /// Declared PoW role key of the miner.
    #[serde_as(as = "Bytes")]
    pub miner_pubkey: BlsPublicKeyBytes,
}

impl BlockHeader {
    /// Canonical identity: double-SHA-256 of the full encoded header.
    pub fn canonical_hash(&self) -> Hash {
        canonical_hash(self).expect("header encoding is infallible")
    }

    /// The byte string the PoW nonce search runs over: the encoded header
    /// with `pow_hash` and `nonce` zeroed.
    ///
    /// # Errors
    ///
    /// Returns `CodecError::Encode` if the header cannot be serialized.
    pub fn pow_preimage(&self) -> Result<Vec<u8>, CodecError> {
        let mut unsealed = self.clone();
        unsealed.pow_hash = [0u8; 32];
        unsealed.nonce = 0;
        canonical_encode(&unsealed)
    }

    /// True for the genesis header. Genesis carries no meaningful parent;
    /// its `prev_hash` may encode a network tag.
    pub fn is_genesis(&self) -> bool {
        self.height == 0
    }
}

/// A sealed main block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// The sealed header.
    pub header: BlockHeader,
    /// Endorsed sub-block headers, in insertion order.
    pub sub_blocks: Vec<SubBlockHeader>,
    /// Transactions carried directly by the block.
    pub transactions: Vec<crate::transaction::Transaction>,
}

impl Block {
    /// Canonical identity of the block (its header hash).
    pub fn hash(&self) -> Hash {
        self.header.canonical_hash()
    }
}

// =============================================================================
// CONSENSUS
// =============================================================================

/// An authority in the PoS endorsement set.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Validator {
    /// BLS role key (identity).
    #[serde_as(as = "Bytes")]
    pub public_key: BlsPublicKeyBytes,
    /// Stake weight.
    pub stake: u64,
    /// Whether this validator currently endorses.
    pub active: bool,
}
