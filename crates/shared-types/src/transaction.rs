//! Transaction, UTXO, log and contract entities.

use crate::codec::{canonical_encode, sha256};
use crate::entities::{Address, Hash, SignatureAlgo, TokenId};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};

/// Transaction category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxType {
    /// Plain value transfer.
    Transfer,
    /// Contract deployment.
    Deploy,
    /// Contract invocation.
    Invoke,
    /// Token mint/burn/transfer batch.
    Token,
    /// Reversal of a previously included transaction.
    Reversal,
}

/// Optional transaction payload, possibly AEAD-encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxPayload {
    /// True when `data` is an AEAD blob (nonce || ciphertext || tag).
    pub encrypted: bool,
    /// Raw or encrypted payload bytes.
    pub data: Vec<u8>,
}

/// An additional authorisation signature (multi-sig flows).
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSignature {
    /// Address of the co-signer.
    pub signer: Address,
    /// Algorithm the signature was produced under.
    pub algo: SignatureAlgo,
    /// Signature bytes (size fixed per algorithm).
    pub signature: Vec<u8>,
}

/// Reference to an unspent output: `(tx_hash, output_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UtxoRef {
    /// Hash of the transaction that created the output.
    pub tx_hash: Hash,
    /// Index of the output within that transaction.
    pub output_index: u32,
}

/// A spend of an existing UTXO.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoInput {
    /// The output being consumed.
    pub outpoint: UtxoRef,
    /// Unlocking signature over the spending transaction hash.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
    /// Compressed public key whose hash matches the output's lock.
    pub pubkey: Vec<u8>,
}

/// A newly created output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoOutput {
    /// Recipient address.
    pub recipient: Address,
    /// Amount in base units.
    pub amount: u128,
    /// 20-byte hash of the public key allowed to spend this output.
    pub pubkey_hash: [u8; 20],
}

/// A live unspent output in the UTXO set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    /// Its key in the set.
    pub outpoint: UtxoRef,
    /// The output payload.
    pub output: UtxoOutput,
    /// Height of the block that created it.
    pub created_at_height: u64,
}

/// A direct key/value state mutation carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateChange {
    /// Namespaced state key.
    pub key: Vec<u8>,
    /// New value; `None` deletes the key.
    pub value: Option<Vec<u8>>,
}

/// A token movement carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransfer {
    /// Token being moved.
    pub token: TokenId,
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Amount in the token's base units.
    pub amount: u128,
}

/// An event record emitted during execution; ordered per block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    /// Emitting contract or account.
    pub address: Address,
    /// Indexed topics.
    pub topics: Vec<Hash>,
    /// Opaque event data.
    pub data: Vec<u8>,
    /// Height of the block the log belongs to.
    pub block_height: u64,
    /// Hash of the emitting transaction.
    pub tx_hash: Hash,
}

/// A deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contract {
    /// Contract address (stable across upgrades).
    pub address: Address,
    /// Hash of the deploying transaction.
    pub deploy_tx_hash: Hash,
    /// Height of the deploying block.
    pub deploy_block_height: u64,
    /// Executable bytecode (sequence of 3-byte opcodes).
    pub bytecode: Vec<u8>,
    /// ABI document.
    pub abi: Vec<u8>,
    /// Free-form metadata (JSON).
    pub metadata: Vec<u8>,
}

/// A Synnergy transaction.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Category.
    pub tx_type: TxType,
    /// Sender address.
    pub from: Address,
    /// Compressed public key of the sender; must hash to `from`.
    pub sender_pubkey: Vec<u8>,
    /// Recipient address (contract address for `Invoke`).
    pub to: Address,
    /// Value in base units.
    pub value: u128,
    /// Gas ceiling for execution.
    pub gas_limit: u64,
    /// Price per gas unit.
    pub gas_price: u64,
    /// Sender nonce; consumed exactly once on successful inclusion.
    pub nonce: u64,
    /// Creation time in milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Optional payload.
    pub payload: Option<TxPayload>,
    /// Additional authorisation signatures.
    pub auth_signatures: Vec<AuthSignature>,
    /// Hash of the transaction being reversed (`Reversal` only).
    pub original_tx: Option<Hash>,
    /// Wallet signature over the signing hash.
    #[serde_as(as = "Bytes")]
    pub signature: [u8; 64],
    /// Cached identity; all-zero until computed.
    pub hash: Hash,
    /// UTXO spends.
    pub utxo_inputs: Vec<UtxoInput>,
    /// UTXO creations.
    pub utxo_outputs: Vec<UtxoOutput>,
    /// Direct state mutations.
    pub state_changes: Vec<StateChange>,
    /// Referenced contract, if any.
    pub contract: Option<Address>,
    /// Token movements.
    pub token_transfers: Vec<TokenTransfer>,
}

impl Transaction {
    /// A minimal unsigned transfer, for building up in tests and pools.
    pub fn transfer(from: Address, to: Address, value: u128, nonce: u64) -> Self {
        Transaction {
            tx_type: TxType::Transfer,
            from,
            sender_pubkey: Vec::new(),
            to,
            value,
            gas_limit: 21_000,
            gas_price: 1,
            nonce,
            timestamp_ms: 0,
            payload: None,
            auth_signatures: Vec::new(),
            original_tx: None,
            signature: [0u8; 64],
            hash: [0u8; 32],
            utxo_inputs: Vec::new(),
            utxo_outputs: Vec::new(),
            state_changes: Vec::new(),
            contract: None,
            token_transfers: Vec::new(),
        }
    }

    /// The bytes the wallet signs: the canonical encoding with `signature`
    /// and `hash` zeroed.
    pub fn signing_bytes(&self) -> Vec<u8> {
        let mut unsigned = self.clone();
        unsigned.signature = [0u8; 64];
        unsigned.hash = [0u8; 32];
        canonical_encode(&unsigned).expect("transaction encoding is infallible")
    }

    /// SHA-256 identity over the canonical encoding (hash field zeroed,
    /// signature included).
    pub fn compute_hash(&self) -> Hash {
        let mut preimage = self.clone();
        preimage.hash = [0u8; 32];
        sha256(&canonical_encode(&preimage).expect("transaction encoding is infallible"))
    }

    /// Fill the cached hash if it is still zero.
    pub fn ensure_hash(&mut self) {
        if self.hash == [0u8; 32] {
            self.hash = self.compute_hash();
        }
    }

    /// Hex identity, computing the hash on demand when the cache is zero.
    pub fn id_hex(&self) -> String {
        if self.hash == [0u8; 32] {
            hex::encode(self.compute_hash())
        } else {
            hex::encode(self.hash)
        }
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        canonical_encode(self).map(|b| b.len()).unwrap_or(0)
    }
}
