//! # Shared Types - Core Domain Entities
//!
//! Defines the entities every Synnergy subsystem speaks:
//!
//! - **Chain**: `SubBlock`, `SubBlockHeader`, `Block`, `BlockHeader`
//! - **State**: `Transaction`, `Utxo`, `Log`, `Contract`, `Validator`
//! - **Identity**: `Address`, `Hash`, `TokenId`, role keys
//!
//! Canonical encoding is bincode (fixed-width little-endian integers,
//! length-prefixed sequences); block and sub-block identities are the
//! double-SHA-256 of the encoded header.

#![warn(clippy::all)]

pub mod codec;
pub mod entities;
pub mod errors;
pub mod shutdown;
pub mod transaction;

// Re-exports
pub use codec::{canonical_decode, canonical_encode, canonical_hash, double_sha256, sha256};
pub use entities::{
    poh_digest, Address, BlsPublicKeyBytes, BlsSignatureBytes, Block, BlockHeader, Hash,
    SignatureAlgo, SubBlock, SubBlockHeader, TokenId, Validator, MAX_SUB_BLOCKS_PER_BLOCK,
    MAX_TXS_PER_SUB_BLOCK,
};
pub use errors::CodecError;
pub use shutdown::Shutdown;
pub use transaction::{
    AuthSignature, Contract, Log, StateChange, TokenTransfer, Transaction, TxPayload, TxType,
    Utxo, UtxoInput, UtxoOutput, UtxoRef,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
