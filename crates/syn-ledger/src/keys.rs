//! Persisted state key layout.
//!
//! Every domain owns a short ASCII prefix; keys are ASCII with hex-encoded
//! identifiers so prefix iteration walks them in a stable order.
//!
//! | Prefix | Value |
//! |--------|-------|
//! | `vote:<header_hash>:<validator>` | endorsement signature bytes |
//! | `token:meta:<id>` | token metadata |
//! | `token:supply:<id>` | circulating supply (16B BE) |
//! | `token:<id>:<address>` | balance (16B BE) |
//! | `allowance:<id>:<owner>:<spender>` | allowance (16B BE) |
//! | `validator:<pubkey>` | validator record |
//! | `utxo:<tx_hash>:<index>` | unspent output |
//! | `contract:<address>` | bytecode |
//! | `contract:meta:<address>` | contract record |
//! | `contract:owner:<address>` | owner address (20B) |
//! | `contract:paused:<address>` | single byte {0,1} |
//! | `contract:destroy:<address>` | scheduled selfdestruct marker |
//! | `account:nonce:<address>` | account nonce (8B BE) |

use shared_types::{Address, Hash, TokenId};

/// Endorsement vote key; includes the validator so deduplication is by
/// validator identity.
pub fn vote(header_hash: &Hash, validator: &[u8]) -> Vec<u8> {
    format!("vote:{}:{}", hex::encode(header_hash), hex::encode(validator)).into_bytes()
}

/// Prefix covering every vote for one header.
pub fn vote_prefix(header_hash: &Hash) -> Vec<u8> {
    format!("vote:{}:", hex::encode(header_hash)).into_bytes()
}

/// Token metadata key.
pub fn token_meta(token: TokenId) -> Vec<u8> {
    format!("token:meta:{:08x}", token.0).into_bytes()
}

/// Circulating supply key.
pub fn token_supply(token: TokenId) -> Vec<u8> {
    format!("token:supply:{:08x}", token.0).into_bytes()
}

/// Per-holder balance key.
pub fn token_balance(token: TokenId, address: &Address) -> Vec<u8> {
    format!("token:{:08x}:{}", token.0, hex::encode(address.as_bytes())).into_bytes()
}

/// Prefix covering every holder of one token.
pub fn token_holders_prefix(token: TokenId) -> Vec<u8> {
    format!("token:{:08x}:", token.0).into_bytes()
}

/// Allowance key.
pub fn allowance(token: TokenId, owner: &Address, spender: &Address) -> Vec<u8> {
    format!(
        "allowance:{:08x}:{}:{}",
        token.0,
        hex::encode(owner.as_bytes()),
        hex::encode(spender.as_bytes())
    )
    .into_bytes()
}

/// Validator record key.
pub fn validator(pubkey: &[u8]) -> Vec<u8> {
    format!("validator:{}", hex::encode(pubkey)).into_bytes()
}

/// Prefix covering the whole validator set.
pub const VALIDATOR_PREFIX: &[u8] = b"validator:";

/// Unspent output key.
pub fn utxo(tx_hash: &Hash, output_index: u32) -> Vec<u8> {
    format!("utxo:{}:{:08x}", hex::encode(tx_hash), output_index).into_bytes()
}

/// Contract bytecode key.
pub fn contract_code(address: &Address) -> Vec<u8> {
    format!("contract:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Contract record key.
pub fn contract_meta(address: &Address) -> Vec<u8> {
    format!("contract:meta:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Contract owner key.
pub fn contract_owner(address: &Address) -> Vec<u8> {
    format!("contract:owner:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Contract paused-flag key.
pub fn contract_paused(address: &Address) -> Vec<u8> {
    format!("contract:paused:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Scheduled selfdestruct marker key.
pub fn contract_destroy(address: &Address) -> Vec<u8> {
    format!("contract:destroy:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Prefix covering scheduled selfdestruct markers.
pub const CONTRACT_DESTROY_PREFIX: &[u8] = b"contract:destroy:";

/// Account nonce key.
pub fn account_nonce(address: &Address) -> Vec<u8> {
    format!("account:nonce:{}", hex::encode(address.as_bytes())).into_bytes()
}

/// Encode a u128 as 16 big-endian bytes.
pub fn encode_u128(value: u128) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode a 16-byte big-endian u128; shorter values are zero-extended so
/// legacy 8-byte balances still read correctly.
pub fn decode_u128(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    let len = bytes.len().min(16);
    buf[16 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    u128::from_be_bytes(buf)
}

/// Encode a u64 as 8 big-endian bytes.
pub fn encode_u64(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decode an 8-byte big-endian u64.
pub fn decode_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let len = bytes.len().min(8);
    buf[8 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
    u64::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vote_key_includes_validator() {
        let a = vote(&[1u8; 32], &[2u8; 48]);
        let b = vote(&[1u8; 32], &[3u8; 48]);
        assert_ne!(a, b);
        assert!(a.starts_with(&vote_prefix(&[1u8; 32])));
    }

    #[test]
    fn test_u128_roundtrip() {
        for value in [0u128, 1, u64::MAX as u128 + 1, u128::MAX] {
            assert_eq!(decode_u128(&encode_u128(value)), value);
        }
    }

    #[test]
    fn test_u128_zero_extends_short_values() {
        assert_eq!(decode_u128(&42u64.to_be_bytes()), 42);
    }

    #[test]
    fn test_balance_keys_sort_by_holder() {
        let t = TokenId::SYN;
        let a = token_balance(t, &Address([1u8; 20]));
        let b = token_balance(t, &Address([2u8; 20]));
        assert!(a < b);
    }
}
