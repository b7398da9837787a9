//! Proof-of-History validation.
//!
//! The PoH digest is `SHA256(concat(tx_bytes…) || timestamp_ms_le)`; the
//! comparison against the claimed digest is constant-time.

use shared_types::{poh_digest, SubBlock};
use subtle::ConstantTimeEq;

/// Recompute and check a sub-block's PoH digest.
pub fn validate_poh(sub_block: &SubBlock) -> bool {
    let expected = poh_digest(&sub_block.transactions, sub_block.header.timestamp_ms);
    expected.ct_eq(&sub_block.header.poh_digest).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SubBlockHeader;

    fn sub_block(txs: Vec<Vec<u8>>, timestamp_ms: u64) -> SubBlock {
        SubBlock {
            header: SubBlockHeader {
                height: 1,
                timestamp_ms,
                validator_pubkey: [0u8; 48],
                poh_digest: poh_digest(&txs, timestamp_ms),
                signature: [0u8; 96],
            },
            transactions: txs,
        }
    }

    #[test]
    fn test_valid_poh_accepted() {
        let sb = sub_block(vec![vec![0xAA], vec![0xBB]], 1_000);
        assert!(validate_poh(&sb));
    }

    #[test]
    fn test_reordered_transactions_rejected() {
        let mut sb = sub_block(vec![vec![0xAA], vec![0xBB]], 1_000);
        sb.transactions.swap(0, 1);
        assert!(!validate_poh(&sb));
    }

    #[test]
    fn test_tampered_timestamp_rejected() {
        let mut sb = sub_block(vec![vec![0xAA]], 1_000);
        sb.header.timestamp_ms = 1_001;
        assert!(!validate_poh(&sb));
    }
}
