//! Block reward halving and distribution.
//!
//! Split: 30% to the miner, 30% equally across the referenced sub-block
//! validators (one share per referenced header), and the treasury takes
//! the residual so the three parts always sum to the full reward.

use crate::config::{HALVING_PERIOD, INITIAL_REWARD};
use shared_types::{Address, Block};

/// Reward at `height`: `initial_reward >> (height / halving_period)`.
pub fn block_reward(height: u64) -> u128 {
    let halvings = height / HALVING_PERIOD;
    if halvings >= 128 {
        return 0;
    }
    INITIAL_REWARD >> halvings
}

/// One reward payout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payout {
    /// Receiving account.
    pub to: Address,
    /// Amount in base units.
    pub amount: u128,
}

/// Compute the payouts for a sealed block.
///
/// Shares are integer `reward × 30 / 100`; with no referenced sub-blocks
/// the staker share folds into the treasury residual.
pub fn distribute(block: &Block, treasury: Address) -> Vec<Payout> {
    let reward = block_reward(block.header.height);
    if reward == 0 {
        return Vec::new();
    }

    let miner_share = reward * 30 / 100;
    let staker_pool = reward * 30 / 100;

    let mut payouts = Vec::new();
    let miner = Address::from_public_key(&block.header.miner_pubkey);
    payouts.push(Payout {
        to: miner,
        amount: miner_share,
    });

    let mut paid_stakers = 0u128;
    let validators = &block.sub_blocks;
    if !validators.is_empty() {
        let per_validator = staker_pool / validators.len() as u128;
        for header in validators {
            let staker = Address::from_public_key(&header.validator_pubkey);
            payouts.push(Payout {
                to: staker,
                amount: per_validator,
            });
            paid_stakers += per_validator;
        }
    }

    // The treasury absorbs every rounding residual exactly.
    let treasury_share = reward - miner_share - paid_stakers;
    payouts.push(Payout {
        to: treasury,
        amount: treasury_share,
    });
    payouts
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::{BlockHeader, SubBlockHeader};

    fn block(height: u64, validator_count: usize) -> Block {
        Block {
            header: BlockHeader {
                height,
                timestamp_ms: 0,
                prev_hash: [0u8; 32],
                pow_hash: [0u8; 32],
                nonce: 0,
                miner_pubkey: [0xAAu8; 48],
            },
            sub_blocks: (0..validator_count)
                .map(|i| SubBlockHeader {
                    height: i as u64 + 1,
                    timestamp_ms: 0,
                    validator_pubkey: [i as u8 + 1; 48],
                    poh_digest: [0u8; 32],
                    signature: [0u8; 96],
                })
                .collect(),
            transactions: vec![],
        }
    }

    #[test]
    fn test_halving_schedule() {
        assert_eq!(block_reward(0), INITIAL_REWARD);
        assert_eq!(block_reward(HALVING_PERIOD - 1), INITIAL_REWARD);
        assert_eq!(block_reward(HALVING_PERIOD), INITIAL_REWARD >> 1);
        assert_eq!(block_reward(HALVING_PERIOD * 3), INITIAL_REWARD >> 3);
    }

    #[test]
    fn test_conservation_exact() {
        for validator_count in [0, 1, 3, 7] {
            let b = block(1, validator_count);
            let payouts = distribute(&b, Address([9u8; 20]));
            let total: u128 = payouts.iter().map(|p| p.amount).sum();
            assert_eq!(total, block_reward(1), "{validator_count} validators");
        }
    }

    #[test]
    fn test_split_shares() {
        let b = block(1, 3);
        let payouts = distribute(&b, Address([9u8; 20]));
        let reward = block_reward(1);

        // Miner first, treasury last.
        assert_eq!(payouts[0].amount, reward * 30 / 100);
        let per_validator = (reward * 30 / 100) / 3;
        assert_eq!(payouts[1].amount, per_validator);
        assert_eq!(
            payouts.last().unwrap().amount,
            reward - reward * 30 / 100 - per_validator * 3
        );
    }

    #[test]
    fn test_duplicate_validator_gets_share_per_header() {
        let mut b = block(1, 2);
        b.sub_blocks[1].validator_pubkey = b.sub_blocks[0].validator_pubkey;
        let payouts = distribute(&b, Address([9u8; 20]));
        // One share per referenced header, same recipient twice.
        assert_eq!(payouts[1].to, payouts[2].to);
    }

    #[test]
    fn test_no_sub_blocks_folds_staker_pool_into_treasury() {
        let b = block(1, 0);
        let payouts = distribute(&b, Address([9u8; 20]));
        assert_eq!(payouts.len(), 2);
        let reward = block_reward(1);
        assert_eq!(payouts[1].amount, reward - reward * 30 / 100);
    }
}
