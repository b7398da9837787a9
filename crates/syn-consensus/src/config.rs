//! Consensus engine configuration.

use shared_types::Address;
use std::time::Duration;

/// Initial block reward in base units.
pub const INITIAL_REWARD: u128 = 102_400_000_000_000_000_000;

/// Blocks between reward halvings.
pub const HALVING_PERIOD: u64 = 200_000;

/// Main-block timestamps kept for difficulty retargeting.
pub const RETARGET_WINDOW: usize = 100;

/// Tunables for one consensus engine instance.
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    /// Interval between sub-block proposals.
    pub sub_block_interval: Duration,
    /// Interval between main-block seal attempts.
    pub main_block_interval: Duration,
    /// Account receiving the treasury share of each reward.
    pub treasury: Address,
    /// Chain identifier exposed to the VM.
    pub chain_id: u64,
}

impl ConsensusConfig {
    /// Production-shaped defaults around a treasury account.
    pub fn with_treasury(treasury: Address) -> Self {
        Self {
            sub_block_interval: Duration::from_secs(30),
            // Default main-block cadence ≈ 15 minutes.
            main_block_interval: Duration::from_secs(900),
            treasury,
            chain_id: 1,
        }
    }
}
