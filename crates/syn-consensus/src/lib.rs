//! # Synnergy Consensus
//!
//! Hybrid consensus engine: PoH sub-block proposer, PoS vote subscriber,
//! PoW main-block sealer, difficulty retargeting, reward halving and
//! distribution, and the dynamic weight calculator.

#![warn(clippy::all)]

pub mod config;
pub mod difficulty;
pub mod engine;
pub mod errors;
pub mod poh;
pub mod rewards;
pub mod votes;
pub mod weights;

// Re-exports
pub use config::{ConsensusConfig, HALVING_PERIOD, INITIAL_REWARD, RETARGET_WINDOW};
pub use difficulty::DifficultyWindow;
pub use engine::{ConsensusEngine, SubBlockStatus};
pub use errors::{ConsensusError, ConsensusResult};
pub use poh::validate_poh;
pub use rewards::{block_reward, distribute, Payout};
pub use votes::{is_endorsed, require_quorum, VoteMsg, SUB_BLOCK_TOPIC, VOTE_TOPIC};
pub use weights::{calculate, ConsensusWeights, WeightInputs, WEIGHT_FLOOR};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
