//! PoS endorsement votes.
//!
//! Votes travel on their own gossip topic as
//! `(header_hash, validator_pubkey, signature)`; the signature is BLS
//! over the header hash. Deduplication is by validator identity — the
//! ledger keys votes as `vote:<header_hash>:<validator>`.

use crate::errors::{ConsensusError, ConsensusResult};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use shared_types::{BlsPublicKeyBytes, BlsSignatureBytes, Hash, SignatureAlgo};
use syn_ledger::Ledger;

/// Gossip topic for sub-block headers.
pub const SUB_BLOCK_TOPIC: &str = "synnergy-subblock/1";

/// Gossip topic for PoS votes.
pub const VOTE_TOPIC: &str = "synnergy-pos-vote/1";

/// A validator's endorsement of one sub-block header.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMsg {
    /// Canonical hash of the endorsed header.
    pub header_hash: Hash,
    /// Endorsing validator's BLS role key.
    #[serde_as(as = "serde_with::Bytes")]
    pub validator_pubkey: BlsPublicKeyBytes,
    /// BLS signature over `header_hash`.
    #[serde_as(as = "serde_with::Bytes")]
    pub signature: BlsSignatureBytes,
}

impl VoteMsg {
    /// Verify the endorsement signature.
    pub fn verify(&self) -> bool {
        shared_crypto::verify(
            SignatureAlgo::Bls,
            &self.validator_pubkey,
            &self.header_hash,
            &self.signature,
        )
        .unwrap_or(false)
    }
}

/// Super-majority check as a hard error: rejected while
/// `3 × votes < 2 × active`. Unique voters only — the vote keys already
/// deduplicate by validator.
pub fn require_quorum(ledger: &Ledger, header_hash: &Hash) -> ConsensusResult<()> {
    let active = ledger.active_validator_count();
    if active == 0 {
        return Err(ConsensusError::NoActiveValidators);
    }
    let votes = ledger.vote_count(header_hash);
    if 3 * votes < 2 * active {
        return Err(ConsensusError::InsufficientVotes { votes, active });
    }
    Ok(())
}

/// Super-majority check as a predicate.
pub fn is_endorsed(ledger: &Ledger, header_hash: &Hash) -> bool {
    require_quorum(ledger, header_hash).is_ok()
}
