//! Dynamic consensus weight calculator.
//!
//! Blends the base weights (PoW 0.40, PoS 0.30, PoH 0.30) with a demand/
//! stake adjustment, floors each weight at 0.075 and normalises the
//! result to sum to 1.

/// Minimum weight after adjustment.
pub const WEIGHT_FLOOR: f64 = 0.075;

/// Inputs to one weight calculation.
#[derive(Debug, Clone, Copy)]
pub struct WeightInputs {
    /// Observed network demand.
    pub demand: f64,
    /// Observed total stake.
    pub stake: f64,
    /// Demand cap.
    pub d_max: f64,
    /// Stake cap.
    pub s_max: f64,
    /// Demand/stake coefficient for PoW.
    pub alpha: f64,
    /// Demand/stake coefficient for PoS.
    pub beta: f64,
    /// Overall adjustment gain.
    pub gamma: f64,
}

/// Normalised consensus weights.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusWeights {
    /// Proof-of-Work weight.
    pub pow: f64,
    /// Proof-of-Stake weight.
    pub pos: f64,
    /// Proof-of-History weight.
    pub poh: f64,
    /// Endorsement threshold derived from the same inputs.
    pub threshold: f64,
}

impl Default for ConsensusWeights {
    fn default() -> Self {
        Self {
            pow: 0.40,
            pos: 0.30,
            poh: 0.30,
            threshold: 0.0,
        }
    }
}

/// Compute the dynamic weights for the given inputs.
pub fn calculate(inputs: &WeightInputs) -> ConsensusWeights {
    let demand_ratio = if inputs.d_max > 0.0 {
        (inputs.demand / inputs.d_max).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let stake_ratio = if inputs.s_max > 0.0 {
        (inputs.stake / inputs.s_max).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let adj = inputs.gamma * (demand_ratio + stake_ratio);
    let pow = (0.40 + inputs.alpha * adj).max(WEIGHT_FLOOR);
    let pos = (0.30 + inputs.beta * adj).max(WEIGHT_FLOOR);
    let poh = (0.30 + (1.0 - inputs.alpha - inputs.beta) * adj).max(WEIGHT_FLOOR);

    let sum = pow + pos + poh;
    ConsensusWeights {
        pow: pow / sum,
        pos: pos / sum,
        poh: poh / sum,
        threshold: inputs.alpha * demand_ratio + inputs.beta * stake_ratio,
    }
}
