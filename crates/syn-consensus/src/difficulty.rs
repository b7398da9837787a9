//! Difficulty retargeting.
//!
//! A ring buffer of the last [`RETARGET_WINDOW`](crate::config::RETARGET_WINDOW)
//! main-block timestamps drives the adjustment:
//! `new_target = target × span / expected` with
//! `expected = block_interval × (n − 1)`.
//!
//! The target is a ceiling: slow blocks raise it (easier), fast blocks
//! lower it (harder). One retarget moves the target by at most
//! [`MAX_ADJUSTMENT`]× in either direction, and the result never drops
//! below 1.

use crate::config::RETARGET_WINDOW;
use primitive_types::U256;
use std::collections::VecDeque;

/// Maximum factor one retarget may move the target.
pub const MAX_ADJUSTMENT: u64 = 4;

/// Ring buffer of recent main-block timestamps.
#[derive(Debug, Clone, Default)]
pub struct DifficultyWindow {
    timestamps: VecDeque<u64>,
}

impl DifficultyWindow {
    /// Empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a sealed block's timestamp.
    pub fn record(&mut self, timestamp_ms: u64) {
        if self.timestamps.len() == RETARGET_WINDOW {
            self.timestamps.pop_front();
        }
        self.timestamps.push_back(timestamp_ms);
    }

    /// Number of recorded timestamps.
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    /// True when nothing is recorded.
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Compute the next target from the current one.
    ///
    /// With fewer than two timestamps the target is unchanged.
    pub fn retarget(&self, current: U256, block_interval_ms: u64) -> U256 {
        let n = self.timestamps.len();
        if n < 2 {
            return current;
        }
        let first = self.timestamps[0];
        let last = self.timestamps[n - 1];
        let expected = block_interval_ms.saturating_mul((n - 1) as u64).max(1);
        // Clamp the observed span so one retarget cannot swing the target
        // more than MAX_ADJUSTMENT× either way.
        let span = last
            .saturating_sub(first)
            .clamp((expected / MAX_ADJUSTMENT).max(1), expected.saturating_mul(MAX_ADJUSTMENT));

        // current × span / expected without overflowing 256 bits:
        // (current / expected) × span + (current % expected) × span / expected
        let expected_word = U256::from(expected);
        let span_word = U256::from(span);
        let quotient = current / expected_word;
        let remainder = current % expected_word;
        let next = quotient
            .saturating_mul(span_word)
            .saturating_add(remainder.saturating_mul(span_word) / expected_word);

        // Never a non-positive target.
        next.max(U256::one())
    }
}
