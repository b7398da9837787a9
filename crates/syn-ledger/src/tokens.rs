//! Token registry metadata.

use serde::{Deserialize, Serialize};
use shared_types::TokenId;

/// Declared metadata for a registered token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    /// Token identifier.
    pub id: TokenId,
    /// Human-readable name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display decimals.
    pub decimals: u8,
    /// Maximum circulating supply; `None` means uncapped.
    pub supply_cap: Option<u128>,
}

impl TokenMeta {
    /// Metadata for the base currency.
    pub fn base_currency() -> Self {
        TokenMeta {
            id: TokenId::SYN,
            name: "Synnergy".into(),
            symbol: "SYN".into(),
            decimals: 18,
            supply_cap: None,
        }
    }

    /// Metadata for the governance-eligibility marker token.
    pub fn syn_id() -> Self {
        TokenMeta {
            id: TokenId::SYN_ID,
            name: "Synnergy Identity".into(),
            symbol: "SYN-ID".into(),
            decimals: 0,
            supply_cap: None,
        }
    }
}
