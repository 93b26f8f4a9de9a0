//! Market snapshot types.

use serde::{Deserialize, Serialize};

use crate::types::{ContractPrice, Side};

/// Top-of-book snapshot for one binary market.
///
/// Transient read model used by the monitors; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub ticker: String,
    pub yes_bid: ContractPrice,
    pub yes_ask: ContractPrice,
    pub no_bid: ContractPrice,
    pub no_ask: ContractPrice,
    pub last_price: ContractPrice,
}

impl MarketSnapshot {
    /// The bid relevant to closing a position on the given side.
    pub fn bid_for(&self, side: Side) -> ContractPrice {
        match side {
            Side::Yes => self.yes_bid,
            Side::No => self.no_bid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> MarketSnapshot {
        MarketSnapshot {
            ticker: "INX-2024".to_string(),
            yes_bid: ContractPrice::new(55).unwrap(),
            yes_ask: ContractPrice::new(57).unwrap(),
            no_bid: ContractPrice::new(43).unwrap(),
            no_ask: ContractPrice::new(45).unwrap(),
            last_price: ContractPrice::new(56).unwrap(),
        }
    }

    #[test]
    fn test_bid_selection_by_side() {
        let market = snapshot();
        assert_eq!(market.bid_for(Side::Yes).value(), 55);
        assert_eq!(market.bid_for(Side::No).value(), 43);
    }
}
