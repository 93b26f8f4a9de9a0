//! Open-position types reported by the exchange.

use serde::{Deserialize, Serialize};

use crate::types::Side;

/// Net position in one market.
///
/// The exchange reports a single signed contract count per ticker:
/// positive = net YES, negative = net NO, zero = flat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub ticker: String,
    pub count: i32,
}

impl Position {
    pub fn new(ticker: impl Into<String>, count: i32) -> Self {
        Self {
            ticker: ticker.into(),
            count,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.count == 0
    }

    /// Which outcome the position holds; `None` when flat.
    pub fn side(&self) -> Option<Side> {
        match self.count {
            0 => None,
            c if c > 0 => Some(Side::Yes),
            _ => Some(Side::No),
        }
    }

    /// Contract count needed to close the position in full.
    pub fn close_quantity(&self) -> u32 {
        self.count.unsigned_abs()
    }
}
