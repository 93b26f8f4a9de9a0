//! Contract price and addressing value types.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A contract price outside the valid range.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("price {0} cents is outside the valid contract range [0, 100]")]
pub struct InvalidPrice(pub i64);

/// Price of a binary contract, in whole cents.
///
/// Binary contracts trade between 0 and 100 cents inclusive; construction
/// rejects anything outside that range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractPrice(i64);

impl ContractPrice {
    pub const MIN_CENTS: i64 = 0;
    pub const MAX_CENTS: i64 = 100;

    /// Create a price from whole cents.
    pub fn new(cents: i64) -> Result<Self, InvalidPrice> {
        if !(Self::MIN_CENTS..=Self::MAX_CENTS).contains(&cents) {
            return Err(InvalidPrice(cents));
        }
        Ok(Self(cents))
    }

    /// The price in whole cents.
    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for ContractPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}¢", self.0)
    }
}

/// Which binary outcome a position or order refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "yes"),
            Side::No => write!(f, "no"),
        }
    }
}

/// The addressable unit of position and trigger targeting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractIdentifier {
    pub ticker: String,
    pub side: Side,
}

impl ContractIdentifier {
    pub fn new(ticker: impl Into<String>, side: Side) -> Self {
        Self {
            ticker: ticker.into(),
            side,
        }
    }
}
