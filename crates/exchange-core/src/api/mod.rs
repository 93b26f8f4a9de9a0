//! Exchange API access.

pub mod kalshi;

pub use kalshi::KalshiClient;

use async_trait::async_trait;
use serde::Serialize;

use crate::types::{ContractPrice, MarketSnapshot, Position, Side};
use crate::Result;

/// Order action on the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

/// Execution style, selected by presence of a limit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// Specification of an order to submit.
///
/// `client_order_id` is the idempotency token: the exchange deduplicates
/// retried submissions carrying the same value.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub ticker: String,
    pub client_order_id: String,
    pub side: Side,
    pub action: OrderAction,
    pub count: u32,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<i64>,
}

impl OrderRequest {
    /// A sell order executed at the current market.
    pub fn market_sell(
        ticker: impl Into<String>,
        side: Side,
        count: u32,
        client_order_id: String,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            client_order_id,
            side,
            action: OrderAction::Sell,
            count,
            order_type: OrderType::Market,
            yes_price: None,
            no_price: None,
        }
    }

    /// A sell order with a price floor on the relevant side.
    pub fn limit_sell(
        ticker: impl Into<String>,
        side: Side,
        count: u32,
        limit: ContractPrice,
        client_order_id: String,
    ) -> Self {
        let (yes_price, no_price) = match side {
            Side::Yes => (Some(limit.value()), None),
            Side::No => (None, Some(limit.value())),
        };
        Self {
            ticker: ticker.into(),
            client_order_id,
            side,
            action: OrderAction::Sell,
            count,
            order_type: OrderType::Limit,
            yes_price,
            no_price,
        }
    }
}

/// Authenticated market-data and order operations the engine depends on.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    /// Fetch the current snapshot for one market.
    async fn get_market(&self, ticker: &str) -> Result<MarketSnapshot>;

    /// Fetch open positions, optionally filtered by ticker.
    ///
    /// Implementations follow server-side pagination to exhaustion and
    /// return the accumulated result.
    async fn get_positions(&self, ticker: Option<&str>) -> Result<Vec<Position>>;

    /// Submit an order; returns the exchange-assigned order id.
    async fn create_order(&self, request: OrderRequest) -> Result<String>;
}
