//! Shared test doubles for the monitor loops.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use exchange_core::api::{ExchangeApi, OrderRequest};
use exchange_core::types::{ContractPrice, MarketSnapshot, Position};
use exchange_core::{Error, Result};

/// In-memory exchange double: scripted markets and positions, recorded
/// order submissions, optional failure injection.
#[derive(Default)]
pub struct FakeExchange {
    markets: Mutex<HashMap<String, MarketSnapshot>>,
    positions: Mutex<Vec<Position>>,
    submitted: Mutex<Vec<OrderRequest>>,
    pub fail_get_positions: std::sync::atomic::AtomicBool,
}

impl FakeExchange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_market(&self, ticker: &str, yes_bid: i64, no_bid: i64, last_price: i64) {
        let snapshot = MarketSnapshot {
            ticker: ticker.to_string(),
            yes_bid: ContractPrice::new(yes_bid).unwrap(),
            yes_ask: ContractPrice::new((yes_bid + 2).min(100)).unwrap(),
            no_bid: ContractPrice::new(no_bid).unwrap(),
            no_ask: ContractPrice::new((no_bid + 2).min(100)).unwrap(),
            last_price: ContractPrice::new(last_price).unwrap(),
        };
        self.markets.lock().unwrap().insert(ticker.to_string(), snapshot);
    }

    pub fn set_position(&self, ticker: &str, count: i32) {
        let mut positions = self.positions.lock().unwrap();
        positions.retain(|p| p.ticker != ticker);
        positions.push(Position::new(ticker, count));
    }

    pub fn submitted_orders(&self) -> Vec<OrderRequest> {
        self.submitted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExchangeApi for FakeExchange {
    async fn get_market(&self, ticker: &str) -> Result<MarketSnapshot> {
        self.markets
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .ok_or_else(|| Error::MarketNotFound {
                ticker: ticker.to_string(),
            })
    }

    async fn get_positions(&self, ticker: Option<&str>) -> Result<Vec<Position>> {
        if self.fail_get_positions.load(std::sync::atomic::Ordering::Relaxed) {
            return Err(Error::Api {
                message: "position fetch failed".to_string(),
                status: Some(500),
                body: None,
            });
        }
        let positions = self.positions.lock().unwrap();
        Ok(positions
            .iter()
            .filter(|p| ticker.map_or(true, |t| p.ticker == t))
            .cloned()
            .collect())
    }

    async fn create_order(&self, request: OrderRequest) -> Result<String> {
        let mut submitted = self.submitted.lock().unwrap();
        submitted.push(request);
        Ok(format!("exch-{}", submitted.len()))
    }
}
