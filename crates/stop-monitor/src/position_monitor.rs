//! Reconciliation loop between open positions and active stop orders.
//!
//! Every pass converges the two sets: each nonzero position gets a
//! protective stop order, flat or vanished positions lose theirs. The
//! pass is idempotent against current state: a rerun with no market
//! movement changes nothing.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::shutdown::MonitorHandle;
use exchange_core::api::ExchangeApi;
use exchange_core::types::{ContractPrice, Position};
use risk_engine::{OrderError, StopOrder, StopOrderService};

/// Default trigger sits 10% below the last traded price.
const DEFAULT_TRIGGER_DISCOUNT: Decimal = Decimal::from_parts(9, 0, 0, false, 1); // 0.9

pub struct PositionMonitor {
    service: Arc<StopOrderService>,
    exchange: Arc<dyn ExchangeApi>,
    interval: Duration,
    stopped: Arc<AtomicBool>,
}

impl PositionMonitor {
    pub fn new(
        service: Arc<StopOrderService>,
        exchange: Arc<dyn ExchangeApi>,
        interval: Duration,
    ) -> Self {
        Self {
            service,
            exchange,
            interval,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the reconciliation loop as a background task.
    pub fn spawn(self) -> MonitorHandle {
        let stopped = self.stopped.clone();
        let task = tokio::spawn(async move { self.run().await });
        MonitorHandle::new(stopped, task)
    }

    async fn run(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Position monitor started"
        );

        // Immediate pass at startup, then fixed cadence.
        if let Err(e) = self.run_once().await {
            error!(error = %e, "Reconciliation pass failed");
        }

        let mut tick = tokio::time::interval(self.interval);
        tick.tick().await;

        loop {
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            tick.tick().await;
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            if let Err(e) = self.run_once().await {
                error!(error = %e, "Reconciliation pass failed");
            }
        }

        info!("Position monitor stopped");
    }

    /// One reconciliation pass.
    ///
    /// A failure fetching either full set aborts the pass; partial
    /// reconciliation against an incomplete view is worse than skipping.
    /// Individual cancel/create failures are logged and skipped.
    async fn run_once(&self) -> Result<(), OrderError> {
        let positions = self.exchange.get_positions(None).await?;
        let active = self.service.active_orders().await?;

        // One stop order per ticker: a signed per-ticker count cannot hold
        // YES and NO exposure at once, so side is not part of the key.
        let mut orders_by_ticker: HashMap<String, StopOrder> = HashMap::new();
        for order in active {
            orders_by_ticker.insert(order.ticker.clone(), order);
        }

        debug!(
            positions = positions.len(),
            active_orders = orders_by_ticker.len(),
            "Reconciling positions against stop orders"
        );

        for position in &positions {
            if position.is_flat() {
                // Closed positions should not carry stale protective orders.
                if let Some(order) = orders_by_ticker.remove(&position.ticker) {
                    info!(
                        ticker = %position.ticker,
                        order_id = %order.id,
                        "Position flat, cancelling stop order"
                    );
                    self.cancel_logged(&order).await;
                }
                continue;
            }

            if orders_by_ticker.remove(&position.ticker).is_some() {
                // Already protected; no automatic re-pricing.
                continue;
            }

            if let Err(e) = self.create_protective_order(position).await {
                warn!(
                    ticker = %position.ticker,
                    error = %e,
                    "Failed to create stop order for position"
                );
            }
        }

        // Whatever remains indexed has no entry in the position set at all.
        for (ticker, order) in orders_by_ticker {
            info!(
                ticker = %ticker,
                order_id = %order.id,
                "Cancelling orphaned stop order"
            );
            self.cancel_logged(&order).await;
        }

        Ok(())
    }

    async fn cancel_logged(&self, order: &StopOrder) {
        if let Err(e) = self.service.cancel_order(order.id).await {
            warn!(order_id = %order.id, error = %e, "Failed to cancel stop order");
        }
    }

    async fn create_protective_order(&self, position: &Position) -> Result<(), OrderError> {
        let Some(side) = position.side() else {
            return Ok(());
        };

        let market = self.exchange.get_market(&position.ticker).await?;
        let trigger_price = default_trigger_price(market.last_price);

        let order = self
            .service
            .create_order(&position.ticker, side, trigger_price, None)
            .await?;
        info!(
            order_id = %order.id,
            ticker = %position.ticker,
            side = %side,
            trigger_price,
            count = position.close_quantity(),
            "Created protective stop order"
        );
        Ok(())
    }
}

/// 10% below the last traded price, in whole cents.
fn default_trigger_price(last_price: ContractPrice) -> i64 {
    let discounted = Decimal::from(last_price.value()) * DEFAULT_TRIGGER_DISCOUNT;
    discounted.round().to_i64().unwrap_or(last_price.value())
}
