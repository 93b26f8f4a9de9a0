//! Trigger-evaluation loop for active stop orders.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::shutdown::MonitorHandle;
use exchange_core::api::ExchangeApi;
use risk_engine::StopOrderService;

/// Polls market prices for every active stop order and executes orders
/// whose trigger condition is breached.
pub struct OrderMonitor {
    service: Arc<StopOrderService>,
    exchange: Arc<dyn ExchangeApi>,
    interval: Duration,
    dry_run: bool,
    stopped: Arc<AtomicBool>,
}

impl OrderMonitor {
    pub fn new(
        service: Arc<StopOrderService>,
        exchange: Arc<dyn ExchangeApi>,
        interval: Duration,
        dry_run: bool,
    ) -> Self {
        Self {
            service,
            exchange,
            interval,
            dry_run,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Spawn the evaluation loop as a background task.
    pub fn spawn(self) -> MonitorHandle {
        let stopped = self.stopped.clone();
        let task = tokio::spawn(async move { self.run().await });
        MonitorHandle::new(stopped, task)
    }

    async fn run(self) {
        info!(interval_secs = self.interval.as_secs(), "Order monitor started");

        let mut tick = tokio::time::interval(self.interval);
        // The first interval tick fires immediately; consume it so the
        // first evaluation happens one full period after startup.
        tick.tick().await;

        loop {
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            tick.tick().await;
            if self.stopped.load(Ordering::Relaxed) {
                break;
            }
            self.run_once().await;
        }

        info!("Order monitor stopped");
    }

    /// Evaluate every active order once. One bad ticker never blocks the
    /// batch, and execution failures never crash the loop.
    async fn run_once(&self) {
        let orders = match self.service.active_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                error!(error = %e, "Failed to load active stop orders");
                return;
            }
        };
        debug!(count = orders.len(), "Evaluating active stop orders");

        for order in orders {
            let market = match self.exchange.get_market(&order.ticker).await {
                Ok(market) => market,
                Err(e) => {
                    warn!(
                        ticker = %order.ticker,
                        order_id = %order.id,
                        error = %e,
                        "Market fetch failed, skipping order"
                    );
                    continue;
                }
            };

            let bid = market.bid_for(order.side);
            if bid < order.trigger_price() {
                info!(
                    order_id = %order.id,
                    ticker = %order.ticker,
                    bid = bid.value(),
                    trigger_price = order.trigger_price().value(),
                    "Stop trigger breached, executing"
                );
                if let Err(e) = self.service.execute_order(order.id, self.dry_run).await {
                    error!(order_id = %order.id, error = %e, "Stop order execution failed");
                }
            }
        }
    }
}
