//! Stop-order service: CRUD, validated transitions, and execution.
//!
//! The only writer of order state. Monitors and any operator surface go
//! through this service; the repository is never mutated directly.

use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::OrderError;
use crate::repo::OrderRepository;
use crate::stop_order::StopOrder;
use exchange_core::api::{ExchangeApi, OrderRequest};
use exchange_core::types::{ContractPrice, Side};

pub struct StopOrderService {
    repo: Arc<dyn OrderRepository>,
    exchange: Arc<dyn ExchangeApi>,
}

impl StopOrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, exchange: Arc<dyn ExchangeApi>) -> Self {
        Self { repo, exchange }
    }

    /// Create and persist a new ACTIVE stop order.
    ///
    /// Prices arrive as raw cents and are validated here.
    pub async fn create_order(
        &self,
        ticker: &str,
        side: Side,
        trigger_price: i64,
        limit_price: Option<i64>,
    ) -> Result<StopOrder, OrderError> {
        let trigger = ContractPrice::new(trigger_price)?;
        let limit = limit_price.map(ContractPrice::new).transpose()?;

        let order = StopOrder::new(ticker.to_string(), side, trigger, limit);
        self.repo.persist(&order).await?;

        info!(
            order_id = %order.id,
            ticker = %order.ticker,
            side = %order.side,
            trigger_price = trigger.value(),
            "Created stop order"
        );
        Ok(order)
    }

    /// Re-price an existing order; only the provided fields change.
    pub async fn update_order(
        &self,
        id: Uuid,
        trigger_price: Option<i64>,
        limit_price: Option<i64>,
    ) -> Result<StopOrder, OrderError> {
        let mut order = self.fetch(id).await?;

        if let Some(cents) = trigger_price {
            order.set_trigger_price(ContractPrice::new(cents)?)?;
        }
        if let Some(cents) = limit_price {
            order.set_limit_price(Some(ContractPrice::new(cents)?))?;
        }

        self.repo.persist(&order).await?;
        info!(order_id = %order.id, "Updated stop order");
        Ok(order)
    }

    /// Cancel an ACTIVE order.
    pub async fn cancel_order(&self, id: Uuid) -> Result<StopOrder, OrderError> {
        let mut order = self.fetch(id).await?;
        order.cancel()?;
        self.repo.persist(&order).await?;

        info!(order_id = %order.id, ticker = %order.ticker, "Cancelled stop order");
        Ok(order)
    }

    /// All orders still eligible for triggering.
    ///
    /// Filtering happens here, not in the repository, to keep the
    /// repository contract minimal.
    pub async fn active_orders(&self) -> Result<Vec<StopOrder>, OrderError> {
        let orders = self.repo.get_all().await?;
        Ok(orders.into_iter().filter(|o| o.is_active()).collect())
    }

    /// Close the order's full position at market (or at its limit price)
    /// and transition it to TRIGGERED.
    ///
    /// The stringified order id is the submission's idempotency token, so
    /// re-invoking for the same order cannot duplicate the sell on the
    /// exchange side. Any exchange failure aborts before the state
    /// transition: the order stays ACTIVE and the next tick retries.
    pub async fn execute_order(&self, id: Uuid, dry_run: bool) -> Result<StopOrder, OrderError> {
        let mut order = self.fetch(id).await?;

        let positions = self.exchange.get_positions(Some(&order.ticker)).await?;
        let position = positions
            .iter()
            .find(|p| p.ticker == order.ticker && !p.is_flat())
            .ok_or_else(|| OrderError::NoPosition {
                ticker: order.ticker.clone(),
            })?;
        let count = position.close_quantity();

        if dry_run {
            info!(
                order_id = %order.id,
                ticker = %order.ticker,
                count,
                "Dry run: skipping order submission"
            );
        } else {
            let request = match order.limit_price() {
                Some(limit) => OrderRequest::limit_sell(
                    order.ticker.clone(),
                    order.side,
                    count,
                    limit,
                    order.id.to_string(),
                ),
                None => OrderRequest::market_sell(
                    order.ticker.clone(),
                    order.side,
                    count,
                    order.id.to_string(),
                ),
            };
            let exchange_order_id = self.exchange.create_order(request).await?;
            info!(
                order_id = %order.id,
                ticker = %order.ticker,
                exchange_order_id = %exchange_order_id,
                count,
                "Submitted closing sell order"
            );
        }

        order.trigger()?;
        self.repo.persist(&order).await?;
        Ok(order)
    }

    async fn fetch(&self, id: Uuid) -> Result<StopOrder, OrderError> {
        self.repo
            .get_by_id(id)
            .await?
            .ok_or(OrderError::NotFound { id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryOrderRepository;
    use crate::stop_order::OrderStatus;
    use async_trait::async_trait;
    use exchange_core::types::{MarketSnapshot, Position};
    use exchange_core::{Error, Result as CoreResult};
    use std::sync::Mutex;

    /// Exchange double recording submitted orders.
    #[derive(Default)]
    struct FakeExchange {
        positions: Mutex<Vec<Position>>,
        submitted: Mutex<Vec<OrderRequest>>,
        fail_submission: bool,
    }

    impl FakeExchange {
        fn with_position(ticker: &str, count: i32) -> Self {
            let fake = Self::default();
            fake.positions.lock().unwrap().push(Position::new(ticker, count));
            fake
        }

        fn submitted_orders(&self) -> Vec<OrderRequest> {
            self.submitted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ExchangeApi for FakeExchange {
        async fn get_market(&self, ticker: &str) -> CoreResult<MarketSnapshot> {
            Err(Error::MarketNotFound {
                ticker: ticker.to_string(),
            })
        }

        async fn get_positions(&self, ticker: Option<&str>) -> CoreResult<Vec<Position>> {
            let positions = self.positions.lock().unwrap();
            Ok(positions
                .iter()
                .filter(|p| ticker.map_or(true, |t| p.ticker == t))
                .cloned()
                .collect())
        }

        async fn create_order(&self, request: OrderRequest) -> CoreResult<String> {
            if self.fail_submission {
                return Err(Error::Api {
                    message: "insufficient balance".to_string(),
                    status: Some(400),
                    body: None,
                });
            }
            self.submitted.lock().unwrap().push(request);
            Ok("exch-order-1".to_string())
        }
    }

    fn service_with(exchange: FakeExchange) -> StopOrderService {
        StopOrderService::new(
            Arc::new(MemoryOrderRepository::new()),
            Arc::new(exchange),
        )
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range_trigger() {
        let service = service_with(FakeExchange::default());
        let result = service.create_order("INX-2024", Side::Yes, 150, None).await;
        assert!(matches!(result, Err(OrderError::InvalidPrice(_))));
    }

    #[tokio::test]
    async fn test_update_applies_only_provided_fields() {
        let service = service_with(FakeExchange::default());
        let order = service
            .create_order("INX-2024", Side::Yes, 60, Some(55))
            .await
            .unwrap();

        let updated = service.update_order(order.id, Some(50), None).await.unwrap();
        assert_eq!(updated.trigger_price().value(), 50);
        assert_eq!(updated.limit_price().unwrap().value(), 55);
    }

    #[tokio::test]
    async fn test_update_missing_order_is_not_found() {
        let service = service_with(FakeExchange::default());
        let result = service.update_order(Uuid::new_v4(), Some(50), None).await;
        assert!(matches!(result, Err(OrderError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_cancel_twice_fails_second_time() {
        let service = service_with(FakeExchange::default());
        let order = service
            .create_order("INX-2024", Side::Yes, 60, None)
            .await
            .unwrap();

        let cancelled = service.cancel_order(order.id).await.unwrap();
        assert_eq!(cancelled.status(), OrderStatus::Cancelled);

        let second = service.cancel_order(order.id).await;
        assert!(matches!(second, Err(OrderError::InvalidTransition { .. })));

        let active = service.active_orders().await.unwrap();
        assert!(active.is_empty());
    }

    #[tokio::test]
    async fn test_active_orders_filters_terminal_states() {
        let service = service_with(FakeExchange::default());
        let keep = service
            .create_order("A", Side::Yes, 60, None)
            .await
            .unwrap();
        let drop = service.create_order("B", Side::No, 40, None).await.unwrap();
        service.cancel_order(drop.id).await.unwrap();

        let active = service.active_orders().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, keep.id);
    }

    #[tokio::test]
    async fn test_execute_submits_full_position_sell() {
        let exchange = Arc::new(FakeExchange::with_position("INX-2024", -25));
        let service = StopOrderService::new(
            Arc::new(MemoryOrderRepository::new()),
            exchange.clone(),
        );
        let order = service
            .create_order("INX-2024", Side::No, 40, None)
            .await
            .unwrap();

        let executed = service.execute_order(order.id, false).await.unwrap();
        assert_eq!(executed.status(), OrderStatus::Triggered);

        let submitted = exchange.submitted_orders();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].action, exchange_core::api::OrderAction::Sell);
        assert_eq!(submitted[0].count, 25);
        assert_eq!(submitted[0].client_order_id, order.id.to_string());
    }

    #[tokio::test]
    async fn test_execute_without_position_fails() {
        let service = service_with(FakeExchange::default());
        let order = service
            .create_order("INX-2024", Side::Yes, 60, None)
            .await
            .unwrap();

        let result = service.execute_order(order.id, false).await;
        assert!(matches!(result, Err(OrderError::NoPosition { .. })));
    }

    #[tokio::test]
    async fn test_execute_treats_flat_position_as_missing() {
        let service = service_with(FakeExchange::with_position("INX-2024", 0));
        let order = service
            .create_order("INX-2024", Side::Yes, 60, None)
            .await
            .unwrap();

        let result = service.execute_order(order.id, false).await;
        assert!(matches!(result, Err(OrderError::NoPosition { .. })));
    }

    #[tokio::test]
    async fn test_exchange_failure_aborts_before_transition() {
        let mut exchange = FakeExchange::with_position("INX-2024", 10);
        exchange.fail_submission = true;
        let service = service_with(exchange);
        let order = service
            .create_order("INX-2024", Side::Yes, 60, None)
            .await
            .unwrap();

        let result = service.execute_order(order.id, false).await;
        assert!(matches!(result, Err(OrderError::Exchange(_))));

        // Still active: safe to retry on the next monitor tick.
        let active = service.active_orders().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].status(), OrderStatus::Active);
    }

    #[tokio::test]
    async fn test_dry_run_transitions_without_submission() {
        let exchange = Arc::new(FakeExchange::with_position("INX-2024", 10));
        let service = StopOrderService::new(
            Arc::new(MemoryOrderRepository::new()),
            exchange.clone(),
        );
        let order = service
            .create_order("INX-2024", Side::Yes, 60, None)
            .await
            .unwrap();

        let executed = service.execute_order(order.id, true).await.unwrap();
        assert_eq!(executed.status(), OrderStatus::Triggered);
        assert!(exchange.submitted_orders().is_empty());
    }

    #[tokio::test]
    async fn test_execute_uses_limit_price_when_present() {
        let exchange = Arc::new(FakeExchange::with_position("INX-2024", 10));
        let service = StopOrderService::new(
            Arc::new(MemoryOrderRepository::new()),
            exchange.clone(),
        );
        let order = service
            .create_order("INX-2024", Side::Yes, 60, Some(55))
            .await
            .unwrap();

        service.execute_order(order.id, false).await.unwrap();

        let submitted = exchange.submitted_orders();
        assert_eq!(submitted[0].order_type, exchange_core::api::OrderType::Limit);
        assert_eq!(submitted[0].yes_price, Some(55));
    }
}
