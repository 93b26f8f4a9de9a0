//! Stop-order persistence contract and the in-memory implementation.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::stop_order::StopOrder;

/// Durable store for stop orders, keyed by order id.
///
/// `persist` has upsert semantics: insert if new, update otherwise. The
/// store is assumed to serialize conflicting writes to the same order.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StopOrder>>;
    async fn get_all(&self) -> Result<Vec<StopOrder>>;
    async fn persist(&self, order: &StopOrder) -> Result<()>;
}

/// Process-local repository backed by a concurrent map.
///
/// Used by tests and dry-run operation; nothing survives a restart.
#[derive(Default)]
pub struct MemoryOrderRepository {
    orders: DashMap<Uuid, StopOrder>,
}

impl MemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for MemoryOrderRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StopOrder>> {
        Ok(self.orders.get(&id).map(|o| o.clone()))
    }

    async fn get_all(&self) -> Result<Vec<StopOrder>> {
        Ok(self.orders.iter().map(|e| e.value().clone()).collect())
    }

    async fn persist(&self, order: &StopOrder) -> Result<()> {
        self.orders.insert(order.id, order.clone());
        Ok(())
    }
}
