//! Stop-order aggregate and its lifecycle state machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::OrderError;
use exchange_core::types::{ContractPrice, Side};

/// Lifecycle status of a stop order.
///
/// ACTIVE is the only non-terminal state. Terminal orders are retained for
/// audit, never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Active,
    Triggered,
    Cancelled,
    Expired,
}

impl OrderStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Active)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Active => "active",
            OrderStatus::Triggered => "triggered",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        };
        write!(f, "{}", name)
    }
}

/// A standing instruction to close a position once its bid falls below a
/// threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopOrder {
    pub id: Uuid,
    pub ticker: String,
    pub side: Side,
    trigger_price: ContractPrice,
    /// Price floor for the closing order; absent = market order.
    limit_price: Option<ContractPrice>,
    status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StopOrder {
    /// Create a new ACTIVE stop order.
    pub fn new(
        ticker: String,
        side: Side,
        trigger_price: ContractPrice,
        limit_price: Option<ContractPrice>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ticker,
            side,
            trigger_price,
            limit_price,
            status: OrderStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Reassemble a persisted order. Repository use only.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parts(
        id: Uuid,
        ticker: String,
        side: Side,
        trigger_price: ContractPrice,
        limit_price: Option<ContractPrice>,
        status: OrderStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            ticker,
            side,
            trigger_price,
            limit_price,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    pub fn trigger_price(&self) -> ContractPrice {
        self.trigger_price
    }

    pub fn limit_price(&self) -> Option<ContractPrice> {
        self.limit_price
    }

    /// Mark the order as executed.
    pub fn trigger(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Triggered)
    }

    /// Withdraw the order.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Cancelled)
    }

    /// Retire the order without execution.
    pub fn expire(&mut self) -> Result<(), OrderError> {
        self.transition(OrderStatus::Expired)
    }

    /// Update the trigger threshold. Only legal while ACTIVE.
    pub fn set_trigger_price(&mut self, price: ContractPrice) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.trigger_price = price;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Update the limit price. Only legal while ACTIVE.
    pub fn set_limit_price(&mut self, price: Option<ContractPrice>) -> Result<(), OrderError> {
        self.ensure_active()?;
        self.limit_price = price;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// The only legal transitions are ACTIVE to a terminal state.
    fn transition(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        if self.status.is_terminal() || !next.is_terminal() {
            return Err(OrderError::InvalidTransition {
                current: self.status,
                requested: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), OrderError> {
        if !self.is_active() {
            return Err(OrderError::NotActive {
                status: self.status,
            });
        }
        Ok(())
    }
}
