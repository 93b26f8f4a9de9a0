//! Generalized trigger model: a price condition paired with order actions.
//!
//! A stop order is the STOP specialization: one BELOW condition and one
//! SELL action on the same contract. The model leaves room for future
//! trigger types without touching the stop-order aggregate.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::OrderError;
use crate::stop_order::OrderStatus;
use exchange_core::types::{ContractIdentifier, ContractPrice};

/// Kind of trigger. Only STOP exists today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Stop,
}

/// Breach direction for a price condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Above,
    Below,
}

/// Side of the order an action submits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSide {
    Buy,
    Sell,
}

/// "Watch price X of contract Y" half of a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerCondition {
    pub contract: ContractIdentifier,
    pub threshold: ContractPrice,
    pub direction: Direction,
}

/// "Submit this order on breach" half of a trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerAction {
    pub contract: ContractIdentifier,
    pub side: ActionSide,
    /// Contract count; absent = full position.
    pub count: Option<u32>,
    pub limit_price: Option<ContractPrice>,
}

/// A condition and the actions taken on breach.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trigger {
    pub id: Uuid,
    pub trigger_type: TriggerType,
    pub status: OrderStatus,
    pub condition: TriggerCondition,
    pub actions: Vec<TriggerAction>,
    pub created_at: DateTime<Utc>,
}

/// A limit price more than 10% below the threshold is rejected as a
/// slippage guard.
const MAX_LIMIT_DISCOUNT: Decimal = Decimal::from_parts(9, 0, 0, false, 1); // 0.9

impl Trigger {
    /// Construct and validate a STOP trigger: sell the contract once its
    /// price drops below the threshold.
    pub fn new_stop(
        contract: ContractIdentifier,
        trigger_price: ContractPrice,
        limit_price: Option<ContractPrice>,
    ) -> Result<Self, OrderError> {
        let trigger = Self {
            id: Uuid::new_v4(),
            trigger_type: TriggerType::Stop,
            status: OrderStatus::Active,
            condition: TriggerCondition {
                contract: contract.clone(),
                threshold: trigger_price,
                direction: Direction::Below,
            },
            actions: vec![TriggerAction {
                contract,
                side: ActionSide::Sell,
                count: None,
                limit_price,
            }],
            created_at: Utc::now(),
        };
        trigger.validate()?;
        Ok(trigger)
    }

    /// Check the STOP invariants. Status and price ranges are enforced by
    /// the type system; everything structural is checked here.
    pub fn validate(&self) -> Result<(), OrderError> {
        let TriggerType::Stop = self.trigger_type;

        if self.condition.direction != Direction::Below {
            return Err(invalid("a stop trigger must watch for a drop below its threshold"));
        }
        if self.actions.len() != 1 {
            return Err(invalid(format!(
                "a stop trigger takes exactly one action, found {}",
                self.actions.len()
            )));
        }

        let action = &self.actions[0];
        if action.side != ActionSide::Sell {
            return Err(invalid("a stop trigger must sell, not buy"));
        }
        if action.contract != self.condition.contract {
            return Err(invalid(format!(
                "action targets {}/{} but the condition watches {}/{}",
                action.contract.ticker,
                action.contract.side,
                self.condition.contract.ticker,
                self.condition.contract.side
            )));
        }

        if let Some(limit) = action.limit_price {
            let floor = Decimal::from(self.condition.threshold.value()) * MAX_LIMIT_DISCOUNT;
            if Decimal::from(limit.value()) < floor {
                return Err(invalid(format!(
                    "limit price {} is more than 10% below the {} threshold",
                    limit, self.condition.threshold
                )));
            }
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> OrderError {
    OrderError::InvalidTrigger {
        message: message.into(),
    }
}
