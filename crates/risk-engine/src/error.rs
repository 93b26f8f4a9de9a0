//! Error taxonomy for stop-order operations.

use thiserror::Error;
use uuid::Uuid;

use crate::stop_order::OrderStatus;
use exchange_core::types::InvalidPrice;

#[derive(Error, Debug)]
pub enum OrderError {
    #[error(transparent)]
    InvalidPrice(#[from] InvalidPrice),

    #[error("invalid trigger: {message}")]
    InvalidTrigger { message: String },

    #[error("stop order {id} not found")]
    NotFound { id: Uuid },

    #[error("no open position for ticker {ticker}")]
    NoPosition { ticker: String },

    #[error("invalid transition: order is {current}, cannot move to {requested}")]
    InvalidTransition {
        current: OrderStatus,
        requested: OrderStatus,
    },

    #[error("order is {status}, mutable only while active")]
    NotActive { status: OrderStatus },

    #[error("exchange error: {0}")]
    Exchange(#[from] exchange_core::Error),

    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}
