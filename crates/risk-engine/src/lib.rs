//! Risk Engine
//!
//! Stop-order lifecycle management: the order aggregate and its state
//! machine, the generalized trigger model, persistence, and the service
//! that executes triggered orders against the exchange.

pub mod error;
pub mod pg_repo;
pub mod repo;
pub mod service;
pub mod stop_order;
pub mod trigger;

pub use error::OrderError;
pub use repo::{MemoryOrderRepository, OrderRepository};
pub use service::StopOrderService;
pub use stop_order::{OrderStatus, StopOrder};
