//! Core domain types for the stop-order engine.

pub mod market;
pub mod position;
pub mod price;

pub use market::*;
pub use position::*;
pub use price::*;
