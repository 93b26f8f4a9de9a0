//! Error types for the stop-order engine core.

use thiserror::Error;

use crate::types::InvalidPrice;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Exchange API error: {message}")]
    Api {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    #[error("Authentication error: {message}")]
    Auth { message: String },

    #[error("Signing error: {message}")]
    Signing { message: String },

    #[error("Market not found: {ticker}")]
    MarketNotFound { ticker: String },

    #[error(transparent)]
    InvalidPrice(#[from] InvalidPrice),
}

pub type Result<T> = std::result::Result<T, Error>;
