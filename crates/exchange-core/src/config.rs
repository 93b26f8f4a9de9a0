//! Configuration management for the stop-order engine.

use crate::{Error, Result};
use serde::Deserialize;
use std::env;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub exchange: ExchangeConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExchangeConfig {
    /// Base URL override; the client default is used when absent.
    pub api_base: Option<String>,
    /// Access-key identifier sent with every signed request.
    pub access_key: String,
    /// Path to the operator's RSA private key (PEM).
    pub private_key_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Cadence of both monitor loops, in seconds.
    pub poll_interval_secs: u64,
    /// When set, triggered orders transition state without submitting to the exchange.
    pub dry_run: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            exchange: ExchangeConfig {
                api_base: env::var("EXCHANGE_API_BASE").ok(),
                access_key: env::var("EXCHANGE_ACCESS_KEY").map_err(|_| Error::Config {
                    message: "EXCHANGE_ACCESS_KEY environment variable not set".to_string(),
                })?,
                private_key_path: env::var("EXCHANGE_PRIVATE_KEY_PATH").map_err(|_| {
                    Error::Config {
                        message: "EXCHANGE_PRIVATE_KEY_PATH environment variable not set"
                            .to_string(),
                    }
                })?,
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").map_err(|_| Error::Config {
                    message: "DATABASE_URL environment variable not set".to_string(),
                })?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            engine: EngineConfig {
                poll_interval_secs: env::var("MONITOR_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                dry_run: env::var("DRY_RUN")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(false),
            },
        })
    }
}
