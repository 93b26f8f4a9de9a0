//! Stop-Order Monitor
//!
//! Background automation for a prediction-market portfolio: keeps every
//! open position covered by a protective stop order and closes positions
//! whose market price breaches the trigger.

mod order_monitor;
mod position_monitor;
mod shutdown;
#[cfg(test)]
mod testkit;

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exchange_core::api::{ExchangeApi, KalshiClient};
use exchange_core::config::Config;
use exchange_core::signing::RequestSigner;
use risk_engine::{pg_repo, OrderRepository, StopOrderService};

use order_monitor::OrderMonitor;
use position_monitor::PositionMonitor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "stop_monitor=info,risk_engine=info,exchange_core=warn,hyper=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting stop-order monitor");

    let config = Config::from_env()?;

    let pool = pg_repo::create_pool(&config.database).await?;
    pg_repo::run_migrations(&pool).await?;
    let repo: Arc<dyn OrderRepository> = Arc::new(pg_repo::PgOrderRepository::new(pool));

    let signer = RequestSigner::from_pem_file(
        config.exchange.access_key.clone(),
        &config.exchange.private_key_path,
    )?;
    let exchange: Arc<dyn ExchangeApi> =
        Arc::new(KalshiClient::new(config.exchange.api_base.clone(), signer));

    let service = Arc::new(StopOrderService::new(repo, exchange.clone()));

    let interval = Duration::from_secs(config.engine.poll_interval_secs);
    if config.engine.dry_run {
        info!("Dry run enabled: triggered orders will not be submitted to the exchange");
    }

    let order_monitor = OrderMonitor::new(
        service.clone(),
        exchange.clone(),
        interval,
        config.engine.dry_run,
    )
    .spawn();
    let position_monitor = PositionMonitor::new(service, exchange, interval).spawn();

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping monitors");

    order_monitor.stop();
    position_monitor.stop();
    order_monitor.join().await;
    position_monitor.join().await;

    Ok(())
}
