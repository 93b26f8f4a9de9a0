//! PostgreSQL-backed stop-order repository.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::path::Path;
use tracing::debug;
use uuid::Uuid;

use crate::repo::OrderRepository;
use crate::stop_order::{OrderStatus, StopOrder};
use exchange_core::config::DatabaseConfig;
use exchange_core::types::{ContractPrice, Side};

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.url)
        .await?;

    Ok(pool)
}

/// Run database migrations from the migrations directory.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let migrator = sqlx::migrate::Migrator::new(Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    Ok(())
}

/// Durable repository for stop orders.
pub struct PgOrderRepository {
    pool: PgPool,
}

impl PgOrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Convert a database row to a StopOrder.
    fn row_to_order(row: &PgRow) -> Result<StopOrder> {
        let trigger_price: i64 = row.get("trigger_price");
        let limit_price: Option<i64> = row.get("limit_price");
        let status_id: i16 = row.get("status");
        let side: String = row.get("side");
        let created_at: DateTime<Utc> = row.get("created_at");
        let updated_at: DateTime<Utc> = row.get("updated_at");

        Ok(StopOrder::from_parts(
            row.get("id"),
            row.get("ticker"),
            parse_side(&side)?,
            ContractPrice::new(trigger_price)?,
            limit_price.map(ContractPrice::new).transpose()?,
            status_from_id(status_id)?,
            created_at,
            updated_at,
        ))
    }
}

#[async_trait]
impl OrderRepository for PgOrderRepository {
    async fn get_by_id(&self, id: Uuid) -> Result<Option<StopOrder>> {
        let row = sqlx::query(
            r#"
            SELECT id, ticker, side, trigger_price, limit_price, status, created_at, updated_at
            FROM stop_orders
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_order).transpose()
    }

    async fn get_all(&self) -> Result<Vec<StopOrder>> {
        let rows = sqlx::query(
            r#"
            SELECT id, ticker, side, trigger_price, limit_price, status, created_at, updated_at
            FROM stop_orders
            ORDER BY created_at ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_order).collect()
    }

    async fn persist(&self, order: &StopOrder) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO stop_orders (
                id, ticker, side, trigger_price, limit_price, status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                trigger_price = EXCLUDED.trigger_price,
                limit_price = EXCLUDED.limit_price,
                status = EXCLUDED.status,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(order.id)
        .bind(&order.ticker)
        .bind(side_to_str(order.side))
        .bind(order.trigger_price().value())
        .bind(order.limit_price().map(|p| p.value()))
        .bind(status_to_id(order.status()))
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        debug!(order_id = %order.id, status = %order.status(), "Persisted stop order");
        Ok(())
    }
}

fn side_to_str(side: Side) -> &'static str {
    match side {
        Side::Yes => "yes",
        Side::No => "no",
    }
}

fn parse_side(raw: &str) -> Result<Side> {
    match raw {
        "yes" => Ok(Side::Yes),
        "no" => Ok(Side::No),
        other => anyhow::bail!("unknown side column value: {other}"),
    }
}

fn status_to_id(status: OrderStatus) -> i16 {
    match status {
        OrderStatus::Active => 0,
        OrderStatus::Triggered => 1,
        OrderStatus::Cancelled => 2,
        OrderStatus::Expired => 3,
    }
}

fn status_from_id(id: i16) -> Result<OrderStatus> {
    match id {
        0 => Ok(OrderStatus::Active),
        1 => Ok(OrderStatus::Triggered),
        2 => Ok(OrderStatus::Cancelled),
        3 => Ok(OrderStatus::Expired),
        other => anyhow::bail!("unknown status column value: {other}"),
    }
}
