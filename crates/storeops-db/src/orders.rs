//! Database operations for the `orders` table.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `orders` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OrderRow {
    pub id: i64,
    pub public_id: Uuid,
    pub customer_id: i64,
    pub total: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

const ORDER_COLUMNS: &str = "id, public_id, customer_id, total, status, created_at";

/// Returns all orders for a single customer, oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders_for_customer(
    pool: &PgPool,
    customer_id: i64,
) -> Result<Vec<OrderRow>, DbError> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = $1 ORDER BY created_at",
    ))
    .bind(customer_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Batch-loads orders for a set of customers, grouped by customer id. One
/// query regardless of how many customers are being scored.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_orders_for_customers(
    pool: &PgPool,
    customer_ids: &[i64],
) -> Result<HashMap<i64, Vec<OrderRow>>, DbError> {
    if customer_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE customer_id = ANY($1) ORDER BY created_at",
    ))
    .bind(customer_ids)
    .fetch_all(pool)
    .await?;

    let mut grouped: HashMap<i64, Vec<OrderRow>> = HashMap::new();
    for row in rows {
        grouped.entry(row.customer_id).or_default().push(row);
    }
    Ok(grouped)
}

/// Creates an order and returns the full inserted row. `created_at` is
/// caller-supplied so seed data can backdate history.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_order(
    pool: &PgPool,
    customer_id: i64,
    total: Decimal,
    status: &str,
    created_at: DateTime<Utc>,
) -> Result<OrderRow, DbError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "INSERT INTO orders (customer_id, total, status, created_at) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {ORDER_COLUMNS}",
    ))
    .bind(customer_id)
    .bind(total)
    .bind(status)
    .bind(created_at)
    .fetch_one(pool)
    .await?;
    Ok(row)
}
