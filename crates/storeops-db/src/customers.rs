//! Database operations for the `customers` table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use storeops_core::{CustomerHistory, OrderStatus, OrderSummary};

use crate::{orders, DbError};

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `customers` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CustomerRow {
    pub id: i64,
    pub public_id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const CUSTOMER_COLUMNS: &str =
    "id, public_id, email, name, phone, city, country, created_at, updated_at";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns every customer. The analytics endpoints score the full population,
/// so there is no pagination here.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_customers(pool: &PgPool) -> Result<Vec<CustomerRow>, DbError> {
    let rows = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single customer by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_customer_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<CustomerRow>, DbError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE public_id = $1",
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a customer and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails (including unique email
/// violations).
pub async fn create_customer(
    pool: &PgPool,
    email: &str,
    name: &str,
    phone: Option<&str>,
    city: Option<&str>,
    country: Option<&str>,
) -> Result<CustomerRow, DbError> {
    let row = sqlx::query_as::<_, CustomerRow>(&format!(
        "INSERT INTO customers (email, name, phone, city, country) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CUSTOMER_COLUMNS}",
    ))
    .bind(email)
    .bind(name)
    .bind(phone)
    .bind(city)
    .bind(country)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

// ---------------------------------------------------------------------------
// Analytics input assembly
// ---------------------------------------------------------------------------

/// Assemble [`CustomerHistory`] inputs for the analytics engine from a set of
/// customer rows: one batch order query, grouped in memory — never a query
/// per customer.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the order query fails, or
/// [`DbError::UnexpectedValue`] if a stored order status is not a known
/// variant.
pub async fn load_customer_histories(
    pool: &PgPool,
    customers: &[CustomerRow],
) -> Result<Vec<CustomerHistory>, DbError> {
    let ids: Vec<i64> = customers.iter().map(|c| c.id).collect();
    let mut orders_by_customer = orders::list_orders_for_customers(pool, &ids).await?;

    customers
        .iter()
        .map(|customer| {
            let order_rows = orders_by_customer.remove(&customer.id).unwrap_or_default();
            let orders = order_rows
                .into_iter()
                .map(|row| {
                    let status = OrderStatus::parse(&row.status).ok_or_else(|| {
                        DbError::UnexpectedValue {
                            column: "orders.status".to_string(),
                            value: row.status.clone(),
                        }
                    })?;
                    Ok(OrderSummary {
                        created_at: row.created_at,
                        total: row.total,
                        status,
                    })
                })
                .collect::<Result<Vec<_>, DbError>>()?;

            Ok(CustomerHistory {
                customer_id: customer.public_id,
                name: customer.name.clone(),
                email: customer.email.clone(),
                created_at: customer.created_at,
                orders,
            })
        })
        .collect()
}
