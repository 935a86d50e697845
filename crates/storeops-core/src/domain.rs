//! Shared domain types for the analytics engine.
//!
//! Analytics functions take plain in-memory order histories so they stay pure:
//! the db crate loads [`CustomerHistory`] rows, the functions here never touch
//! the database.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Processing,
    Completed,
    Cancelled,
    Refunded,
}

impl OrderStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Cancelled => "CANCELLED",
            OrderStatus::Refunded => "REFUNDED",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(OrderStatus::Pending),
            "PROCESSING" => Some(OrderStatus::Processing),
            "COMPLETED" => Some(OrderStatus::Completed),
            "CANCELLED" => Some(OrderStatus::Cancelled),
            "REFUNDED" => Some(OrderStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which orders count toward recency/frequency/monetary metrics.
///
/// Every analytics entry point takes this explicitly; callers decide the
/// policy once instead of each function guessing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OrderFilter {
    /// Only `COMPLETED` orders qualify.
    #[default]
    CompletedOnly,
    /// Every order qualifies regardless of status.
    All,
}

impl OrderFilter {
    #[must_use]
    pub fn qualifies(self, status: OrderStatus) -> bool {
        match self {
            OrderFilter::CompletedOnly => status == OrderStatus::Completed,
            OrderFilter::All => true,
        }
    }
}

/// The slice of an order the analytics engine needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderSummary {
    pub created_at: DateTime<Utc>,
    pub total: Decimal,
    pub status: OrderStatus,
}

/// A customer plus their full order history, as loaded by the db crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerHistory {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub orders: Vec<OrderSummary>,
}

impl CustomerHistory {
    /// Qualifying orders under the given filter, sorted oldest first.
    #[must_use]
    pub fn qualifying_orders(&self, filter: OrderFilter) -> Vec<&OrderSummary> {
        let mut orders: Vec<&OrderSummary> = self
            .orders
            .iter()
            .filter(|o| filter.qualifies(o.status))
            .collect();
        orders.sort_by_key(|o| o.created_at);
        orders
    }
}

/// Metrics derived from an order history. Never persisted; recomputed per
/// request from the order rows.
#[derive(Debug, Clone, Serialize)]
pub struct CustomerMetrics {
    pub total_orders: u64,
    pub lifetime_value: Decimal,
    pub average_order_value: Decimal,
    pub last_order_date: Option<DateTime<Utc>>,
}

impl CustomerMetrics {
    #[must_use]
    pub fn from_orders(orders: &[&OrderSummary]) -> Self {
        let total_orders = orders.len() as u64;
        let lifetime_value: Decimal = orders.iter().map(|o| o.total).sum();
        let average_order_value = if total_orders > 0 {
            lifetime_value / Decimal::from(total_orders)
        } else {
            Decimal::ZERO
        };
        let last_order_date = orders.iter().map(|o| o.created_at).max();

        Self {
            total_orders,
            lifetime_value,
            average_order_value,
            last_order_date,
        }
    }
}

/// Whole days elapsed from `then` to `reference`; clamped at zero so clock
/// skew between writers never yields negative recency.
#[must_use]
pub fn days_between(then: DateTime<Utc>, reference: DateTime<Utc>) -> i64 {
    (reference - then).num_days().max(0)
}
