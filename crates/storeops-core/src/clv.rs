//! Customer lifetime value projection.
//!
//! The projection is deliberately simple: expected future purchasing over a
//! configured horizon, damped exponentially by how long the customer has been
//! quiet. No fitted model, just the configured business rules.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{days_between, CustomerHistory, OrderFilter};
use crate::thresholds::ClvConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSegment {
    High,
    Medium,
    Low,
}

impl ValueSegment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSegment::High => "high",
            ValueSegment::Medium => "medium",
            ValueSegment::Low => "low",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "high" => Some(ValueSegment::High),
            "medium" => Some(ValueSegment::Medium),
            "low" => Some(ValueSegment::Low),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClvProjection {
    pub customer_id: Uuid,
    pub name: String,
    /// Summed qualifying order totals to date.
    pub current_value: Decimal,
    /// Current value plus the projected future component. Strictly exceeds
    /// `current_value` whenever the customer has at least one qualifying
    /// order with a positive total.
    pub ltv: f64,
    pub average_order_value: Decimal,
    pub orders_per_month: f64,
    pub recency_days: i64,
    /// 0–100 score that grows with the recency gap.
    pub churn_risk: f64,
    pub value_segment: ValueSegment,
}

/// Project lifetime value for every customer with at least one qualifying
/// order. Zero-order customers are excluded, matching the RFM scorer.
#[must_use]
pub fn project_clv(
    customers: &[CustomerHistory],
    reference: DateTime<Utc>,
    filter: OrderFilter,
    config: &ClvConfig,
) -> Vec<ClvProjection> {
    customers
        .iter()
        .filter_map(|customer| project_one(customer, reference, filter, config))
        .collect()
}

fn project_one(
    customer: &CustomerHistory,
    reference: DateTime<Utc>,
    filter: OrderFilter,
    config: &ClvConfig,
) -> Option<ClvProjection> {
    let orders = customer.qualifying_orders(filter);
    let last = orders.last()?;

    let frequency = orders.len() as u64;
    let current_value: Decimal = orders.iter().map(|o| o.total).sum();
    let average_order_value = current_value / Decimal::from(frequency);

    let recency_days = days_between(last.created_at, reference);
    let account_age_days = days_between(customer.created_at, reference).max(1);
    let account_age_months = (account_age_days as f64 / 30.44).max(1.0);
    let orders_per_month = frequency as f64 / account_age_months;

    // Future component: expected orders over the horizon at the historical
    // cadence, scaled by e^(-recency/decay). The factor never reaches zero,
    // so any paying customer projects above their current value.
    let retention = (-(recency_days as f64) / config.recency_decay_days).exp();
    let projected_future = average_order_value.to_f64().unwrap_or(0.0)
        * orders_per_month
        * config.horizon_months
        * retention;

    let current_value_f64 = current_value.to_f64().unwrap_or(0.0);
    let ltv = current_value_f64 + projected_future;

    let churn_risk = (recency_days as f64 / config.churn_window_days * 100.0).clamp(0.0, 100.0);

    let value_segment = if current_value >= Decimal::from(config.high_value_min) {
        ValueSegment::High
    } else if current_value >= Decimal::from(config.medium_value_min) {
        ValueSegment::Medium
    } else {
        ValueSegment::Low
    };

    Some(ClvProjection {
        customer_id: customer.customer_id,
        name: customer.name.clone(),
        current_value,
        ltv,
        average_order_value,
        orders_per_month,
        recency_days,
        churn_risk,
        value_segment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderStatus, OrderSummary};
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap()
    }

    fn customer(name: &str, created_days_ago: i64, orders: Vec<OrderSummary>) -> CustomerHistory {
        CustomerHistory {
            customer_id: Uuid::new_v4(),
            name: name.to_string(),
            email: format!("{}@test.com", name.to_lowercase().replace(' ', "-")),
            created_at: reference() - chrono::Duration::days(created_days_ago),
            orders,
        }
    }

    fn completed(days_ago: i64, total: i64) -> OrderSummary {
        OrderSummary {
            created_at: reference() - chrono::Duration::days(days_ago),
            total: Decimal::from(total),
            status: OrderStatus::Completed,
        }
    }

    #[test]
    fn ltv_exceeds_current_value_for_active_customer() {
        let customers = vec![customer(
            "High Value",
            720,
            vec![completed(354, 1_000), completed(202, 1_500), completed(19, 2_000)],
        )];

        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );

        assert_eq!(projections.len(), 1);
        assert_eq!(projections[0].current_value, Decimal::from(4_500));
        assert!(
            projections[0].ltv > 4_500.0,
            "ltv {} should exceed current value",
            projections[0].ltv
        );
    }

    #[test]
    fn ltv_exceeds_current_value_even_when_stale() {
        // Last order over 500 days back; decay shrinks the projection but
        // never zeroes it.
        let customers = vec![customer("Dormant", 900, vec![completed(540, 800)])];
        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );
        assert!(projections[0].ltv > 800.0);
    }

    #[test]
    fn churn_risk_grows_with_recency_gap() {
        let customers = vec![
            customer("Fresh", 720, vec![completed(5, 500)]),
            customer("Stale", 720, vec![completed(170, 500)]),
        ];
        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );

        let fresh = &projections[0];
        let stale = &projections[1];
        assert!(stale.churn_risk > fresh.churn_risk);
        assert!(stale.churn_risk > 0.0);
        assert!(stale.churn_risk <= 100.0);
    }

    #[test]
    fn churn_risk_saturates_at_one_hundred() {
        let customers = vec![customer("Gone", 900, vec![completed(500, 500)])];
        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );
        assert!((projections[0].churn_risk - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn value_segments_split_on_absolute_spend() {
        let high_orders: Vec<OrderSummary> = (0..20).map(|i| completed(10 + i, 1_000)).collect();
        let customers = vec![
            customer("High Spender", 720, high_orders),
            customer("Mid Spender", 360, vec![completed(19, 1_200)]),
            customer("Low Spender", 360, vec![completed(19, 50)]),
        ];

        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );

        assert_eq!(projections[0].value_segment, ValueSegment::High);
        assert_eq!(projections[1].value_segment, ValueSegment::Medium);
        assert_eq!(projections[2].value_segment, ValueSegment::Low);
    }

    #[test]
    fn zero_order_customers_are_excluded() {
        let customers = vec![customer("Browser", 100, vec![])];
        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::All,
            &ClvConfig::default(),
        );
        assert!(projections.is_empty());
    }

    #[test]
    fn cancelled_orders_do_not_count_under_completed_only() {
        let mut cancelled = completed(10, 5_000);
        cancelled.status = OrderStatus::Cancelled;
        let customers = vec![customer(
            "Mixed",
            360,
            vec![cancelled, completed(30, 200)],
        )];

        let projections = project_clv(
            &customers,
            reference(),
            OrderFilter::CompletedOnly,
            &ClvConfig::default(),
        );
        assert_eq!(projections[0].current_value, Decimal::from(200));
        assert_eq!(projections[0].recency_days, 30);
    }
}
