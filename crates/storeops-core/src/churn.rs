//! Churn prediction from order recency and spend-trend signals.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{days_between, CustomerHistory, OrderFilter, OrderSummary};
use crate::thresholds::ChurnHeuristics;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChurnRisk {
    Low,
    Medium,
    High,
}

impl ChurnRisk {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ChurnRisk::Low => "low",
            ChurnRisk::Medium => "medium",
            ChurnRisk::High => "high",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(ChurnRisk::Low),
            "medium" => Some(ChurnRisk::Medium),
            "high" => Some(ChurnRisk::High),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChurnRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChurnPrediction {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    pub recency_days: i64,
    pub lifetime_value: Decimal,
    /// 0–100.
    pub churn_probability: f64,
    pub churn_risk: ChurnRisk,
    /// Human-readable signals, most significant first.
    pub risk_factors: Vec<String>,
    /// Estimated date the customer lapses for good, when their order history
    /// is regular enough to extrapolate (requires at least two orders).
    pub predicted_churn_date: Option<DateTime<Utc>>,
}

/// Predict churn for customers whose most recent qualifying order is strictly
/// older than `lookback_days`. Recently active customers are never returned.
#[must_use]
pub fn predict_churn(
    customers: &[CustomerHistory],
    reference: DateTime<Utc>,
    lookback_days: i64,
    filter: OrderFilter,
    heuristics: &ChurnHeuristics,
) -> Vec<ChurnPrediction> {
    let mut predictions: Vec<ChurnPrediction> = customers
        .iter()
        .filter_map(|customer| predict_one(customer, reference, lookback_days, filter, heuristics))
        .collect();
    predictions.sort_by(|a, b| {
        b.churn_probability
            .partial_cmp(&a.churn_probability)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    predictions
}

fn predict_one(
    customer: &CustomerHistory,
    reference: DateTime<Utc>,
    lookback_days: i64,
    filter: OrderFilter,
    heuristics: &ChurnHeuristics,
) -> Option<ChurnPrediction> {
    let orders = customer.qualifying_orders(filter);
    let last = orders.last()?;

    let recency_days = days_between(last.created_at, reference);
    if recency_days <= lookback_days {
        return None;
    }

    let mean_interval = mean_interval_days(&orders);
    let cadence_declined = mean_interval
        .is_some_and(|interval| recency_days as f64 > interval * heuristics.cadence_decline_ratio);
    let spend_declined = latest_below_prior_average(&orders);

    let overdue = (recency_days - lookback_days) as f64;
    let mut probability =
        heuristics.base_probability + overdue / heuristics.recency_ramp_days * (100.0 - heuristics.base_probability);
    if spend_declined {
        probability += heuristics.spend_decline_penalty;
    }
    if cadence_declined {
        probability += heuristics.cadence_decline_penalty;
    }
    let probability = probability.clamp(0.0, 100.0);

    let churn_risk = if probability >= heuristics.high_cutoff {
        ChurnRisk::High
    } else if probability >= heuristics.medium_cutoff {
        ChurnRisk::Medium
    } else {
        ChurnRisk::Low
    };

    let mut risk_factors = vec![format!("No purchase in {recency_days} days")];
    if cadence_declined {
        risk_factors.push("Order frequency declined".to_string());
    }
    if spend_declined {
        risk_factors.push("Average order value decreased".to_string());
    }

    let predicted_churn_date = mean_interval.map(|interval| {
        let grace = interval as i64 * heuristics.churn_date_interval_multiplier;
        last.created_at + Duration::days(grace)
    });

    let lifetime_value: Decimal = orders.iter().map(|o| o.total).sum();

    Some(ChurnPrediction {
        customer_id: customer.customer_id,
        name: customer.name.clone(),
        email: customer.email.clone(),
        recency_days,
        lifetime_value,
        churn_probability: probability,
        churn_risk,
        risk_factors,
        predicted_churn_date,
    })
}

/// Mean days between consecutive orders; `None` with fewer than two orders.
fn mean_interval_days(orders: &[&OrderSummary]) -> Option<f64> {
    if orders.len() < 2 {
        return None;
    }
    let first = orders.first()?.created_at;
    let last = orders.last()?.created_at;
    let span_days = (last - first).num_days().max(0);
    Some(span_days as f64 / (orders.len() - 1) as f64)
}

/// True when the most recent order total is below the average of everything
/// before it.
fn latest_below_prior_average(orders: &[&OrderSummary]) -> bool {
    let Some((latest, prior)) = orders.split_last() else {
        return false;
    };
    if prior.is_empty() {
        return false;
    }
    let prior_total: Decimal = prior.iter().map(|o| o.total).sum();
    let prior_average = prior_total / Decimal::from(prior.len() as u64);
    latest.total < prior_average
}
