//! RFM (recency / frequency / monetary) scoring and segment classification.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{days_between, CustomerHistory, OrderFilter};
use crate::thresholds::RfmThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RfmSegment {
    Champions,
    Loyal,
    New,
    AtRisk,
    Lost,
    Regular,
}

impl RfmSegment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RfmSegment::Champions => "CHAMPIONS",
            RfmSegment::Loyal => "LOYAL",
            RfmSegment::New => "NEW",
            RfmSegment::AtRisk => "AT_RISK",
            RfmSegment::Lost => "LOST",
            RfmSegment::Regular => "REGULAR",
        }
    }
}

impl std::fmt::Display for RfmSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One customer's RFM score row.
#[derive(Debug, Clone, Serialize)]
pub struct RfmScore {
    pub customer_id: Uuid,
    pub name: String,
    pub email: String,
    /// Days from the reference date to the most recent qualifying order.
    pub recency_days: i64,
    /// Count of qualifying orders.
    pub frequency: u64,
    /// Summed total of qualifying orders.
    pub monetary: Decimal,
    pub segment: RfmSegment,
}

/// Per-segment aggregate used by the dashboard summary view.
#[derive(Debug, Clone, Serialize)]
pub struct SegmentSummary {
    pub segment: RfmSegment,
    pub count: u64,
    pub revenue: Decimal,
}

/// Score every customer with at least one qualifying order.
///
/// Customers with zero qualifying orders are excluded from the output;
/// empty input yields empty output. There are no other failure modes.
#[must_use]
pub fn score_customers(
    customers: &[CustomerHistory],
    reference: DateTime<Utc>,
    filter: OrderFilter,
    thresholds: &RfmThresholds,
) -> Vec<RfmScore> {
    customers
        .iter()
        .filter_map(|customer| {
            let orders = customer.qualifying_orders(filter);
            let last = orders.last()?;

            let recency_days = days_between(last.created_at, reference);
            let frequency = orders.len() as u64;
            let monetary: Decimal = orders.iter().map(|o| o.total).sum();
            let segment = classify(recency_days, frequency, monetary, thresholds);

            Some(RfmScore {
                customer_id: customer.customer_id,
                name: customer.name.clone(),
                email: customer.email.clone(),
                recency_days,
                frequency,
                monetary,
                segment,
            })
        })
        .collect()
}

/// Map raw RFM metrics to a segment using fixed cutoffs, checked in priority
/// order. Staleness rules win over value rules so a lapsed big spender is
/// still reported as lost.
#[must_use]
pub fn classify(
    recency_days: i64,
    frequency: u64,
    monetary: Decimal,
    thresholds: &RfmThresholds,
) -> RfmSegment {
    if recency_days > thresholds.lost_min_recency_days {
        return RfmSegment::Lost;
    }
    if recency_days > thresholds.at_risk_min_recency_days {
        return RfmSegment::AtRisk;
    }
    if recency_days <= thresholds.champion_max_recency_days
        && frequency >= thresholds.champion_min_frequency
        && monetary >= Decimal::from(thresholds.champion_min_monetary)
    {
        return RfmSegment::Champions;
    }
    if recency_days <= thresholds.loyal_max_recency_days
        && frequency >= thresholds.loyal_min_frequency
    {
        return RfmSegment::Loyal;
    }
    if recency_days <= thresholds.new_max_recency_days && frequency == 1 {
        return RfmSegment::New;
    }
    RfmSegment::Regular
}

/// Aggregate score rows into per-segment count and revenue, sorted by
/// revenue descending.
#[must_use]
pub fn segment_summary(scores: &[RfmScore]) -> Vec<SegmentSummary> {
    use std::collections::HashMap;

    let mut buckets: HashMap<RfmSegment, (u64, Decimal)> = HashMap::new();
    for score in scores {
        let entry = buckets.entry(score.segment).or_insert((0, Decimal::ZERO));
        entry.0 += 1;
        entry.1 += score.monetary;
    }

    let mut summary: Vec<SegmentSummary> = buckets
        .into_iter()
        .map(|(segment, (count, revenue))| SegmentSummary {
            segment,
            count,
            revenue,
        })
        .collect();
    summary.sort_by(|a, b| b.revenue.cmp(&a.revenue));
    summary
}
