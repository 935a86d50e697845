//! Customer-list segmentation.
//!
//! Segment assignment is a pure function of `(created_at, metrics, now)` and
//! the configured thresholds — nothing is persisted, and two calls with the
//! same inputs always agree.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{days_between, CustomerMetrics};
use crate::thresholds::SegmentThresholds;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CustomerSegment {
    Vip,
    Loyal,
    New,
    AtRisk,
    Inactive,
    Regular,
}

impl CustomerSegment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CustomerSegment::Vip => "VIP",
            CustomerSegment::Loyal => "LOYAL",
            CustomerSegment::New => "NEW",
            CustomerSegment::AtRisk => "AT_RISK",
            CustomerSegment::Inactive => "INACTIVE",
            CustomerSegment::Regular => "REGULAR",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "VIP" => Some(CustomerSegment::Vip),
            "LOYAL" => Some(CustomerSegment::Loyal),
            "NEW" => Some(CustomerSegment::New),
            "AT_RISK" => Some(CustomerSegment::AtRisk),
            "INACTIVE" => Some(CustomerSegment::Inactive),
            "REGULAR" => Some(CustomerSegment::Regular),
            _ => None,
        }
    }
}

impl std::fmt::Display for CustomerSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign a segment from derived metrics. Rules are checked in priority
/// order: INACTIVE, AT_RISK, VIP, LOYAL, NEW, then REGULAR.
///
/// A customer who has never ordered has infinite effective recency and lands
/// in INACTIVE.
#[must_use]
pub fn classify_customer(
    created_at: DateTime<Utc>,
    metrics: &CustomerMetrics,
    now: DateTime<Utc>,
    thresholds: &SegmentThresholds,
) -> CustomerSegment {
    let days_since_created = days_between(created_at, now);
    let days_since_last_order = metrics.last_order_date.map(|d| days_between(d, now));

    let stale = |limit: i64| days_since_last_order.is_none_or(|days| days > limit);

    if stale(thresholds.inactive_days) {
        return CustomerSegment::Inactive;
    }
    if stale(thresholds.at_risk_days) {
        return CustomerSegment::AtRisk;
    }
    if metrics.lifetime_value >= Decimal::from(thresholds.vip_min_spent) {
        return CustomerSegment::Vip;
    }
    if metrics.total_orders >= thresholds.loyal_min_orders {
        return CustomerSegment::Loyal;
    }
    if days_since_created <= thresholds.new_days && metrics.total_orders > 0 {
        return CustomerSegment::New;
    }
    CustomerSegment::Regular
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 12, 20, 0, 0, 0).unwrap()
    }

    fn metrics(orders: u64, spent: i64, last_order_days_ago: Option<i64>) -> CustomerMetrics {
        CustomerMetrics {
            total_orders: orders,
            lifetime_value: Decimal::from(spent),
            average_order_value: if orders > 0 {
                Decimal::from(spent) / Decimal::from(orders)
            } else {
                Decimal::ZERO
            },
            last_order_date: last_order_days_ago.map(|d| reference() - chrono::Duration::days(d)),
        }
    }

    #[test]
    fn never_ordered_customer_is_inactive() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(400),
            &metrics(0, 0, None),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Inactive);
    }

    #[test]
    fn stale_order_history_beats_high_spend() {
        // $9000 lifetime value, but 200 days quiet: INACTIVE wins over VIP.
        let segment = classify_customer(
            reference() - chrono::Duration::days(700),
            &metrics(4, 9_000, Some(200)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Inactive);
    }

    #[test]
    fn quiet_but_not_gone_is_at_risk() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(700),
            &metrics(4, 900, Some(90)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::AtRisk);
    }

    #[test]
    fn big_spender_with_recent_order_is_vip() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(700),
            &metrics(3, 6_000, Some(10)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Vip);
    }

    #[test]
    fn frequent_buyer_is_loyal() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(700),
            &metrics(6, 900, Some(10)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Loyal);
    }

    #[test]
    fn recent_signup_with_order_is_new() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(10),
            &metrics(1, 100, Some(5)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::New);
    }

    #[test]
    fn recent_signup_without_order_is_not_new() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(10),
            &metrics(0, 0, None),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Inactive);
    }

    #[test]
    fn middle_of_the_road_customer_is_regular() {
        let segment = classify_customer(
            reference() - chrono::Duration::days(400),
            &metrics(2, 300, Some(20)),
            reference(),
            &SegmentThresholds::default(),
        );
        assert_eq!(segment, CustomerSegment::Regular);
    }

    #[test]
    fn segment_serializes_screaming_snake() {
        let json = serde_json::to_string(&CustomerSegment::AtRisk).unwrap();
        assert_eq!(json, "\"AT_RISK\"");
        assert_eq!(CustomerSegment::parse("AT_RISK"), Some(CustomerSegment::AtRisk));
    }
}
