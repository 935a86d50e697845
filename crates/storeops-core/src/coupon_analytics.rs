//! Per-coupon performance aggregates: redemption rate, ROI, average order
//! value.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::coupons::CouponKind;

/// Raw usage numbers for one coupon, as aggregated by the db layer from the
/// redemption join.
#[derive(Debug, Clone)]
pub struct CouponUsage {
    pub coupon_id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub is_active: bool,
    pub usage_count: i32,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub total_revenue: Decimal,
    pub total_discount: Decimal,
    pub order_count: i64,
    pub campaign_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CouponPerformance {
    pub coupon_id: Uuid,
    pub code: String,
    pub kind: CouponKind,
    pub value: Decimal,
    pub is_active: bool,
    pub usage_count: i32,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    /// usage_count / usage_limit × 100; 0 for unlimited coupons.
    pub redemption_rate: f64,
    /// (revenue − discount) / discount × 100; `None` when no discount was
    /// ever granted, so a zero denominator never turns into NaN or infinity.
    pub roi: Option<f64>,
    pub avg_order_value: f64,
    pub total_revenue: Decimal,
    pub total_discount: Decimal,
    pub campaign_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverallCouponStats {
    pub total_coupons: u64,
    pub active_coupons: u64,
    pub total_usage: i64,
    pub avg_redemption_rate: f64,
}

/// usage / limit × 100. Unlimited coupons report 0; within `[0, 100]`
/// whenever usage does not exceed the limit.
#[must_use]
pub fn redemption_rate(usage_count: i32, usage_limit: Option<i32>) -> f64 {
    match usage_limit {
        Some(limit) if limit > 0 => f64::from(usage_count) / f64::from(limit) * 100.0,
        _ => 0.0,
    }
}

/// (revenue − discount) / discount × 100, or `None` when the discount is
/// zero.
#[must_use]
pub fn roi(total_revenue: Decimal, total_discount: Decimal) -> Option<f64> {
    if total_discount.is_zero() {
        return None;
    }
    let revenue = total_revenue.to_f64().unwrap_or(0.0);
    let discount = total_discount.to_f64().unwrap_or(0.0);
    Some((revenue - discount) / discount * 100.0)
}

/// Fold usage rows into performance rows, sorted by usage count descending.
#[must_use]
pub fn coupon_performance(usage: &[CouponUsage]) -> Vec<CouponPerformance> {
    let mut rows: Vec<CouponPerformance> = usage
        .iter()
        .map(|u| {
            let avg_order_value = if u.order_count > 0 {
                (u.total_revenue / Decimal::from(u.order_count))
                    .to_f64()
                    .unwrap_or(0.0)
            } else {
                0.0
            };

            CouponPerformance {
                coupon_id: u.coupon_id,
                code: u.code.clone(),
                kind: u.kind,
                value: u.value,
                is_active: u.is_active,
                usage_count: u.usage_count,
                usage_limit: u.usage_limit,
                valid_from: u.valid_from,
                valid_until: u.valid_until,
                redemption_rate: redemption_rate(u.usage_count, u.usage_limit),
                roi: roi(u.total_revenue, u.total_discount),
                avg_order_value,
                total_revenue: u.total_revenue,
                total_discount: u.total_discount,
                campaign_count: u.campaign_count,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.usage_count.cmp(&a.usage_count));
    rows
}

/// Portfolio-level stats across all coupons.
#[must_use]
pub fn overall_stats(performance: &[CouponPerformance]) -> OverallCouponStats {
    let total_coupons = performance.len() as u64;
    let active_coupons = performance.iter().filter(|p| p.is_active).count() as u64;
    let total_usage = performance.iter().map(|p| i64::from(p.usage_count)).sum();
    let avg_redemption_rate = if performance.is_empty() {
        0.0
    } else {
        performance.iter().map(|p| p.redemption_rate).sum::<f64>() / performance.len() as f64
    };

    OverallCouponStats {
        total_coupons,
        active_coupons,
        total_usage,
        avg_redemption_rate,
    }
}

/// Coupons whose validity window closes within `days` of `now` (and has not
/// already closed).
#[must_use]
pub fn expiring_within(usage: &[CouponUsage], now: DateTime<Utc>, days: i64) -> Vec<&CouponUsage> {
    let cutoff = now + Duration::days(days);
    usage
        .iter()
        .filter(|u| u.valid_until > now && u.valid_until <= cutoff)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    fn usage(code: &str, count: i32, limit: Option<i32>) -> CouponUsage {
        CouponUsage {
            coupon_id: Uuid::new_v4(),
            code: code.to_string(),
            kind: CouponKind::Percentage,
            value: Decimal::from(10),
            is_active: true,
            usage_count: count,
            usage_limit: limit,
            valid_from: now() - Duration::days(30),
            valid_until: now() + Duration::days(30),
            total_revenue: Decimal::ZERO,
            total_discount: Decimal::ZERO,
            order_count: 0,
            campaign_count: 0,
        }
    }

    #[test]
    fn redemption_rate_is_a_percentage() {
        assert!((redemption_rate(50, Some(100)) - 50.0).abs() < f64::EPSILON);
        assert!((redemption_rate(100, Some(100)) - 100.0).abs() < f64::EPSILON);
        assert!((redemption_rate(0, Some(100))).abs() < f64::EPSILON);
    }

    #[test]
    fn redemption_rate_is_zero_without_a_limit() {
        assert!((redemption_rate(37, None)).abs() < f64::EPSILON);
        assert!((redemption_rate(37, Some(0))).abs() < f64::EPSILON);
    }

    #[test]
    fn roi_matches_the_nine_x_example() {
        let result = roi(Decimal::from(5_000), Decimal::from(500));
        assert!((result.unwrap() - 900.0).abs() < f64::EPSILON);
    }

    #[test]
    fn roi_is_none_when_discount_is_zero() {
        assert!(roi(Decimal::from(5_000), Decimal::ZERO).is_none());
    }

    #[test]
    fn roi_can_be_negative_when_discount_exceeds_revenue() {
        let result = roi(Decimal::from(100), Decimal::from(200)).unwrap();
        assert!((result - (-50.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn performance_computes_average_order_value() {
        let mut u = usage("SUMMER10", 3, Some(100));
        u.total_revenue = Decimal::from(450);
        u.total_discount = Decimal::from(45);
        u.order_count = 3;

        let rows = coupon_performance(&[u]);
        assert!((rows[0].avg_order_value - 150.0).abs() < f64::EPSILON);
    }

    #[test]
    fn performance_is_sorted_by_usage_descending() {
        let rows = coupon_performance(&[
            usage("QUIET", 5, Some(100)),
            usage("POPULAR", 80, Some(100)),
            usage("MIDDLE", 20, Some(100)),
        ]);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, ["POPULAR", "MIDDLE", "QUIET"]);
    }

    #[test]
    fn overall_stats_average_the_redemption_rates() {
        let mut inactive = usage("OFF", 0, Some(100));
        inactive.is_active = false;
        let rows = coupon_performance(&[usage("A", 50, Some(100)), inactive]);
        let stats = overall_stats(&rows);

        assert_eq!(stats.total_coupons, 2);
        assert_eq!(stats.active_coupons, 1);
        assert_eq!(stats.total_usage, 50);
        assert!((stats.avg_redemption_rate - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overall_stats_on_empty_input_are_zero() {
        let stats = overall_stats(&[]);
        assert_eq!(stats.total_coupons, 0);
        assert!((stats.avg_redemption_rate).abs() < f64::EPSILON);
    }

    #[test]
    fn expiring_within_excludes_already_expired_coupons() {
        let mut soon = usage("SOON", 0, None);
        soon.valid_until = now() + Duration::days(5);
        let mut gone = usage("GONE", 0, None);
        gone.valid_until = now() - Duration::days(1);
        let far = usage("FAR", 0, None);

        let all = [soon, gone, far];
        let expiring = expiring_within(&all, now(), 7);
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].code, "SOON");
    }
}
