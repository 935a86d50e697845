//! Coupon value types and discount application.

use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CouponKind {
    Percentage,
    Fixed,
    FreeShipping,
}

impl CouponKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CouponKind::Percentage => "PERCENTAGE",
            CouponKind::Fixed => "FIXED",
            CouponKind::FreeShipping => "FREE_SHIPPING",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PERCENTAGE" => Some(CouponKind::Percentage),
            "FIXED" => Some(CouponKind::Fixed),
            "FREE_SHIPPING" => Some(CouponKind::FreeShipping),
            _ => None,
        }
    }
}

impl std::fmt::Display for CouponKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coupon {
    pub coupon_id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
}

/// Result of attempting to apply a coupon to a cart.
#[derive(Debug, Clone, Serialize)]
pub struct DiscountOutcome {
    pub valid: bool,
    pub discount: Decimal,
    pub message: String,
}

impl DiscountOutcome {
    fn rejected(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            discount: Decimal::ZERO,
            message: message.into(),
        }
    }
}

/// Validate a coupon against a cart and compute the discount it grants.
///
/// Checks, in order: active flag, validity window, usage limit, minimum
/// purchase. The computed discount never exceeds the cart subtotal.
#[must_use]
pub fn apply_coupon(
    coupon: &Coupon,
    subtotal: Decimal,
    shipping_cost: Decimal,
    now: DateTime<Utc>,
) -> DiscountOutcome {
    if !coupon.is_active {
        return DiscountOutcome::rejected("This coupon is not active");
    }

    if now < coupon.valid_from || now > coupon.valid_until {
        return DiscountOutcome::rejected("This coupon has expired or is not yet valid");
    }

    if let Some(limit) = coupon.usage_limit {
        if coupon.usage_count >= limit {
            return DiscountOutcome::rejected("This coupon has reached its usage limit");
        }
    }

    if subtotal < coupon.min_purchase {
        return DiscountOutcome::rejected(format!(
            "Minimum purchase of ${} required",
            coupon.min_purchase.round_dp(2)
        ));
    }

    let raw = match coupon.kind {
        CouponKind::Percentage => {
            let discount = subtotal * coupon.value / Decimal::from(100);
            match coupon.max_discount {
                Some(cap) => discount.min(cap),
                None => discount,
            }
        }
        CouponKind::Fixed => coupon.value,
        CouponKind::FreeShipping => shipping_cost,
    };

    let discount = raw.min(subtotal);

    DiscountOutcome {
        valid: true,
        discount,
        message: format!("Coupon applied! You saved ${}", discount.round_dp(2)),
    }
}

/// Generate a coupon code: the prefix followed by six random uppercase
/// alphanumerics.
#[must_use]
pub fn generate_code(prefix: &str) -> String {
    let suffix: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase();
    format!("{prefix}{suffix}")
}
