//! Database operations for the `coupons` table and its redemption join.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use storeops_core::{coupon_analytics::CouponUsage, CouponKind};

use crate::DbError;

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

/// A row from the `coupons` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponRow {
    pub id: i64,
    pub public_id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Decimal,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub usage_count: i32,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponRow {
    /// Parse the stored kind text into the typed enum.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnexpectedValue`] if the stored text is not a known
    /// kind.
    pub fn kind(&self) -> Result<CouponKind, DbError> {
        CouponKind::parse(&self.kind).ok_or_else(|| DbError::UnexpectedValue {
            column: "coupons.kind".to_string(),
            value: self.kind.clone(),
        })
    }
}

/// A coupon joined with its redemption and campaign aggregates.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CouponUsageRow {
    pub public_id: Uuid,
    pub code: String,
    pub kind: String,
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

impl CouponUsageRow {
    /// Convert into the analytics engine's input type.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::UnexpectedValue`] if the stored kind is not a known
    /// variant.
    pub fn into_usage(self) -> Result<CouponUsage, DbError> {
        let kind = CouponKind::parse(&self.kind).ok_or_else(|| DbError::UnexpectedValue {
            column: "coupons.kind".to_string(),
            value: self.kind.clone(),
        })?;
        Ok(CouponUsage {
            coupon_id: self.public_id,
            code: self.code,
            kind,
            value: self.value,
            is_active: self.is_active,
            usage_count: self.usage_count,
            usage_limit: self.usage_limit,
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            total_revenue: self.total_revenue,
            total_discount: self.total_discount,
            order_count: self.order_count,
            campaign_count: self.campaign_count,
        })
    }
}

const COUPON_COLUMNS: &str = "id, public_id, code, description, kind, value, min_purchase, \
     max_discount, usage_limit, usage_count, valid_from, valid_until, is_active, \
     created_at, updated_at";

/// Fields for a new coupon.
#[derive(Debug, Clone)]
pub struct NewCoupon<'a> {
    pub code: &'a str,
    pub description: Option<&'a str>,
    pub kind: CouponKind,
    pub value: Decimal,
    pub min_purchase: Decimal,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: bool,
}

/// Partial-update overlay. Outer `None` = keep the current value,
/// `Some(None)` = clear a nullable column, `Some(Some(v))` = set it.
#[allow(clippy::option_option)]
#[derive(Debug, Clone, Default)]
pub struct UpdateCouponFields<'a> {
    pub code: Option<&'a str>,
    pub description: Option<Option<&'a str>>,
    pub kind: Option<CouponKind>,
    pub value: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Option<Decimal>>,
    pub usage_limit: Option<Option<i32>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns one page of coupons, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_coupons_page(
    pool: &PgPool,
    limit: i64,
    offset: i64,
) -> Result<Vec<CouponRow>, DbError> {
    let rows = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC LIMIT $1 OFFSET $2",
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns every coupon, newest first. Used by the CSV export, which dumps
/// the whole table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_all_coupons(pool: &PgPool) -> Result<Vec<CouponRow>, DbError> {
    let rows = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Total number of coupons.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_coupons(pool: &PgPool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM coupons")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Returns a single coupon by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_coupon_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE public_id = $1",
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Returns a single coupon by code, or `None` if not found. Codes are stored
/// uppercased; the caller normalizes before lookup.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_coupon_by_code(pool: &PgPool, code: &str) -> Result<Option<CouponRow>, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "SELECT {COUPON_COLUMNS} FROM coupons WHERE code = $1",
    ))
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a coupon and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails; a duplicate code surfaces as
/// a unique-constraint violation for the caller to map.
pub async fn create_coupon(pool: &PgPool, coupon: &NewCoupon<'_>) -> Result<CouponRow, DbError> {
    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "INSERT INTO coupons \
           (code, description, kind, value, min_purchase, max_discount, usage_limit, \
            valid_from, valid_until, is_active) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         RETURNING {COUPON_COLUMNS}",
    ))
    .bind(coupon.code)
    .bind(coupon.description)
    .bind(coupon.kind.as_str())
    .bind(coupon.value)
    .bind(coupon.min_purchase)
    .bind(coupon.max_discount)
    .bind(coupon.usage_limit)
    .bind(coupon.valid_from)
    .bind(coupon.valid_until)
    .bind(coupon.is_active)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Partially updates a coupon and returns the new row, or `None` if the id is
/// unknown.
///
/// Non-nullable columns use `COALESCE`; nullable columns use a supplied-flag
/// `CASE` so a single `UPDATE … RETURNING` statement distinguishes "keep",
/// "clear", and "set".
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn update_coupon(
    pool: &PgPool,
    public_id: Uuid,
    fields: &UpdateCouponFields<'_>,
) -> Result<Option<CouponRow>, DbError> {
    let description_supplied = fields.description.is_some();
    let description_val = fields.description.flatten();
    let max_discount_supplied = fields.max_discount.is_some();
    let max_discount_val = fields.max_discount.flatten();
    let usage_limit_supplied = fields.usage_limit.is_some();
    let usage_limit_val = fields.usage_limit.flatten();

    let row = sqlx::query_as::<_, CouponRow>(&format!(
        "UPDATE coupons \
         SET code         = COALESCE($2, code), \
             kind         = COALESCE($3, kind), \
             value        = COALESCE($4, value), \
             min_purchase = COALESCE($5, min_purchase), \
             valid_from   = COALESCE($6, valid_from), \
             valid_until  = COALESCE($7, valid_until), \
             is_active    = COALESCE($8, is_active), \
             description  = CASE WHEN $9::BOOL  THEN $10 ELSE description END, \
             max_discount = CASE WHEN $11::BOOL THEN $12 ELSE max_discount END, \
             usage_limit  = CASE WHEN $13::BOOL THEN $14 ELSE usage_limit END, \
             updated_at   = NOW() \
         WHERE public_id = $1 \
         RETURNING {COUPON_COLUMNS}",
    ))
    .bind(public_id)
    .bind(fields.code)
    .bind(fields.kind.map(CouponKind::as_str))
    .bind(fields.value)
    .bind(fields.min_purchase)
    .bind(fields.valid_from)
    .bind(fields.valid_until)
    .bind(fields.is_active)
    .bind(description_supplied)
    .bind(description_val)
    .bind(max_discount_supplied)
    .bind(max_discount_val)
    .bind(usage_limit_supplied)
    .bind(usage_limit_val)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Deletes a coupon; returns the number of rows removed (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_coupon(pool: &PgPool, public_id: Uuid) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM coupons WHERE public_id = $1")
        .bind(public_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Sets `is_active` for every coupon in `ids`; returns the affected count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn set_active_bulk(
    pool: &PgPool,
    ids: &[Uuid],
    is_active: bool,
) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE coupons SET is_active = $2, updated_at = NOW() WHERE public_id = ANY($1)",
    )
    .bind(ids)
    .bind(is_active)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Deletes every coupon in `ids`; returns the affected count.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_bulk(pool: &PgPool, ids: &[Uuid]) -> Result<u64, DbError> {
    let result = sqlx::query("DELETE FROM coupons WHERE public_id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Pushes `valid_until` out by `days` for every coupon in `ids`; returns the
/// affected count. One statement, so the batch extends atomically.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn extend_validity_bulk(pool: &PgPool, ids: &[Uuid], days: i32) -> Result<u64, DbError> {
    let result = sqlx::query(
        "UPDATE coupons \
         SET valid_until = valid_until + make_interval(days => $2), updated_at = NOW() \
         WHERE public_id = ANY($1)",
    )
    .bind(ids)
    .bind(days)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Returns every coupon with its redemption aggregates (revenue, discount,
/// attributed order count) and the number of campaigns it is attached to.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_coupon_usage(pool: &PgPool) -> Result<Vec<CouponUsageRow>, DbError> {
    let rows = sqlx::query_as::<_, CouponUsageRow>(
        "SELECT c.public_id, c.code, c.kind, c.value, c.is_active, c.usage_count, \
                c.usage_limit, c.valid_from, c.valid_until, \
                COALESCE(SUM(r.order_total), 0)::NUMERIC(12,2) AS total_revenue, \
                COALESCE(SUM(r.discount_amount), 0)::NUMERIC(12,2) AS total_discount, \
                COUNT(r.id) AS order_count, \
                (SELECT COUNT(*) FROM campaign_coupons cc WHERE cc.coupon_id = c.id) AS campaign_count \
         FROM coupons c \
         LEFT JOIN coupon_redemptions r ON r.coupon_id = c.id \
         GROUP BY c.id \
         ORDER BY c.usage_count DESC, c.code",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Bumps a coupon's usage counter after a successful redemption.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn increment_usage(pool: &PgPool, public_id: Uuid) -> Result<(), DbError> {
    sqlx::query(
        "UPDATE coupons SET usage_count = usage_count + 1, updated_at = NOW() \
         WHERE public_id = $1",
    )
    .bind(public_id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Records a redemption row linking a coupon to an order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn record_redemption(
    pool: &PgPool,
    coupon_id: i64,
    order_id: i64,
    order_total: Decimal,
    discount_amount: Decimal,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO coupon_redemptions (coupon_id, order_id, order_total, discount_amount) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(coupon_id)
    .bind(order_id)
    .bind(order_total)
    .bind(discount_amount)
    .execute(pool)
    .await?;
    Ok(())
}
