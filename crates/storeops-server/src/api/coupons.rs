//! Coupon management handlers: CRUD, bulk operations, analytics, CSV export,
//! and checkout validation.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storeops_core::{
    apply_coupon, coupon_performance, expiring_within, overall_stats, Coupon, CouponKind,
    CouponPerformance, DiscountOutcome, OverallCouponStats,
};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, PagedResponse,
    Pagination, ResponseMeta,
};

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct CouponItem {
    id: Uuid,
    code: String,
    description: Option<String>,
    kind: CouponKind,
    value: Decimal,
    min_purchase: Decimal,
    max_discount: Option<Decimal>,
    usage_limit: Option<i32>,
    usage_count: i32,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl CouponItem {
    fn from_row(req_id: &str, row: storeops_db::CouponRow) -> Result<Self, ApiError> {
        let kind = CouponKind::parse(&row.kind).ok_or_else(|| {
            tracing::error!(code = %row.code, kind = %row.kind, "unknown coupon kind in storage");
            ApiError::new(req_id, "internal_error", "corrupt coupon record")
        })?;
        Ok(Self {
            id: row.public_id,
            code: row.code,
            description: row.description,
            kind,
            value: row.value,
            min_purchase: row.min_purchase,
            max_discount: row.max_discount,
            usage_limit: row.usage_limit,
            usage_count: row.usage_count,
            valid_from: row.valid_from,
            valid_until: row.valid_until,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCouponRequest {
    pub code: String,
    pub description: Option<String>,
    pub kind: String,
    pub value: Decimal,
    pub min_purchase: Option<Decimal>,
    pub max_discount: Option<Decimal>,
    pub usage_limit: Option<i32>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    pub is_active: Option<bool>,
}

// Option<Option<T>> is intentional: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value" (partial-update semantics).
#[allow(clippy::option_option)]
#[derive(Debug, Deserialize)]
pub(super) struct UpdateCouponRequest {
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<Option<String>>,
    pub kind: Option<String>,
    pub value: Option<Decimal>,
    pub min_purchase: Option<Decimal>,
    #[serde(default)]
    pub max_discount: Option<Option<Decimal>>,
    #[serde(default)]
    pub usage_limit: Option<Option<i32>>,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(super) struct BulkRequest {
    pub ids: Vec<Uuid>,
    pub action: String,
}

#[derive(Debug, Serialize)]
pub(super) struct BulkResult {
    count: u64,
    message: String,
}

#[derive(Debug, Serialize)]
pub(super) struct CouponAnalyticsData {
    coupons: Vec<CouponPerformance>,
    overall: OverallCouponStats,
    /// Active windows closing within the next seven days.
    expiring_soon: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct ValidateRequest {
    pub code: String,
    pub subtotal: Decimal,
    pub shipping_cost: Option<Decimal>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn parse_kind(req_id: &str, value: &str) -> Result<CouponKind, ApiError> {
    CouponKind::parse(value).ok_or_else(|| {
        ApiError::new(
            req_id,
            "validation_error",
            format!("kind must be PERCENTAGE, FIXED, or FREE_SHIPPING, got '{value}'"),
        )
    })
}

fn validate_code(req_id: &str, code: &str) -> Result<String, ApiError> {
    let code = code.trim().to_uppercase();
    if code.is_empty() || code.len() > 64 {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "code must be 1–64 characters",
        ));
    }
    Ok(code)
}

fn validate_value(req_id: &str, kind: CouponKind, value: Decimal) -> Result<Decimal, ApiError> {
    match kind {
        CouponKind::Percentage => {
            if value < Decimal::ZERO || value > Decimal::from(100) {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    format!("percentage value must be within 0–100, got {value}"),
                ));
            }
            Ok(value)
        }
        CouponKind::Fixed => {
            if value <= Decimal::ZERO {
                return Err(ApiError::new(
                    req_id,
                    "validation_error",
                    format!("fixed discount must be positive, got {value}"),
                ));
            }
            Ok(value)
        }
        // The discount is the shipping cost; the stored value is unused.
        CouponKind::FreeShipping => Ok(Decimal::ZERO),
    }
}

fn validate_window(
    req_id: &str,
    valid_from: DateTime<Utc>,
    valid_until: DateTime<Utc>,
) -> Result<(), ApiError> {
    if valid_from >= valid_until {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            "valid_from must be before valid_until",
        ));
    }
    Ok(())
}

fn validate_usage_limit(req_id: &str, limit: Option<i32>) -> Result<(), ApiError> {
    if let Some(limit) = limit {
        if limit <= 0 {
            return Err(ApiError::new(
                req_id,
                "validation_error",
                format!("usage_limit must be positive, got {limit}"),
            ));
        }
    }
    Ok(())
}

fn map_unique_violation(req_id: &str, e: &storeops_db::DbError) -> ApiError {
    if let storeops_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.code().as_deref() == Some("23505") {
            return ApiError::new(req_id, "conflict", "a coupon with that code already exists");
        }
    }
    map_db_error(req_id.to_owned(), e)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/coupons — paginated listing, newest first.
pub(super) async fn list_coupons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<PagedResponse<Vec<CouponItem>>>, ApiError> {
    let page = normalize_page(query.page);
    let limit = normalize_limit(query.limit);
    let offset = (page - 1) * limit;

    let rows = storeops_db::list_coupons_page(&state.pool, limit, offset)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let total = storeops_db::count_coupons(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| CouponItem::from_row(&req_id.0, row))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(PagedResponse {
        data,
        pagination: Pagination::new(page, limit, total),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/coupons — create a coupon.
pub(super) async fn create_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCouponRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CouponItem>>), ApiError> {
    let rid = &req_id.0;

    let code = validate_code(rid, &body.code)?;
    let kind = parse_kind(rid, &body.kind)?;
    let value = validate_value(rid, kind, body.value)?;
    validate_window(rid, body.valid_from, body.valid_until)?;
    validate_usage_limit(rid, body.usage_limit)?;

    let row = storeops_db::create_coupon(
        &state.pool,
        &storeops_db::NewCoupon {
            code: &code,
            description: body.description.as_deref(),
            kind,
            value,
            min_purchase: body.min_purchase.unwrap_or(Decimal::ZERO),
            max_discount: body.max_discount,
            usage_limit: body.usage_limit,
            valid_from: body.valid_from,
            valid_until: body.valid_until,
            is_active: body.is_active.unwrap_or(true),
        },
    )
    .await
    .map_err(|e| map_unique_violation(rid, &e))?;

    let item = CouponItem::from_row(rid, row)?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: item,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/coupons/{id}
pub(super) async fn get_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CouponItem>>, ApiError> {
    let row = storeops_db::get_coupon_by_public_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "coupon not found"))?;

    let item = CouponItem::from_row(&req_id.0, row)?;
    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// PUT /api/v1/coupons/{id} — partial update.
pub(super) async fn update_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateCouponRequest>,
) -> Result<Json<ApiResponse<CouponItem>>, ApiError> {
    let rid = &req_id.0;

    let existing = storeops_db::get_coupon_by_public_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?
        .ok_or_else(|| ApiError::new(rid.clone(), "not_found", "coupon not found"))?;

    let code = body
        .code
        .as_deref()
        .map(|c| validate_code(rid, c))
        .transpose()?;

    // Validate value against the kind the row will have after the update.
    let kind = body
        .kind
        .as_deref()
        .map(|k| parse_kind(rid, k))
        .transpose()?;
    let effective_kind = match kind {
        Some(k) => k,
        None => CouponKind::parse(&existing.kind).ok_or_else(|| {
            ApiError::new(rid.clone(), "internal_error", "corrupt coupon record")
        })?,
    };
    let value = body
        .value
        .map(|v| validate_value(rid, effective_kind, v))
        .transpose()?;

    let valid_from = body.valid_from.unwrap_or(existing.valid_from);
    let valid_until = body.valid_until.unwrap_or(existing.valid_until);
    validate_window(rid, valid_from, valid_until)?;
    validate_usage_limit(rid, body.usage_limit.flatten())?;

    let row = storeops_db::update_coupon(
        &state.pool,
        id,
        &storeops_db::UpdateCouponFields {
            code: code.as_deref(),
            description: body.description.as_ref().map(|d| d.as_deref()),
            kind,
            value,
            min_purchase: body.min_purchase,
            max_discount: body.max_discount,
            usage_limit: body.usage_limit,
            valid_from: body.valid_from,
            valid_until: body.valid_until,
            is_active: body.is_active,
        },
    )
    .await
    .map_err(|e| map_unique_violation(rid, &e))?
    .ok_or_else(|| ApiError::new(rid.clone(), "not_found", "coupon not found"))?;

    let item = CouponItem::from_row(rid, row)?;
    Ok(Json(ApiResponse {
        data: item,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/coupons/{id}
pub(super) async fn delete_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let removed = storeops_db::delete_coupon(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if removed == 0 {
        return Err(ApiError::new(req_id.0, "not_found", "coupon not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({"deleted": true}),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/coupons/bulk — apply one action to a set of coupons.
///
/// Invalid input (empty id list, unknown action) is rejected before any
/// record is touched.
pub(super) async fn bulk_coupons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<BulkRequest>,
) -> Result<Json<ApiResponse<BulkResult>>, ApiError> {
    let rid = &req_id.0;

    if body.ids.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "ids must be a non-empty array of coupon ids",
        ));
    }

    let (count, verb) = match body.action.as_str() {
        "activate" => (
            storeops_db::set_active_bulk(&state.pool, &body.ids, true)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?,
            "activated",
        ),
        "deactivate" => (
            storeops_db::set_active_bulk(&state.pool, &body.ids, false)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?,
            "deactivated",
        ),
        "delete" => (
            storeops_db::delete_bulk(&state.pool, &body.ids)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?,
            "deleted",
        ),
        "extend" => (
            storeops_db::extend_validity_bulk(&state.pool, &body.ids, 30)
                .await
                .map_err(|e| map_db_error(rid.clone(), &e))?,
            "extended",
        ),
        other => {
            return Err(ApiError::new(
                rid,
                "validation_error",
                format!("action must be activate, deactivate, delete, or extend, got '{other}'"),
            ));
        }
    };

    Ok(Json(ApiResponse {
        data: BulkResult {
            count,
            message: format!("Successfully {verb} {count} coupon(s)"),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/coupons/analytics — per-coupon performance plus overall stats.
pub(super) async fn coupon_analytics(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CouponAnalyticsData>>, ApiError> {
    let rows = storeops_db::list_coupon_usage(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let usage = rows
        .into_iter()
        .map(storeops_db::CouponUsageRow::into_usage)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let coupons = coupon_performance(&usage);
    let overall = overall_stats(&coupons);
    let expiring_soon = expiring_within(&usage, Utc::now(), 7).len();

    Ok(Json(ApiResponse {
        data: CouponAnalyticsData {
            coupons,
            overall,
            expiring_soon,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/coupons/export — the full coupon table as a CSV attachment.
pub(super) async fn export_coupons(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<axum::response::Response, ApiError> {
    let rows = storeops_db::list_all_coupons(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let mut csv = String::from("Code,Type,Value,Usage Count,Usage Limit,Is Active\n");
    for row in &rows {
        let cells = [
            row.code.clone(),
            row.kind.clone(),
            row.value.to_string(),
            row.usage_count.to_string(),
            row.usage_limit.map(|l| l.to_string()).unwrap_or_default(),
            row.is_active.to_string(),
        ];
        let quoted: Vec<String> = cells
            .iter()
            .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
            .collect();
        csv.push_str(&quoted.join(","));
        csv.push('\n');
    }

    let filename = format!(
        "coupons_export_{}.csv",
        Utc::now().format("%Y-%m-%d")
    );
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

/// POST /api/v1/coupons/validate — checkout-facing discount check.
///
/// Read-only: usage counters are only bumped when an order is actually
/// placed.
pub(super) async fn validate_coupon(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<ValidateRequest>,
) -> Result<Json<ApiResponse<DiscountOutcome>>, ApiError> {
    let code = body.code.trim().to_uppercase();
    let row = storeops_db::get_coupon_by_code(&state.pool, &code)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "coupon not found"))?;

    let kind = CouponKind::parse(&row.kind)
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "internal_error", "corrupt coupon record"))?;
    let coupon = Coupon {
        coupon_id: row.public_id,
        code: row.code,
        description: row.description,
        kind,
        value: row.value,
        min_purchase: row.min_purchase,
        max_discount: row.max_discount,
        usage_limit: row.usage_limit,
        usage_count: row.usage_count,
        valid_from: row.valid_from,
        valid_until: row.valid_until,
        is_active: row.is_active,
    };

    let outcome = apply_coupon(
        &coupon,
        body.subtotal,
        body.shipping_cost.unwrap_or(Decimal::ZERO),
        Utc::now(),
    );

    Ok(Json(ApiResponse {
        data: outcome,
        meta: ResponseMeta::new(req_id.0),
    }))
}
