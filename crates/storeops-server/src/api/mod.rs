mod analytics;
mod campaigns;
mod coupons;
mod customers;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use std::time::Duration;
use storeops_core::AnalyticsThresholds;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub thresholds: Arc<AnalyticsThresholds>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

/// Envelope for paginated listings, per the admin UI contract:
/// `{data, pagination: {page, limit, total, pages}, meta}`.
#[derive(Debug, Serialize)]
pub struct PagedResponse<T: Serialize> {
    pub data: T,
    pub pagination: Pagination,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

impl Pagination {
    #[must_use]
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        let pages = if limit > 0 {
            (total as u64).div_ceil(limit as u64) as i64
        } else {
            0
        };
        Self {
            page,
            limit,
            total,
            pages,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_page(page: Option<i64>) -> i64 {
    page.unwrap_or(1).max(1)
}

pub(super) fn normalize_limit(limit: Option<i64>) -> i64 {
    limit.unwrap_or(20).clamp(1, 100)
}

/// Analytics listings allow a deeper window than the paged admin tables.
pub(super) fn normalize_analytics_limit(limit: Option<i64>) -> usize {
    usize::try_from(limit.unwrap_or(100).clamp(1, 500)).unwrap_or(100)
}

pub(super) fn map_db_error(request_id: String, error: &storeops_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/customers", get(customers::list_customers))
        .route("/api/v1/customers/{id}", get(customers::get_customer))
        .route("/api/v1/analytics/rfm", get(analytics::rfm_analysis))
        .route("/api/v1/analytics/clv", get(analytics::clv_analysis))
        .route("/api/v1/analytics/churn", get(analytics::churn_analysis))
        .route(
            "/api/v1/coupons",
            get(coupons::list_coupons).post(coupons::create_coupon),
        )
        .route("/api/v1/coupons/bulk", post(coupons::bulk_coupons))
        .route("/api/v1/coupons/analytics", get(coupons::coupon_analytics))
        .route("/api/v1/coupons/export", get(coupons::export_coupons))
        .route("/api/v1/coupons/validate", post(coupons::validate_coupon))
        .route(
            "/api/v1/coupons/{id}",
            get(coupons::get_coupon)
                .put(coupons::update_coupon)
                .delete(coupons::delete_coupon),
        )
        .route(
            "/api/v1/campaigns",
            get(campaigns::list_campaigns).post(campaigns::create_campaign),
        )
        .route(
            "/api/v1/campaigns/{id}/events",
            get(campaigns::list_events).post(campaigns::create_event),
        )
        .route(
            "/api/v1/campaigns/{id}/events/{event_id}",
            axum::routing::delete(campaigns::delete_event),
        )
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match storeops_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    #[test]
    fn normalize_page_applies_default_and_floor() {
        assert_eq!(normalize_page(None), 1);
        assert_eq!(normalize_page(Some(0)), 1);
        assert_eq!(normalize_page(Some(-3)), 1);
        assert_eq!(normalize_page(Some(7)), 7);
    }

    #[test]
    fn normalize_limit_applies_defaults_and_bounds() {
        assert_eq!(normalize_limit(None), 20);
        assert_eq!(normalize_limit(Some(0)), 1);
        assert_eq!(normalize_limit(Some(1_000)), 100);
        assert_eq!(normalize_limit(Some(25)), 25);
    }

    #[test]
    fn normalize_analytics_limit_caps_at_five_hundred() {
        assert_eq!(normalize_analytics_limit(None), 100);
        assert_eq!(normalize_analytics_limit(Some(2_000)), 500);
        assert_eq!(normalize_analytics_limit(Some(50)), 50);
    }

    #[test]
    fn pagination_rounds_page_count_up() {
        assert_eq!(
            Pagination::new(1, 20, 41),
            Pagination {
                page: 1,
                limit: 20,
                total: 41,
                pages: 3
            }
        );
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
    }

    #[test]
    fn api_error_validation_error_maps_to_bad_request() {
        let response = ApiError::new("req-1", "validation_error", "invalid input").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn api_error_conflict_maps_to_409() {
        let response = ApiError::new("req-1", "conflict", "duplicate").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn api_error_not_found_maps_to_404() {
        let response = ApiError::new("req-1", "not_found", "nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Shared fixtures
    // -------------------------------------------------------------------------

    fn test_app(pool: sqlx::PgPool) -> Router {
        let auth = crate::middleware::AuthState::from_env(true).expect("auth");
        build_app(
            AppState {
                pool,
                thresholds: Arc::new(AnalyticsThresholds::default()),
            },
            auth,
            default_rate_limit_state(),
        )
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .uri(uri)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json parse");
        (status, json)
    }

    async fn post_json(
        app: Router,
        uri: &str,
        body: serde_json::Value,
    ) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json: serde_json::Value = serde_json::from_slice(&bytes).expect("json parse");
        (status, json)
    }

    /// Insert a customer with backdated orders; returns the customer row id.
    async fn seed_customer_with_orders(
        pool: &sqlx::PgPool,
        email: &str,
        name: &str,
        orders: &[(i64, i64, &str)], // (days_ago, total, status)
    ) -> i64 {
        let customer = storeops_db::create_customer(pool, email, name, None, None, None)
            .await
            .expect("seed customer");
        for (days_ago, total, status) in orders {
            storeops_db::create_order(
                pool,
                customer.id,
                Decimal::from(*total),
                status,
                Utc::now() - chrono::Duration::days(*days_ago),
            )
            .await
            .expect("seed order");
        }
        customer.id
    }

    async fn seed_coupon(pool: &sqlx::PgPool, code: &str, usage_limit: Option<i32>) -> storeops_db::CouponRow {
        storeops_db::create_coupon(
            pool,
            &storeops_db::NewCoupon {
                code,
                description: None,
                kind: storeops_core::CouponKind::Percentage,
                value: Decimal::from(10),
                min_purchase: Decimal::ZERO,
                max_discount: None,
                usage_limit,
                valid_from: Utc::now() - chrono::Duration::days(10),
                valid_until: Utc::now() + chrono::Duration::days(10),
                is_active: true,
            },
        )
        .await
        .expect("seed coupon")
    }

    // -------------------------------------------------------------------------
    // Coupons — CRUD and validation
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_coupon_returns_201_and_uppercases_code(pool: sqlx::PgPool) {
        let (status, json) = post_json(
            test_app(pool),
            "/api/v1/coupons",
            serde_json::json!({
                "code": "summer10",
                "kind": "PERCENTAGE",
                "value": "10",
                "valid_from": "2024-06-01T00:00:00Z",
                "valid_until": "2027-06-01T00:00:00Z"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED, "body: {json}");
        assert_eq!(json["data"]["code"].as_str(), Some("SUMMER10"));
        assert_eq!(json["data"]["kind"].as_str(), Some("PERCENTAGE"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_coupon_rejects_percentage_above_100(pool: sqlx::PgPool) {
        let (status, json) = post_json(
            test_app(pool),
            "/api/v1/coupons",
            serde_json::json!({
                "code": "TOOMUCH",
                "kind": "PERCENTAGE",
                "value": "150",
                "valid_from": "2024-06-01T00:00:00Z",
                "valid_until": "2027-06-01T00:00:00Z"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn create_coupon_duplicate_code_conflicts(pool: sqlx::PgPool) {
        seed_coupon(&pool, "DUPE10", None).await;

        let (status, json) = post_json(
            test_app(pool),
            "/api/v1/coupons",
            serde_json::json!({
                "code": "DUPE10",
                "kind": "FIXED",
                "value": "5",
                "valid_from": "2024-06-01T00:00:00Z",
                "valid_until": "2027-06-01T00:00:00Z"
            }),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["error"]["code"].as_str(), Some("conflict"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn list_coupons_returns_pagination_envelope(pool: sqlx::PgPool) {
        for i in 0..3 {
            seed_coupon(&pool, &format!("PAGE{i}"), None).await;
        }

        let (status, json) = get_json(test_app(pool), "/api/v1/coupons?page=1&limit=2").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["pagination"]["page"].as_i64(), Some(1));
        assert_eq!(json["pagination"]["limit"].as_i64(), Some(2));
        assert_eq!(json["pagination"]["total"].as_i64(), Some(3));
        assert_eq!(json["pagination"]["pages"].as_i64(), Some(2));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn get_coupon_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        let (status, _) = get_json(
            test_app(pool),
            "/api/v1/coupons/00000000-0000-0000-0000-000000000000",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Coupons — bulk operations
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_with_empty_ids_is_rejected_without_mutation(pool: sqlx::PgPool) {
        let coupon = seed_coupon(&pool, "KEEPME", None).await;

        let (status, json) = post_json(
            test_app(pool.clone()),
            "/api/v1/coupons/bulk",
            serde_json::json!({"ids": [], "action": "deactivate"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));

        let row = storeops_db::get_coupon_by_public_id(&pool, coupon.public_id)
            .await
            .expect("query")
            .expect("coupon still present");
        assert!(row.is_active, "no record may be touched on rejection");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_unknown_action_is_rejected(pool: sqlx::PgPool) {
        let coupon = seed_coupon(&pool, "NOOP", None).await;

        let (status, json) = post_json(
            test_app(pool),
            "/api/v1/coupons/bulk",
            serde_json::json!({"ids": [coupon.public_id], "action": "archive"}),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_deactivate_reports_affected_count(pool: sqlx::PgPool) {
        let a = seed_coupon(&pool, "BULKA", None).await;
        let b = seed_coupon(&pool, "BULKB", None).await;

        let (status, json) = post_json(
            test_app(pool.clone()),
            "/api/v1/coupons/bulk",
            serde_json::json!({"ids": [a.public_id, b.public_id], "action": "deactivate"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["count"].as_i64(), Some(2));

        let row = storeops_db::get_coupon_by_public_id(&pool, a.public_id)
            .await
            .expect("query")
            .expect("row");
        assert!(!row.is_active);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn bulk_extend_pushes_valid_until_30_days(pool: sqlx::PgPool) {
        let coupon = seed_coupon(&pool, "EXTEND", None).await;

        let (status, json) = post_json(
            test_app(pool.clone()),
            "/api/v1/coupons/bulk",
            serde_json::json!({"ids": [coupon.public_id], "action": "extend"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK, "body: {json}");
        let row = storeops_db::get_coupon_by_public_id(&pool, coupon.public_id)
            .await
            .expect("query")
            .expect("row");
        let delta = row.valid_until - coupon.valid_until;
        assert_eq!(delta.num_days(), 30);
    }

    // -------------------------------------------------------------------------
    // Coupons — analytics and export
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn coupon_analytics_reports_roi_and_redemption_rate(pool: sqlx::PgPool) {
        let customer_id =
            seed_customer_with_orders(&pool, "buyer@test.com", "Buyer", &[(5, 5_000, "COMPLETED")])
                .await;
        let order = storeops_db::list_orders_for_customer(&pool, customer_id)
            .await
            .expect("orders")
            .remove(0);

        let coupon = seed_coupon(&pool, "SUMMER10", Some(100)).await;
        sqlx::query("UPDATE coupons SET usage_count = 50 WHERE id = $1")
            .bind(coupon.id)
            .execute(&pool)
            .await
            .expect("set usage");
        storeops_db::record_redemption(
            &pool,
            coupon.id,
            order.id,
            Decimal::from(5_000),
            Decimal::from(500),
        )
        .await
        .expect("redemption");

        let (status, json) = get_json(test_app(pool), "/api/v1/coupons/analytics").await;

        assert_eq!(status, StatusCode::OK);
        let row = json["data"]["coupons"]
            .as_array()
            .expect("coupons array")
            .iter()
            .find(|r| r["code"] == "SUMMER10")
            .expect("SUMMER10 row");
        assert!((row["redemption_rate"].as_f64().unwrap() - 50.0).abs() < 1e-9);
        assert!((row["roi"].as_f64().unwrap() - 900.0).abs() < 1e-9);
        assert!((row["avg_order_value"].as_f64().unwrap() - 5_000.0).abs() < 1e-9);
        assert_eq!(json["data"]["overall"]["total_coupons"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn coupon_analytics_roi_is_null_without_discounts(pool: sqlx::PgPool) {
        seed_coupon(&pool, "NOUSE", Some(10)).await;

        let (status, json) = get_json(test_app(pool), "/api/v1/coupons/analytics").await;

        assert_eq!(status, StatusCode::OK);
        let row = &json["data"]["coupons"].as_array().expect("array")[0];
        assert!(row["roi"].is_null(), "zero discount must serialize as null");
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn export_returns_csv_with_exact_header(pool: sqlx::PgPool) {
        seed_coupon(&pool, "CSV10", Some(100)).await;

        let app = test_app(pool);
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/v1/coupons/export")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get("content-type")
                .and_then(|v| v.to_str().ok()),
            Some("text/csv")
        );
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let text = String::from_utf8(body.to_vec()).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("Code,Type,Value,Usage Count,Usage Limit,Is Active")
        );
        let row = lines.next().expect("data row");
        assert!(row.contains("\"CSV10\""), "row: {row}");
    }

    // -------------------------------------------------------------------------
    // Coupons — checkout validation
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn validate_applies_percentage_discount(pool: sqlx::PgPool) {
        seed_coupon(&pool, "TEN", None).await;

        let (status, json) = post_json(
            test_app(pool),
            "/api/v1/coupons/validate",
            serde_json::json!({"code": "ten", "subtotal": "200", "shipping_cost": "15"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["valid"].as_bool(), Some(true));
        let discount: f64 = json["data"]["discount"]
            .as_str()
            .expect("decimal string")
            .parse()
            .expect("numeric");
        assert!((discount - 20.0).abs() < 1e-9);
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn validate_unknown_code_is_404(pool: sqlx::PgPool) {
        let (status, _) = post_json(
            test_app(pool),
            "/api/v1/coupons/validate",
            serde_json::json!({"code": "GHOST", "subtotal": "200"}),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Analytics endpoints
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn rfm_summary_aggregates_segments(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "champion@test.com",
            "Champion",
            &[
                (5, 500, "COMPLETED"),
                (10, 500, "COMPLETED"),
                (15, 500, "COMPLETED"),
                (20, 500, "COMPLETED"),
                (25, 500, "COMPLETED"),
            ],
        )
        .await;
        seed_customer_with_orders(&pool, "silent@test.com", "Silent", &[]).await;

        let (status, json) = get_json(test_app(pool), "/api/v1/analytics/rfm").await;

        assert_eq!(status, StatusCode::OK);
        let segments = json["data"]["segments"].as_array().expect("segments");
        assert_eq!(segments.len(), 1, "zero-order customer is excluded");
        assert_eq!(segments[0]["segment"].as_str(), Some("CHAMPIONS"));
        assert_eq!(segments[0]["count"].as_i64(), Some(1));
        assert_eq!(json["data"]["total_customers"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rfm_detailed_view_lists_score_rows(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "recent@test.com",
            "Recent Buyer",
            &[(19, 500, "COMPLETED"), (10, 300, "COMPLETED")],
        )
        .await;

        let (status, json) = get_json(test_app(pool), "/api/v1/analytics/rfm?view=detailed").await;

        assert_eq!(status, StatusCode::OK);
        let scores = json["data"]["scores"].as_array().expect("scores");
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0]["frequency"].as_i64(), Some(2));
        assert_eq!(scores[0]["monetary"].as_str(), Some("800.00"));
        assert_eq!(scores[0]["recency_days"].as_i64(), Some(10));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn rfm_ignores_non_completed_orders(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "cancelled@test.com",
            "Cancelled Only",
            &[(10, 900, "CANCELLED")],
        )
        .await;

        let (status, json) = get_json(test_app(pool), "/api/v1/analytics/rfm?view=detailed").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["count"].as_i64(), Some(0));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn clv_projection_exceeds_current_value(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "clv@test.com",
            "High Value",
            &[
                (354, 1_000, "COMPLETED"),
                (202, 1_500, "COMPLETED"),
                (19, 2_000, "COMPLETED"),
            ],
        )
        .await;

        let (status, json) = get_json(test_app(pool), "/api/v1/analytics/clv").await;

        assert_eq!(status, StatusCode::OK);
        let rows = json["data"]["customers"].as_array().expect("customers");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["current_value"].as_str(), Some("4500.00"));
        assert!(rows[0]["ltv"].as_f64().unwrap() > 4_500.0);
        assert_eq!(json["data"]["summary"]["total_customers"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn churn_rejects_out_of_range_threshold(pool: sqlx::PgPool) {
        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/analytics/churn?days_threshold=366",
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"]["code"].as_str(), Some("validation_error"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn churn_excludes_recently_active_customers(pool: sqlx::PgPool) {
        seed_customer_with_orders(&pool, "fresh@test.com", "Fresh", &[(10, 500, "COMPLETED")])
            .await;
        seed_customer_with_orders(&pool, "stale@test.com", "Stale", &[(400, 500, "COMPLETED")])
            .await;

        let (status, json) = get_json(
            test_app(pool),
            "/api/v1/analytics/churn?days_threshold=90",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let predictions = json["data"]["predictions"].as_array().expect("predictions");
        assert_eq!(predictions.len(), 1);
        assert_eq!(predictions[0]["name"].as_str(), Some("Stale"));
        assert!(predictions[0]["recency_days"].as_i64().unwrap() > 90);
        assert_eq!(json["data"]["summary"]["total_at_risk"].as_i64(), Some(1));
    }

    // -------------------------------------------------------------------------
    // Customers
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn customers_list_carries_segment_and_pagination(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "vip@test.com",
            "Big Spender",
            &[(10, 6_000, "COMPLETED")],
        )
        .await;

        let (status, json) = get_json(test_app(pool), "/api/v1/customers").await;

        assert_eq!(status, StatusCode::OK);
        let rows = json["data"].as_array().expect("data");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["segment"].as_str(), Some("VIP"));
        assert_eq!(rows[0]["total_orders"].as_i64(), Some(1));
        assert_eq!(json["pagination"]["total"].as_i64(), Some(1));
        assert_eq!(json["summary"]["total_customers"].as_i64(), Some(1));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn customers_list_filters_by_segment(pool: sqlx::PgPool) {
        seed_customer_with_orders(
            &pool,
            "vip@test.com",
            "Big Spender",
            &[(10, 6_000, "COMPLETED")],
        )
        .await;
        seed_customer_with_orders(
            &pool,
            "small@test.com",
            "Small Spender",
            &[(400, 100, "COMPLETED")],
        )
        .await;

        let (status, json) = get_json(test_app(pool), "/api/v1/customers?segment=VIP").await;

        assert_eq!(status, StatusCode::OK);
        let rows = json["data"].as_array().expect("data");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"].as_str(), Some("Big Spender"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn customer_detail_returns_404_for_unknown_id(pool: sqlx::PgPool) {
        let (status, _) = get_json(
            test_app(pool),
            "/api/v1/customers/00000000-0000-0000-0000-000000000000",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    // -------------------------------------------------------------------------
    // Campaigns
    // -------------------------------------------------------------------------

    #[sqlx::test(migrations = "../../migrations")]
    async fn campaign_calendar_round_trip(pool: sqlx::PgPool) {
        let (status, json) = post_json(
            test_app(pool.clone()),
            "/api/v1/campaigns",
            serde_json::json!({
                "name": "Spring Sale",
                "status": "ACTIVE",
                "starts_on": "2025-03-01",
                "ends_on": "2025-03-31"
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "body: {json}");
        let campaign_id = json["data"]["id"].as_str().expect("campaign id").to_string();

        let (status, json) = post_json(
            test_app(pool.clone()),
            &format!("/api/v1/campaigns/{campaign_id}/events"),
            serde_json::json!({"title": "Email blast", "event_date": "2025-03-05"}),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "body: {json}");

        let (status, json) = get_json(
            test_app(pool),
            &format!("/api/v1/campaigns/{campaign_id}/events"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let events = json["data"].as_array().expect("events");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["title"].as_str(), Some("Email blast"));
    }

    #[sqlx::test(migrations = "../../migrations")]
    async fn campaign_events_404_for_unknown_campaign(pool: sqlx::PgPool) {
        let (status, _) = get_json(
            test_app(pool),
            "/api/v1/campaigns/00000000-0000-0000-0000-000000000000/events",
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
