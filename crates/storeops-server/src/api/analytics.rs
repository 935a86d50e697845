//! Customer analytics endpoints: RFM, CLV, and churn.
//!
//! Each request loads the full customer population with order history and
//! recomputes scores in memory — no cached or persisted analytics state.

use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use storeops_core::{
    predict_churn, project_clv, score_customers, segment_summary, ChurnPrediction, ChurnRisk,
    ClvProjection, CustomerHistory, OrderFilter, RfmScore, SegmentSummary, ValueSegment,
};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_analytics_limit, ApiError, ApiResponse, AppState, ResponseMeta,
};

/// Lower and upper bounds accepted for the churn lookback window, in days.
const CHURN_THRESHOLD_RANGE: std::ops::RangeInclusive<i64> = 7..=365;
const DEFAULT_CHURN_THRESHOLD_DAYS: i64 = 90;

// All three endpoints score only COMPLETED orders; the policy is set here
// once rather than decided per function.
const ORDER_FILTER: OrderFilter = OrderFilter::CompletedOnly;

#[derive(Debug, Deserialize)]
pub(super) struct RfmQuery {
    pub view: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(super) enum RfmData {
    Summary {
        segments: Vec<SegmentSummary>,
        total_customers: u64,
        total_revenue: Decimal,
    },
    Detailed {
        scores: Vec<RfmScore>,
        count: usize,
    },
}

#[derive(Debug, Deserialize)]
pub(super) struct ClvQuery {
    pub segment: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ClvSummary {
    total_customers: usize,
    high_value: usize,
    medium_value: usize,
    low_value: usize,
    total_ltv: f64,
    average_ltv: f64,
    total_current_value: Decimal,
}

#[derive(Debug, Serialize)]
pub(super) struct ClvData {
    customers: Vec<ClvProjection>,
    summary: ClvSummary,
    count: usize,
}

#[derive(Debug, Deserialize)]
pub(super) struct ChurnQuery {
    pub days_threshold: Option<i64>,
    pub risk_level: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct ChurnSummary {
    total_at_risk: usize,
    high_risk: usize,
    medium_risk: usize,
    low_risk: usize,
    average_churn_probability: f64,
}

#[derive(Debug, Serialize)]
pub(super) struct ChurnData {
    predictions: Vec<ChurnPrediction>,
    summary: ChurnSummary,
    count: usize,
    days_threshold: i64,
}

async fn load_histories(
    state: &AppState,
    req_id: &str,
) -> Result<Vec<CustomerHistory>, ApiError> {
    let customers = storeops_db::list_all_customers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?;
    storeops_db::load_customer_histories(&state.pool, &customers)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))
}

/// GET /api/v1/analytics/rfm — segment summary by default, score rows with
/// `view=detailed`.
pub(super) async fn rfm_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<RfmQuery>,
) -> Result<Json<ApiResponse<RfmData>>, ApiError> {
    let histories = load_histories(&state, &req_id.0).await?;
    let scores = score_customers(&histories, Utc::now(), ORDER_FILTER, &state.thresholds.rfm);

    let data = if query.view.as_deref() == Some("detailed") {
        RfmData::Detailed {
            count: scores.len(),
            scores,
        }
    } else {
        let segments = segment_summary(&scores);
        RfmData::Summary {
            total_customers: segments.iter().map(|s| s.count).sum(),
            total_revenue: segments.iter().map(|s| s.revenue).sum(),
            segments,
        }
    };

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/analytics/clv — lifetime-value projections with a summary
/// block; optional `segment=high|medium|low` filter.
pub(super) async fn clv_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ClvQuery>,
) -> Result<Json<ApiResponse<ClvData>>, ApiError> {
    let segment_filter = match query.segment.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(ValueSegment::parse(raw).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("segment must be high, medium, low, or all, got '{raw}'"),
            )
        })?),
    };
    let limit = normalize_analytics_limit(query.limit);

    let histories = load_histories(&state, &req_id.0).await?;
    let mut projections = project_clv(&histories, Utc::now(), ORDER_FILTER, &state.thresholds.clv);
    projections.sort_by(|a, b| b.ltv.partial_cmp(&a.ltv).unwrap_or(std::cmp::Ordering::Equal));

    let count_of = |segment: ValueSegment| {
        projections
            .iter()
            .filter(|p| p.value_segment == segment)
            .count()
    };
    let total_ltv: f64 = projections.iter().map(|p| p.ltv).sum();
    let summary = ClvSummary {
        total_customers: projections.len(),
        high_value: count_of(ValueSegment::High),
        medium_value: count_of(ValueSegment::Medium),
        low_value: count_of(ValueSegment::Low),
        total_ltv,
        average_ltv: if projections.is_empty() {
            0.0
        } else {
            total_ltv / projections.len() as f64
        },
        total_current_value: projections.iter().map(|p| p.current_value).sum(),
    };

    let mut customers: Vec<ClvProjection> = match segment_filter {
        Some(segment) => projections
            .into_iter()
            .filter(|p| p.value_segment == segment)
            .collect(),
        None => projections,
    };
    customers.truncate(limit);

    Ok(Json(ApiResponse {
        data: ClvData {
            count: customers.len(),
            summary,
            customers,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/analytics/churn — at-risk customers past the lookback window.
pub(super) async fn churn_analysis(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ChurnQuery>,
) -> Result<Json<ApiResponse<ChurnData>>, ApiError> {
    let days_threshold = query.days_threshold.unwrap_or(DEFAULT_CHURN_THRESHOLD_DAYS);
    if !CHURN_THRESHOLD_RANGE.contains(&days_threshold) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!(
                "days_threshold must be between {} and {}, got {days_threshold}",
                CHURN_THRESHOLD_RANGE.start(),
                CHURN_THRESHOLD_RANGE.end()
            ),
        ));
    }

    let risk_filter = match query.risk_level.as_deref() {
        None | Some("all") => None,
        Some(raw) => Some(ChurnRisk::parse(raw).ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "validation_error",
                format!("risk_level must be low, medium, high, or all, got '{raw}'"),
            )
        })?),
    };
    let limit = normalize_analytics_limit(query.limit);

    let histories = load_histories(&state, &req_id.0).await?;
    let predictions = predict_churn(
        &histories,
        Utc::now(),
        days_threshold,
        ORDER_FILTER,
        &state.thresholds.churn,
    );

    let count_of = |risk: ChurnRisk| predictions.iter().filter(|p| p.churn_risk == risk).count();
    let summary = ChurnSummary {
        total_at_risk: predictions.len(),
        high_risk: count_of(ChurnRisk::High),
        medium_risk: count_of(ChurnRisk::Medium),
        low_risk: count_of(ChurnRisk::Low),
        average_churn_probability: if predictions.is_empty() {
            0.0
        } else {
            predictions.iter().map(|p| p.churn_probability).sum::<f64>()
                / predictions.len() as f64
        },
    };

    let mut filtered: Vec<ChurnPrediction> = match risk_filter {
        Some(risk) => predictions
            .into_iter()
            .filter(|p| p.churn_risk == risk)
            .collect(),
        None => predictions,
    };
    filtered.truncate(limit);

    Ok(Json(ApiResponse {
        data: ChurnData {
            count: filtered.len(),
            predictions: filtered,
            summary,
            days_threshold,
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}
