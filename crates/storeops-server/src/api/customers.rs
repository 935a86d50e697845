//! Customer listing and detail handlers with derived metrics and segments.

use std::collections::BTreeMap;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storeops_core::{
    classify_customer, CustomerMetrics, CustomerSegment, OrderFilter, OrderStatus, OrderSummary,
};

use crate::middleware::RequestId;

use super::{
    map_db_error, normalize_limit, normalize_page, ApiError, ApiResponse, AppState, Pagination,
    ResponseMeta,
};

// Metric derivation counts every order (a pending order still reflects
// engagement); the analytics endpoints score COMPLETED orders only.
const ORDER_FILTER: OrderFilter = OrderFilter::All;

#[derive(Debug, Deserialize)]
pub(super) struct CustomersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub segment: Option<String>,
    pub search: Option<String>,
    pub min_lifetime_value: Option<i64>,
    pub max_lifetime_value: Option<i64>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomerListItem {
    id: Uuid,
    email: String,
    name: String,
    phone: Option<String>,
    city: Option<String>,
    country: Option<String>,
    created_at: DateTime<Utc>,
    total_orders: u64,
    lifetime_value: Decimal,
    average_order_value: Decimal,
    last_order_date: Option<DateTime<Utc>>,
    segment: CustomerSegment,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomersSummary {
    total_customers: usize,
    total_revenue: Decimal,
    average_lifetime_value: f64,
    segment_counts: BTreeMap<&'static str, usize>,
}

/// Listing envelope: `{data, pagination, summary, meta}`.
#[derive(Debug, Serialize)]
pub(super) struct CustomersResponse {
    data: Vec<CustomerListItem>,
    pagination: Pagination,
    summary: CustomersSummary,
    meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomerInsights {
    repeat_purchase_rate: f64,
    orders_per_month: f64,
    risk_level: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct CustomerDetail {
    #[serde(flatten)]
    customer: CustomerListItem,
    insights: CustomerInsights,
}

/// GET /api/v1/customers — segmented listing with filters and a summary
/// block.
///
/// Segments are derived per request, so filtering happens in memory after
/// scoring: filter first, then paginate, so `total` reflects the filtered
/// population.
pub(super) async fn list_customers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<CustomersQuery>,
) -> Result<Json<CustomersResponse>, ApiError> {
    let segment_filter = query
        .segment
        .as_deref()
        .map(|raw| {
            CustomerSegment::parse(raw).ok_or_else(|| {
                ApiError::new(
                    req_id.0.clone(),
                    "validation_error",
                    format!("unknown segment '{raw}'"),
                )
            })
        })
        .transpose()?;

    let page = normalize_page(query.page);
    let limit = normalize_limit(query.limit);

    let customers = storeops_db::list_all_customers(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let histories = storeops_db::load_customer_histories(&state.pool, &customers)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let now = Utc::now();
    let mut items: Vec<CustomerListItem> = customers
        .iter()
        .zip(histories.iter())
        .map(|(row, history)| {
            let orders = history.qualifying_orders(ORDER_FILTER);
            let metrics = CustomerMetrics::from_orders(&orders);
            let segment =
                classify_customer(row.created_at, &metrics, now, &state.thresholds.segments);
            CustomerListItem {
                id: row.public_id,
                email: row.email.clone(),
                name: row.name.clone(),
                phone: row.phone.clone(),
                city: row.city.clone(),
                country: row.country.clone(),
                created_at: row.created_at,
                total_orders: metrics.total_orders,
                lifetime_value: metrics.lifetime_value,
                average_order_value: metrics.average_order_value,
                last_order_date: metrics.last_order_date,
                segment,
            }
        })
        .collect();

    let summary = summarize(&items);

    if let Some(segment) = segment_filter {
        items.retain(|c| c.segment == segment);
    }
    if let Some(search) = query.search.as_deref() {
        let needle = search.to_lowercase();
        items.retain(|c| {
            c.name.to_lowercase().contains(&needle) || c.email.to_lowercase().contains(&needle)
        });
    }
    if let Some(min) = query.min_lifetime_value {
        items.retain(|c| c.lifetime_value >= Decimal::from(min));
    }
    if let Some(max) = query.max_lifetime_value {
        items.retain(|c| c.lifetime_value <= Decimal::from(max));
    }
    if let Some(start) = query.start_date {
        items.retain(|c| c.created_at.date_naive() >= start);
    }
    if let Some(end) = query.end_date {
        items.retain(|c| c.created_at.date_naive() <= end);
    }

    let total = items.len() as i64;
    let offset = usize::try_from((page - 1) * limit).unwrap_or(usize::MAX);
    let data: Vec<CustomerListItem> = items
        .into_iter()
        .skip(offset)
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect();

    Ok(Json(CustomersResponse {
        data,
        pagination: Pagination::new(page, limit, total),
        summary,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/customers/{id} — detail row with derived insights.
pub(super) async fn get_customer(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<CustomerDetail>>, ApiError> {
    let row = storeops_db::get_customer_by_public_id(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "customer not found"))?;

    let order_rows = storeops_db::list_orders_for_customer(&state.pool, row.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let orders: Vec<OrderSummary> = order_rows
        .into_iter()
        .filter_map(|o| {
            OrderStatus::parse(&o.status).map(|status| OrderSummary {
                created_at: o.created_at,
                total: o.total,
                status,
            })
        })
        .collect();
    let order_refs: Vec<&OrderSummary> = orders
        .iter()
        .filter(|o| ORDER_FILTER.qualifies(o.status))
        .collect();

    let now = Utc::now();
    let metrics = CustomerMetrics::from_orders(&order_refs);
    let segment = classify_customer(row.created_at, &metrics, now, &state.thresholds.segments);

    let repeat_purchase_rate = if metrics.total_orders > 1 {
        (metrics.total_orders - 1) as f64 / metrics.total_orders as f64 * 100.0
    } else {
        0.0
    };
    let account_age_months =
        ((now - row.created_at).num_days().max(1) as f64 / 30.44).max(1.0);
    let orders_per_month = metrics.total_orders as f64 / account_age_months;
    let risk_level = match segment {
        CustomerSegment::AtRisk | CustomerSegment::Inactive => "high",
        _ => "low",
    };

    let detail = CustomerDetail {
        customer: CustomerListItem {
            id: row.public_id,
            email: row.email,
            name: row.name,
            phone: row.phone,
            city: row.city,
            country: row.country,
            created_at: row.created_at,
            total_orders: metrics.total_orders,
            lifetime_value: metrics.lifetime_value,
            average_order_value: metrics.average_order_value,
            last_order_date: metrics.last_order_date,
            segment,
        },
        insights: CustomerInsights {
            repeat_purchase_rate,
            orders_per_month,
            risk_level,
        },
    };

    Ok(Json(ApiResponse {
        data: detail,
        meta: ResponseMeta::new(req_id.0),
    }))
}

fn summarize(items: &[CustomerListItem]) -> CustomersSummary {
    let total_revenue: Decimal = items.iter().map(|c| c.lifetime_value).sum();
    let average_lifetime_value = if items.is_empty() {
        0.0
    } else {
        use rust_decimal::prelude::ToPrimitive;
        (total_revenue / Decimal::from(items.len() as u64))
            .to_f64()
            .unwrap_or(0.0)
    };

    let mut segment_counts: BTreeMap<&'static str, usize> = BTreeMap::new();
    for item in items {
        *segment_counts.entry(item.segment.as_str()).or_insert(0) += 1;
    }

    CustomersSummary {
        total_customers: items.len(),
        total_revenue,
        average_lifetime_value,
        segment_counts,
    }
}
