//! Campaign and calendar-event handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const CAMPAIGN_STATUSES: [&str; 4] = ["DRAFT", "ACTIVE", "PAUSED", "COMPLETED"];

#[derive(Debug, Serialize)]
pub(super) struct CampaignItem {
    id: Uuid,
    name: String,
    description: Option<String>,
    status: String,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub(super) struct EventItem {
    id: Uuid,
    title: String,
    event_date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateCampaignRequest {
    pub name: String,
    pub description: Option<String>,
    pub status: Option<String>,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateEventRequest {
    pub title: String,
    pub event_date: NaiveDate,
    pub notes: Option<String>,
}

impl From<storeops_db::CampaignRow> for CampaignItem {
    fn from(row: storeops_db::CampaignRow) -> Self {
        Self {
            id: row.public_id,
            name: row.name,
            description: row.description,
            status: row.status,
            starts_on: row.starts_on,
            ends_on: row.ends_on,
            created_at: row.created_at,
        }
    }
}

impl From<storeops_db::CampaignEventRow> for EventItem {
    fn from(row: storeops_db::CampaignEventRow) -> Self {
        Self {
            id: row.public_id,
            title: row.title,
            event_date: row.event_date,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

async fn resolve_campaign(
    state: &AppState,
    req_id: &str,
    public_id: Uuid,
) -> Result<storeops_db::CampaignRow, ApiError> {
    storeops_db::get_campaign_by_public_id(&state.pool, public_id)
        .await
        .map_err(|e| map_db_error(req_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(req_id, "not_found", "campaign not found"))
}

/// GET /api/v1/campaigns
pub(super) async fn list_campaigns(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Vec<CampaignItem>>>, ApiError> {
    let rows = storeops_db::list_campaigns(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(CampaignItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/campaigns
pub(super) async fn create_campaign(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<ApiResponse<CampaignItem>>), ApiError> {
    let rid = &req_id.0;

    let name = body.name.trim();
    if name.is_empty() || name.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "name must be 1–200 characters",
        ));
    }
    if body.starts_on > body.ends_on {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "starts_on must not be after ends_on",
        ));
    }
    let status = body.status.as_deref().unwrap_or("DRAFT");
    if !CAMPAIGN_STATUSES.contains(&status) {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("status must be one of {CAMPAIGN_STATUSES:?}, got '{status}'"),
        ));
    }

    let row = storeops_db::create_campaign(
        &state.pool,
        name,
        body.description.as_deref(),
        status,
        body.starts_on,
        body.ends_on,
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: CampaignItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// GET /api/v1/campaigns/{id}/events
pub(super) async fn list_events(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Vec<EventItem>>>, ApiError> {
    let campaign = resolve_campaign(&state, &req_id.0, id).await?;

    let rows = storeops_db::list_events_for_campaign(&state.pool, campaign.id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(EventItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/campaigns/{id}/events
pub(super) async fn create_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<Uuid>,
    Json(body): Json<CreateEventRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EventItem>>), ApiError> {
    let rid = &req_id.0;

    let title = body.title.trim();
    if title.is_empty() || title.len() > 200 {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "title must be 1–200 characters",
        ));
    }

    let campaign = resolve_campaign(&state, rid, id).await?;

    let row = storeops_db::create_event(
        &state.pool,
        campaign.id,
        title,
        body.event_date,
        body.notes.as_deref(),
    )
    .await
    .map_err(|e| map_db_error(rid.clone(), &e))?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: EventItem::from(row),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// DELETE /api/v1/campaigns/{id}/events/{event_id}
pub(super) async fn delete_event(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path((id, event_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let campaign = resolve_campaign(&state, &req_id.0, id).await?;

    let removed = storeops_db::delete_event(&state.pool, campaign.id, event_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    if removed == 0 {
        return Err(ApiError::new(req_id.0, "not_found", "event not found"));
    }

    Ok(Json(ApiResponse {
        data: serde_json::json!({"deleted": true}),
        meta: ResponseMeta::new(req_id.0),
    }))
}
