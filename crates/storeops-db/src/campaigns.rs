//! Database operations for campaigns and their calendar events.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `campaigns` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignRow {
    pub id: i64,
    pub public_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub starts_on: NaiveDate,
    pub ends_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row from the `campaign_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CampaignEventRow {
    pub id: i64,
    pub public_id: Uuid,
    pub campaign_id: i64,
    pub title: String,
    pub event_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

const CAMPAIGN_COLUMNS: &str =
    "id, public_id, name, description, status, starts_on, ends_on, created_at, updated_at";

const EVENT_COLUMNS: &str = "id, public_id, campaign_id, title, event_date, notes, created_at";

/// Returns all campaigns, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_campaigns(pool: &PgPool) -> Result<Vec<CampaignRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns ORDER BY created_at DESC",
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Returns a single campaign by public id, or `None` if not found.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_campaign_by_public_id(
    pool: &PgPool,
    public_id: Uuid,
) -> Result<Option<CampaignRow>, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "SELECT {CAMPAIGN_COLUMNS} FROM campaigns WHERE public_id = $1",
    ))
    .bind(public_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Creates a campaign and returns the full inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_campaign(
    pool: &PgPool,
    name: &str,
    description: Option<&str>,
    status: &str,
    starts_on: NaiveDate,
    ends_on: NaiveDate,
) -> Result<CampaignRow, DbError> {
    let row = sqlx::query_as::<_, CampaignRow>(&format!(
        "INSERT INTO campaigns (name, description, status, starts_on, ends_on) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING {CAMPAIGN_COLUMNS}",
    ))
    .bind(name)
    .bind(description)
    .bind(status)
    .bind(starts_on)
    .bind(ends_on)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Returns a campaign's calendar events in date order.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_events_for_campaign(
    pool: &PgPool,
    campaign_id: i64,
) -> Result<Vec<CampaignEventRow>, DbError> {
    let rows = sqlx::query_as::<_, CampaignEventRow>(&format!(
        "SELECT {EVENT_COLUMNS} FROM campaign_events \
         WHERE campaign_id = $1 ORDER BY event_date, id",
    ))
    .bind(campaign_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Creates a calendar event under a campaign and returns the inserted row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn create_event(
    pool: &PgPool,
    campaign_id: i64,
    title: &str,
    event_date: NaiveDate,
    notes: Option<&str>,
) -> Result<CampaignEventRow, DbError> {
    let row = sqlx::query_as::<_, CampaignEventRow>(&format!(
        "INSERT INTO campaign_events (campaign_id, title, event_date, notes) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {EVENT_COLUMNS}",
    ))
    .bind(campaign_id)
    .bind(title)
    .bind(event_date)
    .bind(notes)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Deletes an event, scoped to its campaign; returns the rows removed (0 or 1).
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn delete_event(
    pool: &PgPool,
    campaign_id: i64,
    event_public_id: Uuid,
) -> Result<u64, DbError> {
    let result =
        sqlx::query("DELETE FROM campaign_events WHERE campaign_id = $1 AND public_id = $2")
            .bind(campaign_id)
            .bind(event_public_id)
            .execute(pool)
            .await?;
    Ok(result.rows_affected())
}

/// Attaches a coupon to a campaign; idempotent.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn attach_coupon(pool: &PgPool, campaign_id: i64, coupon_id: i64) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO campaign_coupons (campaign_id, coupon_id) \
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(campaign_id)
    .bind(coupon_id)
    .execute(pool)
    .await?;
    Ok(())
}

