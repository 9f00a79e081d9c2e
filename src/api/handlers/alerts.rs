use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::suggest_title;
use crate::errors::AppError;
use crate::models::{
    Alert, AlertFilter, AlertStatus, AlertTrigger, AlertType, NewAlert, TriggerReview,
    TriggerStats,
};
use crate::AppState;

use super::ApiResponse;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: AlertStatus,
    pub snooze_until: Option<DateTime<Utc>>,
    /// Relative alternative to `snooze_until`.
    pub snooze_hours: Option<i64>,
}

#[derive(Deserialize)]
pub struct FireRequest {
    pub price: Decimal,
}

#[derive(Deserialize)]
pub struct ReviewTriggerRequest {
    pub action: TriggerReview,
}

#[derive(Deserialize)]
pub struct ListQuery {
    pub status: Option<AlertStatus>,
    pub symbol: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TitleQuery {
    pub symbol: String,
    pub alert_type: AlertType,
    pub target_value: Option<Decimal>,
    pub percentage_value: Option<Decimal>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireResponse {
    pub alert: Alert,
    pub trigger: AlertTrigger,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerHistory {
    pub triggers: Vec<AlertTrigger>,
    pub stats: TriggerStats,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/alerts — create an alert
pub async fn create(
    State(state): State<AppState>,
    body: Result<Json<NewAlert>, JsonRejection>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let Json(body) = body?;
    let alert = state.alerts.create_alert(body).await?;

    Ok(Json(ApiResponse::ok(alert)))
}

/// GET /api/alerts — all alerts, newest first, optionally filtered
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let filter = AlertFilter {
        status: query.status,
        symbol: query.symbol.filter(|s| !s.trim().is_empty()),
    };
    let alerts = state.alerts.list(&filter).await?;

    Ok(Json(ApiResponse::ok(alerts)))
}

/// GET /api/alerts/active — active alerts, newest first
pub async fn list_active(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Alert>>>, AppError> {
    let alerts = state.alerts.list_active().await?;

    Ok(Json(ApiResponse::ok(alerts)))
}

/// GET /api/alerts/{id}
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let alert = state.alerts.get_alert(id).await?;

    Ok(Json(ApiResponse::ok(alert)))
}

/// PATCH /api/alerts/{id}/status — move an alert through its lifecycle
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<UpdateStatusRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Alert>>, AppError> {
    let Json(body) = body?;

    let snooze_until = match (body.status, body.snooze_until, body.snooze_hours) {
        (AlertStatus::Snoozed, None, hours) => {
            let hours = hours.unwrap_or(state.config.snooze_default_hours);
            let until = Duration::try_hours(hours)
                .and_then(|d| Utc::now().checked_add_signed(d))
                .ok_or_else(|| {
                    AppError::BadRequest(format!("snoozeHours {hours} is out of range"))
                })?;
            Some(until)
        }
        (_, until, _) => until,
    };

    let alert = state
        .alerts
        .update_status(id, body.status, snooze_until)
        .await?;

    Ok(Json(ApiResponse::ok(alert)))
}

/// POST /api/alerts/{id}/fire — fire an active alert at a given price
pub async fn fire(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    body: Result<Json<FireRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FireResponse>>, AppError> {
    let Json(body) = body?;
    let (alert, trigger) = state.alerts.fire(id, body.price).await?;

    Ok(Json(ApiResponse::ok(FireResponse { alert, trigger })))
}

/// GET /api/alerts/{id}/triggers — firing history with outcome stats
pub async fn triggers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TriggerHistory>>, AppError> {
    let triggers = state.alerts.triggers(id).await?;
    let stats = TriggerStats::from_triggers(&triggers);

    Ok(Json(ApiResponse::ok(TriggerHistory { triggers, stats })))
}

/// PATCH /api/alerts/{id}/triggers/{trigger_id} — acknowledge or dismiss a trigger
pub async fn review_trigger(
    State(state): State<AppState>,
    Path((id, trigger_id)): Path<(Uuid, Uuid)>,
    body: Result<Json<ReviewTriggerRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<AlertTrigger>>, AppError> {
    let Json(body) = body?;
    let trigger = state
        .alerts
        .review_trigger(id, trigger_id, body.action)
        .await?;

    Ok(Json(ApiResponse::ok(trigger)))
}

/// DELETE /api/alerts/{id} — idempotent removal
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.alerts.delete_alert(id).await?;

    Ok(Json(ApiResponse::ok(())))
}

/// GET /api/alerts/title-suggestion — default title for the alert form
pub async fn title_suggestion(
    Query(query): Query<TitleQuery>,
) -> Json<ApiResponse<String>> {
    Json(ApiResponse::ok(suggest_title(
        &query.symbol,
        query.alert_type,
        query.target_value,
        query.percentage_value,
    )))
}
