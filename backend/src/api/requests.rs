use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;
use serde::Deserialize;

use super::extract::{cleaner_id, student_group};
use crate::error::AppError;
use crate::models::*;
use crate::services::CleanerDashboard;
use crate::state::AppState;

const DEFAULT_HISTORY_PAGE: i64 = 5;

#[derive(Deserialize)]
pub(super) struct HistoryParams {
    #[serde(default)]
    limit: Option<i64>,
}

pub(super) async fn create_request(
    State(state): State<AppState>,
    actor: Actor,
    body: Option<Json<NewCleaningRequest>>,
) -> Result<(StatusCode, Json<OwnedRequest>), AppError> {
    let group_id = student_group(&actor)?.to_string();
    let input = body.map(|Json(b)| b).unwrap_or_default();

    let request = state
        .lifecycle
        .create_request(&actor, &group_id, input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub(super) async fn active_request(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Option<OwnedRequest>>, AppError> {
    Ok(Json(state.lifecycle.active_for_group(&actor).await?))
}

pub(super) async fn history(
    State(state): State<AppState>,
    actor: Actor,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<CleaningRequest>>, AppError> {
    let group_id = student_group(&actor)?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_PAGE);
    let history = state.lifecycle.list_history_for_group(group_id, limit).await?;
    Ok(Json(history))
}

pub(super) async fn rate_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<RateRequestBody>,
) -> Result<Json<CleaningRequest>, AppError> {
    let request = state
        .lifecycle
        .rate_request(&actor, &id, req.rating, req.feedback)
        .await?;
    Ok(Json(request))
}

pub(super) async fn cleaner_dashboard(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<CleanerDashboard>, AppError> {
    cleaner_id(&actor)?;
    Ok(Json(state.lifecycle.cleaner_dashboard(&actor, Utc::now()).await?))
}

pub(super) async fn pending_for_cleaner(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<CleaningRequest>>, AppError> {
    cleaner_id(&actor)?;
    let pending = state
        .lifecycle
        .list_pending_for_cleaner(&actor, Utc::now())
        .await?;
    Ok(Json(pending))
}

pub(super) async fn assigned_to_cleaner(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<CleaningRequest>>, AppError> {
    let id = cleaner_id(&actor)?;
    let active = state.lifecycle.list_active_for_cleaner(id, Utc::now()).await?;
    Ok(Json(active))
}

pub(super) async fn accept_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<CleaningRequest>, AppError> {
    let request = state.lifecycle.accept_request(&actor, &id, Utc::now()).await?;
    Ok(Json(request))
}

pub(super) async fn complete_request(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<CompleteRequestBody>,
) -> Result<Json<CleaningRequest>, AppError> {
    let request = state
        .lifecycle
        .complete_request(&actor, &id, &req.secret, Utc::now())
        .await?;
    Ok(Json(request))
}
