use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use chrono::Utc;

use super::extract::AdminActor;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub(super) async fn stats(
    State(state): State<AppState>,
    _admin: AdminActor,
) -> Result<Json<AdminStats>, AppError> {
    Ok(Json(state.admin.compute_stats(Utc::now()).await?))
}

pub(super) async fn list_requests(
    State(state): State<AppState>,
    _admin: AdminActor,
    Query(filter): Query<RequestFilter>,
) -> Result<Json<Vec<CleaningRequest>>, AppError> {
    Ok(Json(state.admin.list_requests(&filter).await?))
}

pub(super) async fn list_cleaners(
    State(state): State<AppState>,
    _admin: AdminActor,
) -> Result<Json<Vec<Cleaner>>, AppError> {
    Ok(Json(state.admin.list_cleaners().await?))
}

pub(super) async fn create_cleaner(
    State(state): State<AppState>,
    _admin: AdminActor,
    Json(req): Json<NewCleanerRequest>,
) -> Result<(StatusCode, Json<Cleaner>), AppError> {
    let cleaner = state.admin.create_cleaner(&req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(cleaner)))
}

pub(super) async fn update_cleaner(
    State(state): State<AppState>,
    _admin: AdminActor,
    Path(id): Path<String>,
    Json(req): Json<UpdateCleanerRequest>,
) -> Result<Json<Cleaner>, AppError> {
    Ok(Json(state.admin.update_cleaner(&id, &req).await?))
}

pub(super) async fn delete_cleaner(
    State(state): State<AppState>,
    _admin: AdminActor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.admin.delete_cleaner(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn cleaner_stats(
    State(state): State<AppState>,
    _admin: AdminActor,
    Path(id): Path<String>,
) -> Result<Json<CleanerStats>, AppError> {
    Ok(Json(state.admin.cleaner_stats(&id).await?))
}
