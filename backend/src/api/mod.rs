mod admin;
mod extract;
mod requests;

use axum::Json;
use axum::routing::{post, put};
use axum::{Router, extract::State, http::StatusCode, routing::get};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::db::accounts;
use crate::error::AppError;
use crate::models::*;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/student/signup", post(student_signup))
        .route("/auth/student/verify-otp", post(student_verify_otp))
        .route("/auth/student/login", post(student_login))
        .route("/auth/cleaner/login", post(cleaner_login))
        .route("/auth/admin/login", post(admin_login))
        .route("/requests", post(requests::create_request))
        .route("/requests/active", get(requests::active_request))
        .route("/requests/history", get(requests::history))
        .route("/requests/pending", get(requests::pending_for_cleaner))
        .route("/requests/assigned", get(requests::assigned_to_cleaner))
        .route("/requests/{id}/accept", put(requests::accept_request))
        .route("/requests/{id}/complete", put(requests::complete_request))
        .route("/requests/{id}/rate", put(requests::rate_request))
        .route("/students/roommates", get(roommates))
        .route("/cleaner/dashboard", get(requests::cleaner_dashboard))
        .route("/admin/stats", get(admin::stats))
        .route("/admin/requests", get(admin::list_requests))
        .route("/admin/cleaners", get(admin::list_cleaners).post(admin::create_cleaner))
        .route(
            "/admin/cleaners/{id}",
            put(admin::update_cleaner).delete(admin::delete_cleaner),
        )
        .route("/admin/cleaners/{id}/stats", get(admin::cleaner_stats))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    sqlx::query("select 1").execute(&state.db).await?;
    Ok(StatusCode::OK)
}

#[derive(Serialize)]
struct OtpIssued {
    message: &'static str,
    expires_at: DateTime<Utc>,
}

async fn student_signup(
    State(state): State<AppState>,
    Json(req): Json<SignupRequest>,
) -> Result<Json<OtpIssued>, AppError> {
    let expires_at = state.signup.request_otp(&req, Utc::now()).await?;
    Ok(Json(OtpIssued {
        message: "OTP sent to your email",
        expires_at,
    }))
}

async fn student_verify_otp(
    State(state): State<AppState>,
    Json(req): Json<VerifyOtpRequest>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let student = state.signup.verify_otp(&req, Utc::now()).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

async fn student_login(
    State(state): State<AppState>,
    Json(req): Json<StudentLogin>,
) -> Result<Json<TokenResponse<Student>>, AppError> {
    Ok(Json(state.auth.login_student(&req, Utc::now()).await?))
}

async fn cleaner_login(
    State(state): State<AppState>,
    Json(req): Json<CleanerLogin>,
) -> Result<Json<TokenResponse<Cleaner>>, AppError> {
    Ok(Json(state.auth.login_cleaner(&req, Utc::now()).await?))
}

async fn admin_login(
    State(state): State<AppState>,
    Json(req): Json<AdminLogin>,
) -> Result<Json<TokenResponse<Admin>>, AppError> {
    Ok(Json(state.auth.login_admin(&req, Utc::now()).await?))
}

async fn roommates(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Roommate>>, AppError> {
    let group_id = extract::student_group(&actor)?;
    let roommates = accounts::fetch_roommates(&state.db, group_id).await?;
    Ok(Json(roommates))
}
