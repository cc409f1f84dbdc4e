use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::models::{BlockCount, CleanerJob, RequestStatus, Review};

pub async fn count_requests(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM requests")
        .fetch_one(db)
        .await
}

pub async fn count_requests_since(
    db: &SqlitePool,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE created_at >= ?")
        .bind(since)
        .fetch_one(db)
        .await
}

pub async fn count_requests_by_status(
    db: &SqlitePool,
    status: RequestStatus,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE status = ?")
        .bind(status)
        .fetch_one(db)
        .await
}

/// Mean hours between acceptance and completion over completed requests.
pub async fn avg_completion_hours(db: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        SELECT AVG((julianday(completed_at) - julianday(accepted_at)) * 24.0)
        FROM requests
        WHERE status = ? AND completed_at IS NOT NULL AND accepted_at IS NOT NULL
        "#,
    )
    .bind(RequestStatus::Completed)
    .fetch_one(db)
    .await
}

pub async fn avg_rating(db: &SqlitePool) -> Result<Option<f64>, sqlx::Error> {
    sqlx::query_scalar("SELECT AVG(rating) FROM requests WHERE rating IS NOT NULL")
        .fetch_one(db)
        .await
}

pub async fn requests_by_block(db: &SqlitePool) -> Result<Vec<BlockCount>, sqlx::Error> {
    sqlx::query_as::<_, BlockCount>(
        r#"
        SELECT block, COUNT(*) AS count
        FROM requests
        GROUP BY block
        ORDER BY count DESC, block ASC
        "#,
    )
    .fetch_all(db)
    .await
}

pub async fn recent_reviews(db: &SqlitePool, limit: i64) -> Result<Vec<Review>, sqlx::Error> {
    sqlx::query_as::<_, Review>(
        r#"
        SELECT r.request_code, r.block, r.room_no,
               s.name AS student, c.name AS cleaner,
               r.rating, r.feedback, r.completed_at
        FROM requests r
        LEFT JOIN students s ON s.id = r.requested_by
        LEFT JOIN cleaners c ON c.id = r.cleaner_id
        WHERE r.rating IS NOT NULL
        ORDER BY r.completed_at DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn cleaner_completed_count(db: &SqlitePool, cleaner_id: &str) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE cleaner_id = ?1 AND status = ?2")
        .bind(cleaner_id)
        .bind(RequestStatus::Completed)
        .fetch_one(db)
        .await
}

/// `(average, count)` of the ratings a cleaner has received.
pub async fn cleaner_rating(
    db: &SqlitePool,
    cleaner_id: &str,
) -> Result<(Option<f64>, i64), sqlx::Error> {
    sqlx::query_as::<_, (Option<f64>, i64)>(
        "SELECT AVG(rating), COUNT(rating) FROM requests WHERE cleaner_id = ? AND rating IS NOT NULL",
    )
    .bind(cleaner_id)
    .fetch_one(db)
    .await
}

pub async fn cleaner_history(
    db: &SqlitePool,
    cleaner_id: &str,
    limit: i64,
) -> Result<Vec<CleanerJob>, sqlx::Error> {
    sqlx::query_as::<_, CleanerJob>(
        r#"
        SELECT r.id, r.request_code, r.kind, r.block, r.room_no,
               r.completed_at, r.rating, s.name AS student
        FROM requests r
        LEFT JOIN students s ON s.id = r.requested_by
        WHERE r.cleaner_id = ?1 AND r.status = ?2
        ORDER BY r.completed_at DESC
        LIMIT ?3
        "#,
    )
    .bind(cleaner_id)
    .bind(RequestStatus::Completed)
    .bind(limit)
    .fetch_all(db)
    .await
}
