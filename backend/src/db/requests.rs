use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::models::{CleaningRequest, RequestFilter, RequestStatus};

macro_rules! request_columns {
    () => {
        "id, request_code, group_id, block, room_no, requested_by, kind, instructions, \
         status, cleaner_id, completion_secret, created_at, accepted_at, completed_at, \
         rating, feedback"
    };
}

/// Inserts `req` unless its group already has a pending or in-progress
/// request. Returns `false` when the group was busy.
pub async fn insert_if_group_idle(
    db: &SqlitePool,
    req: &CleaningRequest,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(concat!(
        "INSERT INTO requests (",
        request_columns!(),
        r#")
        SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16
        WHERE NOT EXISTS (
            SELECT 1 FROM requests
            WHERE group_id = ?3 AND status IN (?17, ?18)
        )
        "#
    ))
    .bind(&req.id)
    .bind(&req.request_code)
    .bind(&req.group_id)
    .bind(&req.block)
    .bind(&req.room_no)
    .bind(&req.requested_by)
    .bind(&req.kind)
    .bind(&req.instructions)
    .bind(req.status)
    .bind(&req.cleaner_id)
    .bind(&req.completion_secret)
    .bind(req.created_at)
    .bind(req.accepted_at)
    .bind(req.completed_at)
    .bind(req.rating)
    .bind(&req.feedback)
    .bind(RequestStatus::Pending)
    .bind(RequestStatus::InProgress)
    .execute(db)
    .await;

    match result {
        Ok(done) => Ok(done.rows_affected() == 1),
        // the partial unique index caught a racing insert
        Err(sqlx::Error::Database(e))
            if e.is_unique_violation() && e.message().contains("requests.group_id") =>
        {
            Ok(false)
        }
        Err(e) => Err(e),
    }
}

pub async fn find_request_by_id(
    db: &SqlitePool,
    id: &str,
) -> Result<Option<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        " FROM requests WHERE id = ?"
    ))
    .bind(id)
    .fetch_optional(db)
    .await
}

/// PENDING -> IN_PROGRESS, guarded on the current status.
pub async fn accept_pending(
    db: &SqlitePool,
    id: &str,
    cleaner_id: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?1,
            cleaner_id = ?2,
            accepted_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(RequestStatus::InProgress)
    .bind(cleaner_id)
    .bind(now)
    .bind(id)
    .bind(RequestStatus::Pending)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result == 1)
}

/// IN_PROGRESS -> COMPLETED. The secret is part of the guard so a concurrent
/// revert between the caller's check and this update cannot slip through.
pub async fn complete_in_progress(
    db: &SqlitePool,
    id: &str,
    secret: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?1,
            completed_at = ?2
        WHERE id = ?3 AND status = ?4 AND completion_secret = ?5
        "#,
    )
    .bind(RequestStatus::Completed)
    .bind(now)
    .bind(id)
    .bind(RequestStatus::InProgress)
    .bind(secret)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result == 1)
}

/// Reverts every in-progress request accepted before `cutoff`.
pub async fn revert_stale(db: &SqlitePool, cutoff: DateTime<Utc>) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?1,
            cleaner_id = NULL,
            accepted_at = NULL
        WHERE status = ?2 AND accepted_at < ?3
        "#,
    )
    .bind(RequestStatus::Pending)
    .bind(RequestStatus::InProgress)
    .bind(cutoff)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result)
}

pub async fn revert_if_stale(
    db: &SqlitePool,
    id: &str,
    cutoff: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET status = ?1,
            cleaner_id = NULL,
            accepted_at = NULL
        WHERE id = ?2 AND status = ?3 AND accepted_at < ?4
        "#,
    )
    .bind(RequestStatus::Pending)
    .bind(id)
    .bind(RequestStatus::InProgress)
    .bind(cutoff)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result == 1)
}

/// Sets rating and feedback once on a completed request.
pub async fn rate_completed(
    db: &SqlitePool,
    id: &str,
    rating: i64,
    feedback: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE requests
        SET rating = ?1,
            feedback = ?2
        WHERE id = ?3 AND status = ?4 AND rating IS NULL
        "#,
    )
    .bind(rating)
    .bind(feedback)
    .bind(id)
    .bind(RequestStatus::Completed)
    .execute(db)
    .await?
    .rows_affected();

    Ok(result == 1)
}

pub async fn fetch_pending_for_block(
    db: &SqlitePool,
    block: &str,
) -> Result<Vec<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        r#"
        FROM requests
        WHERE status = ?1 AND block = ?2
        ORDER BY created_at ASC
        "#
    ))
    .bind(RequestStatus::Pending)
    .bind(block)
    .fetch_all(db)
    .await
}

/// Pending requests across every block assigned to the cleaner.
pub async fn fetch_pending_for_cleaner(
    db: &SqlitePool,
    cleaner_id: &str,
) -> Result<Vec<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        r#"
        FROM requests
        WHERE status = ?1
          AND block IN (SELECT block FROM cleaner_blocks WHERE cleaner_id = ?2)
        ORDER BY created_at ASC
        "#
    ))
    .bind(RequestStatus::Pending)
    .bind(cleaner_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_in_progress_for_cleaner(
    db: &SqlitePool,
    cleaner_id: &str,
) -> Result<Vec<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        r#"
        FROM requests
        WHERE status = ?1 AND cleaner_id = ?2
        ORDER BY accepted_at ASC
        "#
    ))
    .bind(RequestStatus::InProgress)
    .bind(cleaner_id)
    .fetch_all(db)
    .await
}

pub async fn fetch_active_for_group(
    db: &SqlitePool,
    group_id: &str,
) -> Result<Option<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        r#"
        FROM requests
        WHERE group_id = ?1 AND status IN (?2, ?3)
        ORDER BY created_at DESC
        LIMIT 1
        "#
    ))
    .bind(group_id)
    .bind(RequestStatus::Pending)
    .bind(RequestStatus::InProgress)
    .fetch_optional(db)
    .await
}

pub async fn fetch_history_for_group(
    db: &SqlitePool,
    group_id: &str,
    limit: i64,
) -> Result<Vec<CleaningRequest>, sqlx::Error> {
    sqlx::query_as::<_, CleaningRequest>(concat!(
        "SELECT ",
        request_columns!(),
        r#"
        FROM requests
        WHERE group_id = ?1 AND status = ?2
        ORDER BY completed_at DESC
        LIMIT ?3
        "#
    ))
    .bind(group_id)
    .bind(RequestStatus::Completed)
    .bind(limit)
    .fetch_all(db)
    .await
}

/// Admin listing, newest first.
pub async fn fetch_requests(
    db: &SqlitePool,
    filter: &RequestFilter,
    limit: i64,
) -> Result<Vec<CleaningRequest>, sqlx::Error> {
    let mut query: QueryBuilder<Sqlite> =
        QueryBuilder::new(concat!("SELECT ", request_columns!(), " FROM requests WHERE 1 = 1"));

    if let Some(status) = filter.status {
        query.push(" AND status = ").push_bind(status);
    }
    if let Some(block) = &filter.block {
        query.push(" AND block = ").push_bind(block.clone());
    }
    query
        .push(" ORDER BY created_at DESC LIMIT ")
        .push_bind(limit);

    query
        .build_query_as::<CleaningRequest>()
        .fetch_all(db)
        .await
}
