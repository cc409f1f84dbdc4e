use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::OtpRecord;

pub async fn insert_otp(
    db: &SqlitePool,
    email: &str,
    code: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<OtpRecord, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO otps (id, email, code, expires_at, used, created_at)
        VALUES (?1, ?2, ?3, ?4, 0, ?5)
        "#,
    )
    .bind(&id)
    .bind(email)
    .bind(code)
    .bind(expires_at)
    .bind(now)
    .execute(db)
    .await?;

    Ok(OtpRecord {
        id,
        email: email.to_string(),
        code: code.to_string(),
        expires_at,
        used: false,
        created_at: now,
    })
}

/// Latest unused, unexpired code matching `email` and `code`.
pub async fn find_valid_otp(
    db: &SqlitePool,
    email: &str,
    code: &str,
    now: DateTime<Utc>,
) -> Result<Option<OtpRecord>, sqlx::Error> {
    sqlx::query_as::<_, OtpRecord>(
        r#"
        SELECT id, email, code, expires_at, used, created_at
        FROM otps
        WHERE email = ?1 AND code = ?2 AND used = 0 AND expires_at > ?3
        ORDER BY created_at DESC
        LIMIT 1
        "#,
    )
    .bind(email)
    .bind(code)
    .bind(now)
    .fetch_optional(db)
    .await
}

/// Marks the code used. `false` means someone else consumed it first.
pub async fn consume_otp(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE otps SET used = 1 WHERE id = ?1 AND used = 0")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result == 1)
}

/// Retires every outstanding code for `email`.
pub async fn invalidate_otps(db: &SqlitePool, email: &str) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE otps SET used = 1 WHERE email = ?1 AND used = 0")
        .bind(email)
        .execute(db)
        .await?;

    Ok(result.rows_affected())
}

/// Counts a wrong guess against the live codes for `email`; a code is retired
/// once it reaches `max_attempts`.
pub async fn record_failed_attempt(
    db: &SqlitePool,
    email: &str,
    max_attempts: i64,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        UPDATE otps
        SET attempts = attempts + 1,
            used = CASE WHEN attempts + 1 >= ?2 THEN 1 ELSE used END
        WHERE email = ?1 AND used = 0 AND expires_at > ?3
        "#,
    )
    .bind(email)
    .bind(max_attempts)
    .bind(now)
    .execute(db)
    .await?;

    Ok(())
}
