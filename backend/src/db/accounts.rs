use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::models::{Admin, Cleaner, RoomGroup, Roommate, Student};

pub struct NewStudent<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub reg_no: Option<&'a str>,
    pub group_id: &'a str,
}

pub struct NewCleaner<'a> {
    pub employee_id: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub blocks: &'a [String],
}

/// Returns the group for `(block, room_no)`, creating it on first use.
pub async fn find_or_create_group(
    db: &SqlitePool,
    block: &str,
    room_no: &str,
) -> Result<RoomGroup, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    sqlx::query("INSERT OR IGNORE INTO room_groups (id, block, room_no) VALUES (?1, ?2, ?3)")
        .bind(&id)
        .bind(block)
        .bind(room_no)
        .execute(db)
        .await?;

    sqlx::query_as::<_, RoomGroup>(
        "SELECT id, block, room_no FROM room_groups WHERE block = ?1 AND room_no = ?2",
    )
    .bind(block)
    .bind(room_no)
    .fetch_one(db)
    .await
}

pub async fn find_group_by_id(db: &SqlitePool, id: &str) -> Result<Option<RoomGroup>, sqlx::Error> {
    sqlx::query_as::<_, RoomGroup>("SELECT id, block, room_no FROM room_groups WHERE id = ?")
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert_student(
    db: &SqlitePool,
    new: NewStudent<'_>,
    now: DateTime<Utc>,
) -> Result<Student, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        r#"
        INSERT INTO students (id, email, password_hash, name, reg_no, group_id, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&id)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.name)
    .bind(new.reg_no)
    .bind(new.group_id)
    .bind(now)
    .execute(db)
    .await?;

    Ok(Student {
        id,
        email: new.email.to_string(),
        password_hash: new.password_hash.to_string(),
        name: new.name.to_string(),
        reg_no: new.reg_no.map(str::to_string),
        group_id: new.group_id.to_string(),
        created_at: now,
    })
}

pub async fn find_student_by_email(
    db: &SqlitePool,
    email: &str,
) -> Result<Option<Student>, sqlx::Error> {
    sqlx::query_as::<_, Student>(
        "SELECT id, email, password_hash, name, reg_no, group_id, created_at FROM students WHERE email = ?",
    )
    .bind(email)
    .fetch_optional(db)
    .await
}

pub async fn fetch_roommates(db: &SqlitePool, group_id: &str) -> Result<Vec<Roommate>, sqlx::Error> {
    sqlx::query_as::<_, Roommate>(
        "SELECT name, email FROM students WHERE group_id = ? ORDER BY name ASC",
    )
    .bind(group_id)
    .fetch_all(db)
    .await
}

pub async fn count_students(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM students")
        .fetch_one(db)
        .await
}

#[derive(FromRow)]
struct CleanerRow {
    id: String,
    employee_id: String,
    password_hash: String,
    name: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    blocks: Option<String>,
}

impl From<CleanerRow> for Cleaner {
    fn from(row: CleanerRow) -> Self {
        let mut blocks: Vec<String> = row
            .blocks
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter(|b| !b.is_empty())
            .map(str::to_string)
            .collect();
        blocks.sort();

        Cleaner {
            id: row.id,
            employee_id: row.employee_id,
            password_hash: row.password_hash,
            name: row.name,
            blocks,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

macro_rules! cleaner_select {
    ($where:literal) => {
        concat!(
            r#"
            SELECT c.id, c.employee_id, c.password_hash, c.name, c.is_active, c.created_at,
                   group_concat(cb.block, ',') AS blocks
            FROM cleaners c
            LEFT JOIN cleaner_blocks cb ON cb.cleaner_id = c.id
            "#,
            $where,
            " GROUP BY c.id ORDER BY c.created_at DESC"
        )
    };
}

pub async fn fetch_cleaners(db: &SqlitePool) -> Result<Vec<Cleaner>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CleanerRow>(cleaner_select!("WHERE 1 = 1"))
        .fetch_all(db)
        .await?;
    Ok(rows.into_iter().map(Cleaner::from).collect())
}

pub async fn find_cleaner_by_id(db: &SqlitePool, id: &str) -> Result<Option<Cleaner>, sqlx::Error> {
    let row = sqlx::query_as::<_, CleanerRow>(cleaner_select!("WHERE c.id = ?1"))
        .bind(id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Cleaner::from))
}

pub async fn find_cleaner_by_employee_id(
    db: &SqlitePool,
    employee_id: &str,
) -> Result<Option<Cleaner>, sqlx::Error> {
    let row = sqlx::query_as::<_, CleanerRow>(cleaner_select!("WHERE c.employee_id = ?1"))
        .bind(employee_id)
        .fetch_optional(db)
        .await?;
    Ok(row.map(Cleaner::from))
}

pub async fn insert_cleaner(
    db: &SqlitePool,
    new: NewCleaner<'_>,
    now: DateTime<Utc>,
) -> Result<Cleaner, sqlx::Error> {
    let id = Uuid::new_v4().to_string();
    let mut tx = db.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO cleaners (id, employee_id, password_hash, name, is_active, created_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        "#,
    )
    .bind(&id)
    .bind(new.employee_id)
    .bind(new.password_hash)
    .bind(new.name)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    for block in new.blocks {
        sqlx::query("INSERT OR IGNORE INTO cleaner_blocks (cleaner_id, block) VALUES (?1, ?2)")
            .bind(&id)
            .bind(block)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    let mut blocks = new.blocks.to_vec();
    blocks.sort();
    blocks.dedup();

    Ok(Cleaner {
        id,
        employee_id: new.employee_id.to_string(),
        password_hash: new.password_hash.to_string(),
        name: new.name.to_string(),
        blocks,
        is_active: true,
        created_at: now,
    })
}

/// Applies the given changes; `None` fields are left untouched.
/// Returns `false` when no cleaner has that id.
pub async fn update_cleaner(
    db: &SqlitePool,
    id: &str,
    name: Option<&str>,
    blocks: Option<&[String]>,
    is_active: Option<bool>,
) -> Result<bool, sqlx::Error> {
    let mut tx = db.begin().await?;

    let found = sqlx::query(
        r#"
        UPDATE cleaners
        SET name = COALESCE(?1, name),
            is_active = COALESCE(?2, is_active)
        WHERE id = ?3
        "#,
    )
    .bind(name)
    .bind(is_active)
    .bind(id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    if found == 0 {
        return Ok(false);
    }

    if let Some(blocks) = blocks {
        sqlx::query("DELETE FROM cleaner_blocks WHERE cleaner_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        for block in blocks {
            sqlx::query("INSERT OR IGNORE INTO cleaner_blocks (cleaner_id, block) VALUES (?1, ?2)")
                .bind(id)
                .bind(block)
                .execute(&mut *tx)
                .await?;
        }
    }

    tx.commit().await?;
    Ok(true)
}

pub async fn set_cleaner_password(
    db: &SqlitePool,
    employee_id: &str,
    password_hash: &str,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE cleaners SET password_hash = ?1 WHERE employee_id = ?2")
        .bind(password_hash)
        .bind(employee_id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn cleaner_has_requests(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM requests WHERE cleaner_id = ?")
        .bind(id)
        .fetch_one(db)
        .await?;
    Ok(count > 0)
}

pub async fn delete_cleaner(db: &SqlitePool, id: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM cleaners WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?
        .rows_affected();

    Ok(result > 0)
}

pub async fn count_active_cleaners(db: &SqlitePool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM cleaners WHERE is_active = 1")
        .fetch_one(db)
        .await
}

pub async fn find_admin_by_username(
    db: &SqlitePool,
    username: &str,
) -> Result<Option<Admin>, sqlx::Error> {
    sqlx::query_as::<_, Admin>(
        "SELECT id, username, password_hash, created_at FROM admins WHERE username = ?",
    )
    .bind(username)
    .fetch_optional(db)
    .await
}

/// Creates the admin or resets its password. Returns `true` when a new row was created.
pub async fn upsert_admin(
    db: &SqlitePool,
    username: &str,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query("UPDATE admins SET password_hash = ?1 WHERE username = ?2")
        .bind(password_hash)
        .bind(username)
        .execute(db)
        .await?
        .rows_affected();

    if updated > 0 {
        return Ok(false);
    }

    sqlx::query(
        "INSERT INTO admins (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(username)
    .bind(password_hash)
    .bind(now)
    .execute(db)
    .await?;

    Ok(true)
}
