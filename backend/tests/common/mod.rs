#![allow(dead_code)]

use chrono::Utc;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

use cleanvit::db::accounts;
use cleanvit::models::{Actor, Cleaner, Student};

pub async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

pub async fn student(pool: &SqlitePool, email: &str, block: &str, room_no: &str) -> (Student, Actor) {
    let group = accounts::find_or_create_group(pool, block, room_no)
        .await
        .expect("Failed to create group");
    let student = accounts::insert_student(
        pool,
        accounts::NewStudent {
            email,
            password_hash: "unused",
            name: email,
            reg_no: None,
            group_id: &group.id,
        },
        Utc::now(),
    )
    .await
    .expect("Failed to insert student");

    let actor = Actor::Student {
        id: student.id.clone(),
        group_id: student.group_id.clone(),
    };
    (student, actor)
}

pub async fn cleaner(pool: &SqlitePool, employee_id: &str, blocks: &[&str]) -> (Cleaner, Actor) {
    let blocks: Vec<String> = blocks.iter().map(|b| b.to_string()).collect();
    let cleaner = accounts::insert_cleaner(
        pool,
        accounts::NewCleaner {
            employee_id,
            password_hash: "unused",
            name: employee_id,
            blocks: &blocks,
        },
        Utc::now(),
    )
    .await
    .expect("Failed to insert cleaner");

    let actor = Actor::Cleaner { id: cleaner.id.clone() };
    (cleaner, actor)
}
