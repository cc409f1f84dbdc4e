use std::env;

use chrono::Utc;
use dotenvy::dotenv;
use sqlx::SqlitePool;

use cleanvit::db::accounts;
use cleanvit::services::auth::hash_password;

const USAGE: &str = "\
usage:
  manage_accounts reset-admin <username> <password> [--apply]
  manage_accounts set-cleaner <employee_id> <name> <password> <BLOCK,BLOCK,...> [--apply]

Without --apply nothing is written.";

fn is_dry_run() -> bool {
    !env::args().any(|a| a == "--apply")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let args: Vec<String> = env::args().skip(1).filter(|a| a != "--apply").collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let database_url =
        env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://cleanvit.db?mode=rwc".to_string());
    let pool = SqlitePool::connect(&database_url).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;

    let dry_run = is_dry_run();

    match args.as_slice() {
        ["reset-admin", username, password] => {
            reset_admin(&pool, username, password, dry_run).await?
        }
        ["set-cleaner", employee_id, name, password, blocks] => {
            let blocks: Vec<String> = blocks
                .split(',')
                .map(|b| b.trim().to_uppercase())
                .filter(|b| !b.is_empty())
                .collect();
            set_cleaner(&pool, employee_id, name, password, &blocks, dry_run).await?
        }
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}

async fn reset_admin(
    pool: &SqlitePool,
    username: &str,
    password: &str,
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let exists = accounts::find_admin_by_username(pool, username).await?.is_some();

    if dry_run {
        let action = if exists { "reset password for" } else { "create" };
        println!("[DRY RUN] Would {} admin {}", action, username);
        return Ok(());
    }

    let hash = hash_password(password)?;
    let created = accounts::upsert_admin(pool, username, &hash, Utc::now()).await?;
    if created {
        println!("Created admin {}", username);
    } else {
        println!("Reset password for admin {}", username);
    }
    Ok(())
}

/// Resets the password of an existing cleaner, or creates them with the
/// given blocks.
async fn set_cleaner(
    pool: &SqlitePool,
    employee_id: &str,
    name: &str,
    password: &str,
    blocks: &[String],
    dry_run: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = accounts::find_cleaner_by_employee_id(pool, employee_id).await?;

    if dry_run {
        match &existing {
            Some(c) => println!(
                "[DRY RUN] Would reset password for cleaner {} ({})",
                c.employee_id, c.name
            ),
            None => println!(
                "[DRY RUN] Would create cleaner {} ({}) for blocks {:?}",
                employee_id, name, blocks
            ),
        }
        return Ok(());
    }

    let hash = hash_password(password)?;
    match existing {
        Some(c) => {
            accounts::set_cleaner_password(pool, &c.employee_id, &hash).await?;
            println!("Reset password for cleaner {}", c.employee_id);
        }
        None => {
            let cleaner = accounts::insert_cleaner(
                pool,
                accounts::NewCleaner {
                    employee_id,
                    password_hash: &hash,
                    name,
                    blocks,
                },
                Utc::now(),
            )
            .await?;
            println!(
                "Created cleaner {} ({}) for blocks {:?}",
                cleaner.employee_id, cleaner.name, cleaner.blocks
            );
        }
    }
    Ok(())
}
