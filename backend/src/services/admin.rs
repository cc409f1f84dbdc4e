use chrono::{DateTime, NaiveTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::info;

use crate::db::{accounts, requests, stats};
use crate::models::{
    AdminStats, Cleaner, CleanerStats, CleaningRequest, NewCleanerRequest, RequestFilter,
    RequestStatus, UpdateCleanerRequest,
};
use crate::services::auth::hash_password;

const RECENT_REVIEWS: i64 = 5;
const CLEANER_HISTORY: i64 = 5;
const DEFAULT_LISTING: i64 = 50;
const MAX_LISTING: i64 = 200;
const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Error)]
pub enum AdminError {
    #[error("not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    Validation(String),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub struct AdminService {
    db: SqlitePool,
}

impl AdminService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    pub async fn compute_stats(&self, now: DateTime<Utc>) -> Result<AdminStats, AdminError> {
        let start_of_day = now.date_naive().and_time(NaiveTime::MIN).and_utc();

        Ok(AdminStats {
            total_requests: stats::count_requests(&self.db).await?,
            today_requests: stats::count_requests_since(&self.db, start_of_day).await?,
            pending_requests: stats::count_requests_by_status(&self.db, RequestStatus::Pending)
                .await?,
            in_progress_requests: stats::count_requests_by_status(
                &self.db,
                RequestStatus::InProgress,
            )
            .await?,
            completed_requests: stats::count_requests_by_status(&self.db, RequestStatus::Completed)
                .await?,
            active_cleaners: accounts::count_active_cleaners(&self.db).await?,
            total_students: accounts::count_students(&self.db).await?,
            avg_completion_hours: stats::avg_completion_hours(&self.db).await?,
            avg_rating: stats::avg_rating(&self.db).await?,
            by_block: stats::requests_by_block(&self.db).await?,
            recent_reviews: stats::recent_reviews(&self.db, RECENT_REVIEWS).await?,
        })
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<CleaningRequest>, AdminError> {
        let limit = filter.limit.unwrap_or(DEFAULT_LISTING).clamp(1, MAX_LISTING);
        Ok(requests::fetch_requests(&self.db, filter, limit).await?)
    }

    pub async fn list_cleaners(&self) -> Result<Vec<Cleaner>, AdminError> {
        Ok(accounts::fetch_cleaners(&self.db).await?)
    }

    pub async fn create_cleaner(
        &self,
        req: &NewCleanerRequest,
        now: DateTime<Utc>,
    ) -> Result<Cleaner, AdminError> {
        let employee_id = req.employee_id.trim();
        let name = req.name.trim();
        if employee_id.is_empty() || name.is_empty() {
            return Err(AdminError::Validation(
                "employee_id and name are required".to_string(),
            ));
        }
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AdminError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }
        let blocks = normalize_blocks(&req.blocks)?;

        if accounts::find_cleaner_by_employee_id(&self.db, employee_id)
            .await?
            .is_some()
        {
            return Err(employee_taken(employee_id));
        }

        let password_hash =
            hash_password(&req.password).map_err(|e| AdminError::Hash(e.to_string()))?;

        let cleaner = accounts::insert_cleaner(
            &self.db,
            accounts::NewCleaner {
                employee_id,
                password_hash: &password_hash,
                name,
                blocks: &blocks,
            },
            now,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => employee_taken(employee_id),
            other => AdminError::Store(other),
        })?;

        info!(cleaner = %cleaner.employee_id, blocks = ?cleaner.blocks, "cleaner created");
        Ok(cleaner)
    }

    pub async fn update_cleaner(
        &self,
        id: &str,
        req: &UpdateCleanerRequest,
    ) -> Result<Cleaner, AdminError> {
        let name = req.name.as_deref().map(str::trim);
        if name.is_some_and(str::is_empty) {
            return Err(AdminError::Validation("name cannot be empty".to_string()));
        }
        let blocks = req.blocks.as_deref().map(normalize_blocks).transpose()?;

        let found =
            accounts::update_cleaner(&self.db, id, name, blocks.as_deref(), req.is_active).await?;
        if !found {
            return Err(AdminError::NotFound);
        }

        let cleaner = accounts::find_cleaner_by_id(&self.db, id)
            .await?
            .ok_or(AdminError::NotFound)?;
        info!(
            cleaner = %cleaner.employee_id,
            active = cleaner.is_active,
            "cleaner updated"
        );
        Ok(cleaner)
    }

    /// Cleaners with request history are kept for reporting; deactivate them
    /// instead.
    pub async fn delete_cleaner(&self, id: &str) -> Result<(), AdminError> {
        if accounts::cleaner_has_requests(&self.db, id).await? {
            return Err(AdminError::Conflict(
                "cleaner has request history; deactivate instead".to_string(),
            ));
        }
        if !accounts::delete_cleaner(&self.db, id).await? {
            return Err(AdminError::NotFound);
        }

        info!(cleaner_id = %id, "cleaner deleted");
        Ok(())
    }

    pub async fn cleaner_stats(&self, id: &str) -> Result<CleanerStats, AdminError> {
        let cleaner = accounts::find_cleaner_by_id(&self.db, id)
            .await?
            .ok_or(AdminError::NotFound)?;

        let total_cleaned = stats::cleaner_completed_count(&self.db, id).await?;
        let (avg_rating, rating_count) = stats::cleaner_rating(&self.db, id).await?;
        let history = stats::cleaner_history(&self.db, id, CLEANER_HISTORY).await?;

        Ok(CleanerStats {
            cleaner,
            total_cleaned,
            avg_rating,
            rating_count,
            history,
        })
    }
}

fn employee_taken(employee_id: &str) -> AdminError {
    AdminError::Conflict(format!("employee id {} is already in use", employee_id))
}

/// Block names are stored comma-joined, so a comma inside one is rejected.
fn normalize_blocks(blocks: &[String]) -> Result<Vec<String>, AdminError> {
    let mut out: Vec<String> = Vec::with_capacity(blocks.len());
    for block in blocks {
        let block = block.trim().to_uppercase();
        if block.is_empty() {
            continue;
        }
        if block.contains(',') {
            return Err(AdminError::Validation(format!(
                "block name {:?} must not contain a comma",
                block
            )));
        }
        out.push(block);
    }
    out.sort();
    out.dedup();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::db::test_support::{seed_cleaner, seed_student, setup_test_db};
    use crate::models::{Actor, NewCleaningRequest};
    use crate::services::lifecycle::{LifecyclePolicy, RequestLifecycle};

    fn new_cleaner(employee_id: &str, blocks: &[&str]) -> NewCleanerRequest {
        NewCleanerRequest {
            employee_id: employee_id.to_string(),
            name: "Ramu".to_string(),
            password: "cleaner-pass".to_string(),
            blocks: blocks.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_normalize_blocks() {
        let blocks = vec![" a".to_string(), "B".to_string(), "A".to_string(), "".to_string()];
        assert_eq!(normalize_blocks(&blocks).unwrap(), vec!["A", "B"]);

        let joined = vec!["A,B".to_string()];
        assert!(matches!(normalize_blocks(&joined), Err(AdminError::Validation(_))));
    }

    #[tokio::test]
    async fn test_comma_in_block_is_rejected() {
        let pool = setup_test_db().await;
        let service = AdminService::new(pool);

        let created = service
            .create_cleaner(&new_cleaner("EMP9", &["A,B"]), Utc::now())
            .await;
        assert!(matches!(created, Err(AdminError::Validation(_))));
        assert!(service.list_cleaners().await.unwrap().is_empty());

        let cleaner = service
            .create_cleaner(&new_cleaner("EMP9", &["A"]), Utc::now())
            .await
            .unwrap();
        let update = UpdateCleanerRequest {
            name: None,
            blocks: Some(vec!["C,D".to_string()]),
            is_active: None,
        };
        let updated = service.update_cleaner(&cleaner.id, &update).await;
        assert!(matches!(updated, Err(AdminError::Validation(_))));

        let stored = service.list_cleaners().await.unwrap();
        assert_eq!(stored[0].blocks, vec!["A"]);
    }

    #[tokio::test]
    async fn test_cleaner_crud() {
        let pool = setup_test_db().await;
        let service = AdminService::new(pool);
        let now = Utc::now();

        let cleaner = service
            .create_cleaner(&new_cleaner("EMP001", &["b", "a"]), now)
            .await
            .unwrap();
        assert_eq!(cleaner.blocks, vec!["A", "B"]);

        let dup = service.create_cleaner(&new_cleaner("EMP001", &["A"]), now).await;
        assert!(matches!(dup, Err(AdminError::Conflict(_))));

        let updated = service
            .update_cleaner(
                &cleaner.id,
                &UpdateCleanerRequest {
                    name: None,
                    blocks: Some(vec!["C".to_string()]),
                    is_active: Some(false),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.name, "Ramu");
        assert_eq!(updated.blocks, vec!["C"]);
        assert!(!updated.is_active);

        service.delete_cleaner(&cleaner.id).await.unwrap();
        assert!(matches!(
            service.delete_cleaner(&cleaner.id).await,
            Err(AdminError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_stats_after_rated_job() {
        let pool = setup_test_db().await;
        let lifecycle = RequestLifecycle::new(pool.clone(), LifecyclePolicy::default());
        let service = AdminService::new(pool.clone());

        let student = seed_student(&pool, "s@vitstudent.ac.in", "A", "101").await;
        let cleaner = seed_cleaner(&pool, "EMP7", &["A"]).await;
        let s = Actor::Student {
            id: student.id.clone(),
            group_id: student.group_id.clone(),
        };
        let c = Actor::Cleaner { id: cleaner.id.clone() };

        let t0 = Utc::now() - Duration::hours(2);
        let created = lifecycle
            .create_request(&s, &student.group_id, NewCleaningRequest::default(), t0)
            .await
            .unwrap();
        lifecycle.accept_request(&c, &created.request.id, t0).await.unwrap();
        lifecycle
            .complete_request(
                &c,
                &created.request.id,
                &created.completion_secret,
                t0 + Duration::hours(1),
            )
            .await
            .unwrap();
        lifecycle
            .rate_request(&s, &created.request.id, 4, Some("tidy".to_string()))
            .await
            .unwrap();

        let stats = service.compute_stats(Utc::now()).await.unwrap();
        assert_eq!(stats.total_requests, 1);
        assert_eq!(stats.completed_requests, 1);
        assert_eq!(stats.pending_requests, 0);
        assert_eq!(stats.active_cleaners, 1);
        assert_eq!(stats.total_students, 1);
        assert_eq!(stats.avg_rating, Some(4.0));
        let hours = stats.avg_completion_hours.unwrap();
        assert!((hours - 1.0).abs() < 0.01);
        assert_eq!(stats.by_block[0].block, "A");
        assert_eq!(stats.recent_reviews.len(), 1);
        assert_eq!(stats.recent_reviews[0].feedback.as_deref(), Some("tidy"));

        let per_cleaner = service.cleaner_stats(&cleaner.id).await.unwrap();
        assert_eq!(per_cleaner.total_cleaned, 1);
        assert_eq!(per_cleaner.rating_count, 1);
        assert_eq!(per_cleaner.history.len(), 1);

        let conflict = service.delete_cleaner(&cleaner.id).await;
        assert!(matches!(conflict, Err(AdminError::Conflict(_))));

        let listed = service
            .list_requests(&RequestFilter {
                status: Some(RequestStatus::Completed),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }
}
