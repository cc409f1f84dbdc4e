use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use super::account::Cleaner;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct BlockCount {
    pub block: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Review {
    pub request_code: String,
    pub block: String,
    pub room_no: String,
    pub student: Option<String>,
    pub cleaner: Option<String>,
    pub rating: i64,
    pub feedback: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdminStats {
    pub total_requests: i64,
    pub today_requests: i64,
    pub pending_requests: i64,
    pub in_progress_requests: i64,
    pub completed_requests: i64,
    pub active_cleaners: i64,
    pub total_students: i64,
    pub avg_completion_hours: Option<f64>,
    pub avg_rating: Option<f64>,
    pub by_block: Vec<BlockCount>,
    pub recent_reviews: Vec<Review>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CleanerJob {
    pub id: String,
    pub request_code: String,
    pub kind: String,
    pub block: String,
    pub room_no: String,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub student: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CleanerStats {
    pub cleaner: Cleaner,
    pub total_cleaned: i64,
    pub avg_rating: Option<f64>,
    pub rating_count: i64,
    pub history: Vec<CleanerJob>,
}
