use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RoomGroup {
    pub id: String,
    pub block: String,
    pub room_no: String,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Student {
    pub id: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub reg_no: Option<String>,
    pub group_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Roommate {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cleaner {
    pub id: String,
    pub employee_id: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub blocks: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Cleaner {
    pub fn covers_block(&self, block: &str) -> bool {
        self.blocks.iter().any(|b| b == block)
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Admin {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCleanerRequest {
    pub employee_id: String,
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub blocks: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateCleanerRequest {
    pub name: Option<String>,
    pub blocks: Option<Vec<String>>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, FromRow)]
pub struct OtpRecord {
    pub id: String,
    pub email: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}
