use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    InProgress,
    Completed,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::InProgress => "IN_PROGRESS",
            RequestStatus::Completed => "COMPLETED",
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cleaning request row.
///
/// `completion_secret` never leaves the server through this type; the owning
/// student sees it through [`OwnedRequest`].
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CleaningRequest {
    pub id: String,
    pub request_code: String,
    pub group_id: String,
    pub block: String,
    pub room_no: String,
    pub requested_by: String,
    pub kind: String,
    pub instructions: Option<String>,
    pub status: RequestStatus,
    pub cleaner_id: Option<String>,
    #[serde(skip_serializing)]
    pub completion_secret: String,
    pub created_at: DateTime<Utc>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub rating: Option<i64>,
    pub feedback: Option<String>,
}

/// Student-facing view that carries the QR payload.
#[derive(Debug, Clone, Serialize)]
pub struct OwnedRequest {
    #[serde(flatten)]
    pub request: CleaningRequest,
    pub completion_secret: String,
}

impl From<CleaningRequest> for OwnedRequest {
    fn from(request: CleaningRequest) -> Self {
        let completion_secret = request.completion_secret.clone();
        Self {
            request,
            completion_secret,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewCleaningRequest {
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompleteRequestBody {
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRequestBody {
    pub rating: i64,
    #[serde(default)]
    pub feedback: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RequestFilter {
    #[serde(default)]
    pub status: Option<RequestStatus>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}
