//! Cleaning request state machine.
//!
//! ```text
//! PENDING --accept--> IN_PROGRESS --complete(secret)--> COMPLETED --rate--> COMPLETED
//!    ^                     |
//!    +----timeout revert---+
//! ```
//!
//! Every transition is a single status-guarded UPDATE, so two cleaners racing
//! for the same request see exactly one success.

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::db::{accounts, requests};
use crate::models::{Actor, CleaningRequest, NewCleaningRequest, OwnedRequest, RequestStatus};

const SECRET_LEN: usize = 32;
const DEFAULT_KIND: &str = "room_cleaning";
const MAX_INSTRUCTIONS_LEN: usize = 500;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("caller is not allowed to perform this action")]
    Unauthorized,
    #[error("request belongs to another room group")]
    NotOwner,
    #[error("not found")]
    NotFound,
    #[error("room group already has an open request")]
    DuplicateActive,
    #[error("request has already been accepted")]
    AlreadyAccepted,
    #[error("request is outside the cleaner's assigned blocks")]
    ScopeMismatch,
    #[error("request is not in progress")]
    NotInProgress,
    #[error("assignment has not timed out yet")]
    NotStale,
    #[error("completion code does not match")]
    SecretMismatch,
    #[error("request is not completed")]
    NotCompleted,
    #[error("request has already been rated")]
    AlreadyRated,
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

/// Coarse classification callers map onto user-visible outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    InvalidState,
    SecretMismatch,
    Validation,
    Infrastructure,
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LifecycleError::Unauthorized | LifecycleError::NotOwner | LifecycleError::ScopeMismatch => {
                ErrorKind::Unauthorized
            }
            LifecycleError::NotFound => ErrorKind::NotFound,
            LifecycleError::DuplicateActive
            | LifecycleError::AlreadyAccepted
            | LifecycleError::NotInProgress
            | LifecycleError::NotStale
            | LifecycleError::NotCompleted
            | LifecycleError::AlreadyRated => ErrorKind::InvalidState,
            LifecycleError::SecretMismatch => ErrorKind::SecretMismatch,
            LifecycleError::Validation(_) => ErrorKind::Validation,
            LifecycleError::Store(_) => ErrorKind::Infrastructure,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LifecyclePolicy {
    /// In-progress requests older than this are returned to the pending pool.
    pub assignment_timeout: Duration,
    /// Run the stale sweep before serving cleaner reads.
    pub sweep_on_read: bool,
    pub history_page_max: i64,
}

impl Default for LifecyclePolicy {
    fn default() -> Self {
        Self {
            assignment_timeout: Duration::hours(3),
            sweep_on_read: true,
            history_page_max: 20,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CleanerDashboard {
    pub pending: Vec<CleaningRequest>,
    pub active: Vec<CleaningRequest>,
}

#[derive(Clone)]
pub struct RequestLifecycle {
    db: SqlitePool,
    policy: LifecyclePolicy,
}

impl RequestLifecycle {
    pub fn new(db: SqlitePool, policy: LifecyclePolicy) -> Self {
        Self { db, policy }
    }

    pub fn policy(&self) -> &LifecyclePolicy {
        &self.policy
    }

    pub async fn create_request(
        &self,
        actor: &Actor,
        group_id: &str,
        input: NewCleaningRequest,
        now: DateTime<Utc>,
    ) -> Result<OwnedRequest, LifecycleError> {
        let Actor::Student { id: student_id, group_id: own_group } = actor else {
            return Err(LifecycleError::Unauthorized);
        };
        if own_group != group_id {
            return Err(LifecycleError::Unauthorized);
        }

        let kind = match input.kind.as_deref().map(str::trim) {
            None | Some("") => DEFAULT_KIND.to_string(),
            Some(kind) => kind.to_string(),
        };
        let instructions = input
            .instructions
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        if instructions
            .as_ref()
            .is_some_and(|s| s.chars().count() > MAX_INSTRUCTIONS_LEN)
        {
            return Err(LifecycleError::Validation(format!(
                "instructions must be at most {} characters",
                MAX_INSTRUCTIONS_LEN
            )));
        }

        let group = accounts::find_group_by_id(&self.db, group_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;

        let request = CleaningRequest {
            id: Uuid::new_v4().to_string(),
            request_code: new_request_code(),
            group_id: group.id,
            block: group.block,
            room_no: group.room_no,
            requested_by: student_id.clone(),
            kind,
            instructions,
            status: RequestStatus::Pending,
            cleaner_id: None,
            completion_secret: new_completion_secret(),
            created_at: now,
            accepted_at: None,
            completed_at: None,
            rating: None,
            feedback: None,
        };

        if !requests::insert_if_group_idle(&self.db, &request).await? {
            return Err(LifecycleError::DuplicateActive);
        }

        info!(
            request = %request.request_code,
            block = %request.block,
            room = %request.room_no,
            "cleaning request created"
        );
        Ok(request.into())
    }

    pub async fn accept_request(
        &self,
        actor: &Actor,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CleaningRequest, LifecycleError> {
        let Actor::Cleaner { id: cleaner_id } = actor else {
            return Err(LifecycleError::Unauthorized);
        };

        let cleaner = accounts::find_cleaner_by_id(&self.db, cleaner_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;
        if !cleaner.is_active {
            return Err(LifecycleError::Unauthorized);
        }

        let mut request = requests::find_request_by_id(&self.db, request_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;
        if !cleaner.covers_block(&request.block) {
            return Err(LifecycleError::ScopeMismatch);
        }
        if request.status != RequestStatus::Pending {
            return Err(LifecycleError::AlreadyAccepted);
        }

        if !requests::accept_pending(&self.db, request_id, cleaner_id, now).await? {
            debug!(request = %request.request_code, "lost accept race");
            return Err(LifecycleError::AlreadyAccepted);
        }

        request.status = RequestStatus::InProgress;
        request.cleaner_id = Some(cleaner.id);
        request.accepted_at = Some(now);

        info!(
            request = %request.request_code,
            cleaner = %cleaner.employee_id,
            "request accepted"
        );
        Ok(request)
    }

    /// Exact comparison against the stored code. The code proves the cleaner
    /// stood in front of the student; it is not a cryptographic boundary.
    pub async fn complete_request(
        &self,
        actor: &Actor,
        request_id: &str,
        supplied_secret: &str,
        now: DateTime<Utc>,
    ) -> Result<CleaningRequest, LifecycleError> {
        if !matches!(actor, Actor::Cleaner { .. }) {
            return Err(LifecycleError::Unauthorized);
        }

        let mut request = requests::find_request_by_id(&self.db, request_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;
        if request.status != RequestStatus::InProgress {
            debug!(request = %request.request_code, status = %request.status, "completion refused");
            return Err(LifecycleError::NotInProgress);
        }
        if request.completion_secret.as_bytes() != supplied_secret.as_bytes() {
            warn!(
                request = %request.request_code,
                cleaner = %actor.id(),
                "completion code mismatch"
            );
            return Err(LifecycleError::SecretMismatch);
        }

        if !requests::complete_in_progress(&self.db, request_id, supplied_secret, now).await? {
            return Err(LifecycleError::NotInProgress);
        }

        request.status = RequestStatus::Completed;
        request.completed_at = Some(now);

        info!(request = %request.request_code, "request completed");
        Ok(request)
    }

    /// Returns one stale in-progress request to the pending pool.
    pub async fn timeout_revert(
        &self,
        request_id: &str,
        now: DateTime<Utc>,
    ) -> Result<CleaningRequest, LifecycleError> {
        let mut request = requests::find_request_by_id(&self.db, request_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;
        if request.status != RequestStatus::InProgress {
            return Err(LifecycleError::NotInProgress);
        }

        let cutoff = now - self.policy.assignment_timeout;
        if request.accepted_at.is_some_and(|at| at >= cutoff) {
            return Err(LifecycleError::NotStale);
        }
        if !requests::revert_if_stale(&self.db, request_id, cutoff).await? {
            return Err(LifecycleError::NotInProgress);
        }

        request.status = RequestStatus::Pending;
        request.cleaner_id = None;
        request.accepted_at = None;

        info!(request = %request.request_code, "stale assignment released");
        Ok(request)
    }

    /// Reverts every assignment older than the timeout. Returns how many moved.
    pub async fn sweep_stale(&self, now: DateTime<Utc>) -> Result<u64, LifecycleError> {
        let cutoff = now - self.policy.assignment_timeout;
        let reverted = requests::revert_stale(&self.db, cutoff).await?;
        if reverted > 0 {
            info!(reverted, %cutoff, "released stale assignments");
        }
        Ok(reverted)
    }

    /// At most one rating per request; later attempts get `AlreadyRated`.
    pub async fn rate_request(
        &self,
        actor: &Actor,
        request_id: &str,
        rating: i64,
        feedback: Option<String>,
    ) -> Result<CleaningRequest, LifecycleError> {
        let Actor::Student { group_id, .. } = actor else {
            return Err(LifecycleError::Unauthorized);
        };
        if !(1..=5).contains(&rating) {
            return Err(LifecycleError::Validation(
                "rating must be between 1 and 5".to_string(),
            ));
        }
        let feedback = feedback
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let mut request = requests::find_request_by_id(&self.db, request_id)
            .await?
            .ok_or(LifecycleError::NotFound)?;
        if &request.group_id != group_id {
            return Err(LifecycleError::NotOwner);
        }
        if request.status != RequestStatus::Completed {
            return Err(LifecycleError::NotCompleted);
        }
        if request.rating.is_some() {
            return Err(LifecycleError::AlreadyRated);
        }

        if !requests::rate_completed(&self.db, request_id, rating, feedback.as_deref()).await? {
            return Err(LifecycleError::AlreadyRated);
        }

        request.rating = Some(rating);
        request.feedback = feedback;
        Ok(request)
    }

    pub async fn list_pending_for_block(
        &self,
        block: &str,
    ) -> Result<Vec<CleaningRequest>, LifecycleError> {
        Ok(requests::fetch_pending_for_block(&self.db, block).await?)
    }

    /// Pending requests across all of the calling cleaner's blocks.
    pub async fn list_pending_for_cleaner(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<CleaningRequest>, LifecycleError> {
        let Actor::Cleaner { id } = actor else {
            return Err(LifecycleError::Unauthorized);
        };
        self.sweep_before_read(now).await?;
        Ok(requests::fetch_pending_for_cleaner(&self.db, id).await?)
    }

    pub async fn list_active_for_cleaner(
        &self,
        cleaner_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Vec<CleaningRequest>, LifecycleError> {
        self.sweep_before_read(now).await?;
        Ok(requests::fetch_in_progress_for_cleaner(&self.db, cleaner_id).await?)
    }

    pub async fn cleaner_dashboard(
        &self,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Result<CleanerDashboard, LifecycleError> {
        let Actor::Cleaner { id } = actor else {
            return Err(LifecycleError::Unauthorized);
        };
        self.sweep_before_read(now).await?;

        let pending = requests::fetch_pending_for_cleaner(&self.db, id).await?;
        let active = requests::fetch_in_progress_for_cleaner(&self.db, id).await?;
        Ok(CleanerDashboard { pending, active })
    }

    /// The student's view of their group's open request, secret included.
    pub async fn active_for_group(
        &self,
        actor: &Actor,
    ) -> Result<Option<OwnedRequest>, LifecycleError> {
        let Actor::Student { group_id, .. } = actor else {
            return Err(LifecycleError::Unauthorized);
        };
        let request = requests::fetch_active_for_group(&self.db, group_id).await?;
        Ok(request.map(OwnedRequest::from))
    }

    /// At most `limit` rows, capped at the policy's page maximum.
    pub async fn list_history_for_group(
        &self,
        group_id: &str,
        limit: i64,
    ) -> Result<Vec<CleaningRequest>, LifecycleError> {
        if limit < 0 {
            return Err(LifecycleError::Validation(
                "limit must not be negative".to_string(),
            ));
        }
        if limit == 0 {
            return Ok(Vec::new());
        }
        let limit = limit.min(self.policy.history_page_max);
        Ok(requests::fetch_history_for_group(&self.db, group_id, limit).await?)
    }

    async fn sweep_before_read(&self, now: DateTime<Utc>) -> Result<(), LifecycleError> {
        if self.policy.sweep_on_read {
            self.sweep_stale(now).await?;
        }
        Ok(())
    }
}

fn new_completion_secret() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LEN)
        .map(char::from)
        .collect()
}

fn new_request_code() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("REQ-{}", raw[..8].to_uppercase())
}
