use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::db::{accounts, otps};
use crate::models::{SignupRequest, Student, VerifyOtpRequest};
use crate::notify::OtpMailer;
use crate::services::auth::{AuthError, hash_password};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_OTP_ATTEMPTS: i64 = 5;

/// Two-step student registration: an emailed one-time code, then account
/// creation. Students who give the same block and room share a group.
pub struct SignupService {
    db: SqlitePool,
    mailer: Arc<dyn OtpMailer>,
    email_domain: String,
    otp_ttl: Duration,
}

impl SignupService {
    pub fn new(
        db: SqlitePool,
        mailer: Arc<dyn OtpMailer>,
        email_domain: impl Into<String>,
        otp_ttl: Duration,
    ) -> Self {
        Self {
            db,
            mailer,
            email_domain: email_domain.into(),
            otp_ttl,
        }
    }

    /// Returns when the issued code expires. Earlier codes for the same
    /// address stop working.
    pub async fn request_otp(
        &self,
        req: &SignupRequest,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, AuthError> {
        let email = self.normalize_email(&req.email)?;

        if accounts::find_student_by_email(&self.db, &email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let code = rand::rng().random_range(100_000..1_000_000).to_string();
        let expires_at = now + self.otp_ttl;
        otps::invalidate_otps(&self.db, &email).await?;
        otps::insert_otp(&self.db, &email, &code, expires_at, now).await?;

        self.mailer.send_otp(&email, &code, expires_at).await?;
        info!(%email, "signup OTP issued");

        Ok(expires_at)
    }

    pub async fn verify_otp(
        &self,
        req: &VerifyOtpRequest,
        now: DateTime<Utc>,
    ) -> Result<Student, AuthError> {
        let email = self.normalize_email(&req.email)?;
        let name = required(&req.name, "name")?;
        let block = required(&req.block, "block")?.to_uppercase();
        let room_no = required(&req.room_no, "room_no")?;
        if req.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            )));
        }

        let Some(otp) = otps::find_valid_otp(&self.db, &email, req.otp.trim(), now).await? else {
            otps::record_failed_attempt(&self.db, &email, MAX_OTP_ATTEMPTS, now).await?;
            warn!(%email, "wrong signup OTP");
            return Err(AuthError::InvalidOtp);
        };

        if accounts::find_student_by_email(&self.db, &email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if !otps::consume_otp(&self.db, &otp.id).await? {
            return Err(AuthError::InvalidOtp);
        }

        let password_hash = hash_password(&req.password)?;
        let group = accounts::find_or_create_group(&self.db, &block, room_no).await?;
        let reg_no = req.reg_no.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let student = accounts::insert_student(
            &self.db,
            accounts::NewStudent {
                email: &email,
                password_hash: &password_hash,
                name,
                reg_no,
                group_id: &group.id,
            },
            now,
        )
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                warn!(%email, "duplicate signup raced past the email check");
                AuthError::EmailTaken
            }
            other => AuthError::Store(other),
        })?;

        info!(
            student = %student.email,
            block = %group.block,
            room = %group.room_no,
            "student registered"
        );
        Ok(student)
    }

    fn normalize_email(&self, raw: &str) -> Result<String, AuthError> {
        let email = raw.trim().to_lowercase();
        let suffix = format!("@{}", self.email_domain);
        match email.strip_suffix(&suffix) {
            Some(local) if !local.is_empty() && !local.contains('@') => Ok(email),
            _ => Err(AuthError::Validation(format!(
                "please use a valid {} email address",
                self.email_domain
            ))),
        }
    }
}

fn required<'a>(value: &'a str, field: &str) -> Result<&'a str, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::Validation(format!("{} is required", field)));
    }
    Ok(value)
}
