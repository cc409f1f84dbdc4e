use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

use crate::db::accounts;
use crate::models::{
    Admin, AdminLogin, Cleaner, CleanerLogin, Claims, Role, Student, StudentLogin, TokenResponse,
};
use crate::notify::NotifyError;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidToken,

    #[error("this action requires a {0:?} account")]
    WrongRole(Role),

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("invalid or expired OTP")]
    InvalidOtp,

    #[error("email already registered")]
    EmailTaken,

    #[error("{0}")]
    Validation(String),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("could not deliver OTP: {0}")]
    Delivery(#[from] NotifyError),

    #[error("store error: {0}")]
    Store(#[from] sqlx::Error),
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// A malformed stored hash counts as a mismatch.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored_hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// HS256 signing and verification with a key taken from configuration.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }

    pub fn issue(
        &self,
        subject: &str,
        role: Role,
        group_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let claims = Claims {
            sub: subject.to_string(),
            role,
            group_id: group_id.map(str::to_string),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                debug!("rejected token: {}", e);
                AuthError::InvalidToken
            })
    }
}

pub struct AuthService {
    db: SqlitePool,
    keys: TokenKeys,
}

impl AuthService {
    pub fn new(db: SqlitePool, keys: TokenKeys) -> Self {
        Self { db, keys }
    }

    pub async fn login_student(
        &self,
        req: &StudentLogin,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse<Student>, AuthError> {
        let email = req.email.trim().to_lowercase();
        let student = accounts::find_student_by_email(&self.db, &email)
            .await?
            .filter(|s| verify_password(&req.password, &s.password_hash))
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self
            .keys
            .issue(&student.id, Role::Student, Some(&student.group_id), now)?;
        info!(student = %student.email, "student logged in");

        Ok(TokenResponse { token, account: student })
    }

    /// Deactivated cleaners cannot log in.
    pub async fn login_cleaner(
        &self,
        req: &CleanerLogin,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse<Cleaner>, AuthError> {
        let cleaner = accounts::find_cleaner_by_employee_id(&self.db, req.employee_id.trim())
            .await?
            .filter(|c| c.is_active)
            .filter(|c| verify_password(&req.password, &c.password_hash))
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.keys.issue(&cleaner.id, Role::Cleaner, None, now)?;
        info!(cleaner = %cleaner.employee_id, "cleaner logged in");

        Ok(TokenResponse { token, account: cleaner })
    }

    pub async fn login_admin(
        &self,
        req: &AdminLogin,
        now: DateTime<Utc>,
    ) -> Result<TokenResponse<Admin>, AuthError> {
        let admin = accounts::find_admin_by_username(&self.db, req.username.trim())
            .await?
            .filter(|a| verify_password(&req.password, &a.password_hash))
            .ok_or(AuthError::InvalidCredentials)?;

        let token = self.keys.issue(&admin.id, Role::Admin, None, now)?;
        info!(admin = %admin.username, "admin logged in");

        Ok(TokenResponse { token, account: admin })
    }
}
