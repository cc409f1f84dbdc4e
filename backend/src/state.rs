use std::sync::Arc;

use sqlx::SqlitePool;

use crate::config::AppConfig;
use crate::notify::OtpMailer;
use crate::services::{AdminService, AuthService, RequestLifecycle, SignupService, TokenKeys};

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub lifecycle: RequestLifecycle,
    pub keys: TokenKeys,
    pub auth: Arc<AuthService>,
    pub signup: Arc<SignupService>,
    pub admin: Arc<AdminService>,
}

impl AppState {
    pub fn new(db: SqlitePool, config: &AppConfig, mailer: Arc<dyn OtpMailer>) -> Self {
        let keys = TokenKeys::new(&config.jwt_secret, config.token_ttl);
        Self {
            lifecycle: RequestLifecycle::new(db.clone(), config.lifecycle_policy()),
            auth: Arc::new(AuthService::new(db.clone(), keys.clone())),
            signup: Arc::new(SignupService::new(
                db.clone(),
                mailer,
                config.student_email_domain.clone(),
                config.otp_ttl,
            )),
            admin: Arc::new(AdminService::new(db.clone())),
            keys,
            db,
        }
    }
}
