use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use chrono::Duration;
use thiserror::Error;

use crate::services::LifecyclePolicy;

const MAX_ASSIGNMENT_TIMEOUT_SECS: i64 = 7 * 24 * 60 * 60;
const MAX_TOKEN_TTL_HOURS: i64 = 30 * 24;
const MAX_OTP_TTL_MINUTES: i64 = 24 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub assignment_timeout: Duration,
    pub reaper_interval_secs: u64,
    pub sweep_on_read: bool,
    pub history_page_max: i64,
    pub student_email_domain: String,
    pub otp_ttl: Duration,
    pub mail_webhook_url: Option<String>,
}

impl AppConfig {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick
    /// up a local `.env`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = lookup("JWT_SECRET")
            .filter(|s| !s.trim().is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let history_page_max: i64 = parse_or(&lookup, "HISTORY_PAGE_MAX", 20)?;
        if history_page_max < 1 {
            return Err(ConfigError::Invalid {
                name: "HISTORY_PAGE_MAX",
                value: history_page_max.to_string(),
            });
        }

        Ok(Self {
            database_url: lookup("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://cleanvit.db?mode=rwc".to_string()),
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            jwt_secret,
            token_ttl: duration_or(&lookup, "TOKEN_TTL_HOURS", 24, MAX_TOKEN_TTL_HOURS, Duration::try_hours)?,
            assignment_timeout: duration_or(
                &lookup,
                "ASSIGNMENT_TIMEOUT_SECS",
                3 * 60 * 60,
                MAX_ASSIGNMENT_TIMEOUT_SECS,
                Duration::try_seconds,
            )?,
            reaper_interval_secs: parse_or(&lookup, "REAPER_INTERVAL_SECS", 60)?,
            sweep_on_read: parse_or(&lookup, "SWEEP_ON_READ", true)?,
            history_page_max,
            student_email_domain: lookup("STUDENT_EMAIL_DOMAIN")
                .unwrap_or_else(|| "vitstudent.ac.in".to_string()),
            otp_ttl: duration_or(&lookup, "OTP_TTL_MINUTES", 10, MAX_OTP_TTL_MINUTES, Duration::try_minutes)?,
            mail_webhook_url: lookup("MAIL_WEBHOOK_URL").filter(|s| !s.trim().is_empty()),
        })
    }

    pub fn lifecycle_policy(&self) -> LifecyclePolicy {
        LifecyclePolicy {
            assignment_timeout: self.assignment_timeout,
            sweep_on_read: self.sweep_on_read,
            history_page_max: self.history_page_max,
        }
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

/// Parses a positive count of `name`'s unit, capped at `max`, into a duration.
fn duration_or<F>(
    lookup: &F,
    name: &'static str,
    default: i64,
    max: i64,
    build: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value: i64 = parse_or(lookup, name, default)?;
    if !(1..=max).contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        });
    }
    build(value).ok_or(ConfigError::Invalid {
        name,
        value: value.to_string(),
    })
}
