use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    Cleaner,
    Admin,
}

/// JWT payload. `group_id` is only present on student tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignupRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub reg_no: Option<String>,
    pub block: String,
    pub room_no: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentLogin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleanerLogin {
    pub employee_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLogin {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse<T: Serialize> {
    pub token: String,
    pub account: T,
}

/// The authenticated caller, as handed to the service layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    Student { id: String, group_id: String },
    Cleaner { id: String },
    Admin { id: String },
}

impl Actor {
    pub fn id(&self) -> &str {
        match self {
            Actor::Student { id, .. } | Actor::Cleaner { id } | Actor::Admin { id } => id,
        }
    }

    /// `None` for a student token that lacks its group.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        match claims.role {
            Role::Student => claims.group_id.map(|group_id| Actor::Student {
                id: claims.sub,
                group_id,
            }),
            Role::Cleaner => Some(Actor::Cleaner { id: claims.sub }),
            Role::Admin => Some(Actor::Admin { id: claims.sub }),
        }
    }
}
