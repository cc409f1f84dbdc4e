use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::{Actor, Role};
use crate::services::AuthError;
use crate::state::AppState;

/// Resolves the caller from an `Authorization: Bearer <jwt>` header.
impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AuthError::MissingToken)?;

        let claims = state.keys.decode(token)?;
        Ok(Actor::from_claims(claims).ok_or(AuthError::InvalidToken)?)
    }
}

/// A caller holding an admin token.
pub struct AdminActor(pub String);

impl FromRequestParts<AppState> for AdminActor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match Actor::from_request_parts(parts, state).await? {
            Actor::Admin { id } => Ok(AdminActor(id)),
            _ => Err(AuthError::WrongRole(Role::Admin).into()),
        }
    }
}

pub fn student_group(actor: &Actor) -> Result<&str, AppError> {
    match actor {
        Actor::Student { group_id, .. } => Ok(group_id),
        _ => Err(AuthError::WrongRole(Role::Student).into()),
    }
}

pub fn cleaner_id(actor: &Actor) -> Result<&str, AppError> {
    match actor {
        Actor::Cleaner { id } => Ok(id),
        _ => Err(AuthError::WrongRole(Role::Cleaner).into()),
    }
}
