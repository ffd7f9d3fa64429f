//! Caller identity from gateway headers.
//!
//! The gateway authenticates users and forwards `X-Actor-Id`,
//! `X-Actor-Role` and optionally `X-Actor-Department`. The system role is
//! never accepted from headers.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::ApiError;
use crate::permissions::{Actor, Role};

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";
pub const ACTOR_DEPARTMENT_HEADER: &str = "x-actor-department";

/// The authenticated caller of a request.
pub struct RequestActor(pub Actor);

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestActor
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let id = header(parts, ACTOR_ID_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-Actor-Id".to_string()))?;
        let role_name = header(parts, ACTOR_ROLE_HEADER)
            .ok_or_else(|| ApiError::Unauthorized("missing X-Actor-Role".to_string()))?;
        let role = Role::from_external(role_name).ok_or_else(|| {
            tracing::warn!("Rejected request from {} with role {}", id, role_name);
            ApiError::Unauthorized(format!("unknown role {}", role_name))
        })?;

        let mut actor = Actor::new(id, role);
        if let Some(department) = header(parts, ACTOR_DEPARTMENT_HEADER) {
            actor = actor.with_department(department);
        }
        Ok(RequestActor(actor))
    }
}
