// Caller identity. Login and cookie handling happen in the authentication layer in
// front of this service, which forwards the verified user as request headers.
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_ROLE_HEADER: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Contestant,
    Judge,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "contestant" => Some(Role::Contestant),
            "judge" => Some(Role::Judge),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Contestant => "contestant",
            Role::Judge => "judge",
            Role::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, role: Role, action: &str) -> Result<(), ApiError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "Only {}s can {}.",
                role.as_str(),
                action
            )))
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let id = header(USER_ID_HEADER).ok_or(ApiError::Unauthorized)?;
        let role = header(USER_ROLE_HEADER)
            .as_deref()
            .and_then(Role::parse)
            .ok_or(ApiError::Unauthorized)?;

        Ok(Self { id, role })
    }
}
