//! Per-request identity.
//!
//! Sessions live in the upstream auth provider; by the time a request reaches
//! this service the provider has already authenticated it and forwarded the
//! identity as headers. Role guards run here and in the handlers, never
//! inside the repositories.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_USER_ROLE: &str = "x-user-role";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Investigator,
    Reviewer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Investigator => "investigator",
            Self::Reviewer => "reviewer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Self::Admin),
            "investigator" => Some(Self::Investigator),
            "reviewer" => Some(Self::Reviewer),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if !self.is_admin() {
            return Err(Error::Forbidden("administrator role required".into()));
        }
        Ok(())
    }

    pub fn require_role(&self, role: Role) -> Result<(), Error> {
        if self.role != role {
            return Err(Error::Forbidden(format!("{role} role required")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = header_value(parts, HEADER_USER_ID)?;
        let role_raw = header_value(parts, HEADER_USER_ROLE)?;
        let role = Role::parse(&role_raw)
            .ok_or_else(|| Error::Unauthorized(format!("unknown role: {role_raw}")))?;
        Ok(AuthContext { user_id, role })
    }
}

fn header_value(parts: &Parts, name: &str) -> Result<String, Error> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::Unauthorized(format!("missing {name} header")))
}
