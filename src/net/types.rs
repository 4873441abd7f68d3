//! Wire DTOs exchanged with the identity service.
//!
//! DESIGN
//! ======
//! Field names mirror the identity API JSON exactly so the HTTP client and the
//! in-memory mock agree on one schema.

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;

use std::fmt;

use serde::{Deserialize, Serialize};

/// Authorization role attached to an identity.
///
/// The identity service treats roles as free-form strings; the two the
/// dashboard knows about get their own variants and anything else is kept
/// verbatim in [`Role::Other`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Full access to every project.
    Admin,
    /// Least-privileged role; assigned to newly registered identities.
    #[default]
    User,
    #[serde(untagged)]
    Other(String),
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => f.write_str("admin"),
            Self::User => f.write_str("user"),
            Self::Other(role) => f.write_str(role),
        }
    }
}

/// Identity record for the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identity service user id.
    pub id: u64,
    /// Display name.
    pub name: String,
    /// Login identifier.
    pub email: String,
    /// Missing roles decode as the least-privileged role.
    #[serde(default)]
    pub role: Role,
    /// Avatar image URL, if the identity has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

impl User {
    /// Avatar fallback letter: first character of the name, uppercased, or `U`.
    #[must_use]
    pub fn initial(&self) -> char {
        self.name
            .trim()
            .chars()
            .next()
            .map_or('U', |c| c.to_uppercase().next().unwrap_or(c))
    }
}

/// `POST /auth/login` request body.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// `POST /auth/register` request body.
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful login/register response: a fresh token plus the identity it belongs to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// `GET /auth/me` response. Some deployments wrap the user, some return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CurrentUserResponse {
    Wrapped { user: User },
    Bare(User),
}

impl CurrentUserResponse {
    #[must_use]
    pub fn into_user(self) -> User {
        match self {
            Self::Wrapped { user } | Self::Bare(user) => user,
        }
    }
}

/// Error body shape used by the identity service (`{"message": "..."}`).
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
