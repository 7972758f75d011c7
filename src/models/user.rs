//! User profile, role and authentication payload models.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// The single elevation level a profile can hold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(Role::User),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// A community member as seen by clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub created_at: String,
    #[serde(default)]
    pub banned: bool,
    /// Ids of tutorials bookmarked through the saved-tutorials join table.
    #[serde(default)]
    pub saved_tutorials: BTreeSet<String>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// The authenticated principal behind a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub banned: bool,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Request body for `POST /api/auth/sign-up`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// Request body for `POST /api/auth/sign-in`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

/// An issued session: bearer token plus the profile it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub expires_at: String,
    pub user: User,
}

/// Result of a sign-up. `session` is absent while the e-mail awaits verification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub requires_verification: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<AuthSession>,
}

/// Request body for `PUT /api/auth/profile`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateProfileRequest {
    pub name: String,
}

/// Request body for `POST /api/auth/password-reset`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordResetRequest {
    pub email: String,
}

/// Request body for `POST /api/auth/password-reset/confirm`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PasswordResetConfirm {
    pub token: String,
    pub password: String,
}
