//! Session-token authentication and capability policy.
//!
//! The policy functions are the security boundary: every mutating handler
//! resolves the caller through them before reaching the repository. Client
//! role checks only decide what to show.

mod password;

pub use password::*;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::errors::AppError;
use crate::models::Actor;
use crate::AppState;

/// The caller resolved from the bearer token, if any.
#[derive(Debug, Clone, Default)]
pub struct CurrentActor(pub Option<Actor>);

/// Extract the bearer token from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Resolve the session token into a [`CurrentActor`] request extension.
///
/// Unknown or expired tokens leave the request anonymous; public reads still
/// succeed and the policy functions reject anything else.
pub async fn session_layer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let actor = match bearer_token(request.headers()) {
        Some(token) => match state.repo.actor_for_token(&token).await {
            Ok(actor) => {
                if actor.is_none() {
                    tracing::debug!("Ignoring unknown or expired session token");
                }
                actor
            }
            Err(e) => return e.into_response(),
        },
        None => None,
    };

    request.extensions_mut().insert(CurrentActor(actor));
    next.run(request).await
}

/// Any signed-in user, banned or not.
pub fn require_user(actor: &CurrentActor) -> Result<&Actor, AppError> {
    actor
        .0
        .as_ref()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
}

/// A signed-in user who may create content and vote.
pub fn require_active_user(actor: &CurrentActor) -> Result<&Actor, AppError> {
    let actor = require_user(actor)?;
    if actor.banned {
        return Err(AppError::Forbidden("Account is banned".to_string()));
    }
    Ok(actor)
}

/// A signed-in, non-banned administrator.
pub fn require_admin(actor: &CurrentActor) -> Result<&Actor, AppError> {
    let actor = require_active_user(actor)?;
    if !actor.is_admin() {
        return Err(AppError::Forbidden(
            "Administrator role required".to_string(),
        ));
    }
    Ok(actor)
}
