//! Account API endpoints: sign-up, sign-in, verification and password reset.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Extension, Json,
};
use serde::Deserialize;

use super::{error, respond, success, ApiResult};
use crate::auth::{bearer_token, hash_password, require_user, verify_password, CurrentActor};
use crate::db::{NewProfile, TokenPurpose};
use crate::errors::AppError;
use crate::models::{
    AuthSession, PasswordResetConfirm, PasswordResetRequest, Role, SignInRequest, SignUpRequest,
    SignUpResponse, UpdateProfileRequest, User,
};
use crate::validation::{validate_credentials, validate_new_password, validate_profile_name};
use crate::AppState;

const VERIFICATION_TTL_HOURS: i64 = 24;
const RESET_TTL_HOURS: i64 = 1;

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid credentials".to_string())
}

fn invalid_token() -> AppError {
    AppError::BadRequest("Invalid or expired token".to_string())
}

async fn open_session(state: &AppState, user_id: &str) -> Result<AuthSession, AppError> {
    let (token, expires_at) = state
        .repo
        .create_session(user_id, state.config.session_ttl_hours)
        .await?;
    let user = state
        .repo
        .get_profile(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", user_id)))?;
    Ok(AuthSession {
        token,
        expires_at,
        user,
    })
}

async fn register(state: &AppState, request: SignUpRequest) -> Result<SignUpResponse, AppError> {
    validate_credentials(&request)?;

    let password_hash = hash_password(&request.password, state.config.password_cost).await?;
    let requires_verification = state.config.require_email_verification;
    let user = state
        .repo
        .create_profile(NewProfile {
            email: request.email.trim(),
            name: request.name.trim(),
            password_hash: &password_hash,
            role: Role::User,
            email_verified: !requires_verification,
        })
        .await?;
    tracing::info!(user_id = %user.id, "Profile created");

    if !requires_verification {
        return Ok(SignUpResponse {
            requires_verification: false,
            session: Some(open_session(state, &user.id).await?),
        });
    }

    let token = state
        .repo
        .issue_one_time_token(
            &user.id,
            TokenPurpose::EmailVerification,
            VERIFICATION_TTL_HOURS,
        )
        .await?;
    tracing::info!(
        email = %user.email,
        link = %format!("{}/auth/verify?token={}", state.config.public_url, token),
        "Verification link issued"
    );

    Ok(SignUpResponse {
        requires_verification: true,
        session: None,
    })
}

/// POST /api/auth/sign-up - Register with e-mail and password.
pub async fn sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> ApiResult<SignUpResponse> {
    let result = register(&state, request).await;
    respond(&state, result).await
}

async fn authenticate(state: &AppState, request: SignInRequest) -> Result<AuthSession, AppError> {
    let credentials = state
        .repo
        .find_credentials(&request.email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !verify_password(&request.password, &credentials.password_hash).await? {
        tracing::debug!(user_id = %credentials.user.id, "Password mismatch");
        return Err(invalid_credentials());
    }
    if !credentials.email_verified {
        tracing::debug!(user_id = %credentials.user.id, "Sign-in before verification");
        return Err(invalid_credentials());
    }

    open_session(state, &credentials.user.id).await
}

/// POST /api/auth/sign-in - Exchange credentials for a session token.
///
/// Unknown e-mail, wrong password and unverified address are indistinguishable.
pub async fn sign_in(
    State(state): State<AppState>,
    Json(request): Json<SignInRequest>,
) -> ApiResult<AuthSession> {
    let result = authenticate(&state, request).await;
    respond(&state, result).await
}

/// POST /api/auth/sign-out - Revoke the presented session token.
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<()> {
    let result = match bearer_token(&headers) {
        Some(token) => state.repo.delete_session(&token).await,
        None => Ok(()),
    };
    respond(&state, result).await
}

/// GET /api/auth/me - The signed-in profile, saved tutorials included.
pub async fn me(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<User> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let actor = match require_user(&actor) {
        Ok(actor) => actor,
        Err(e) => return error(e, revision_id),
    };

    match state.repo.get_profile(&actor.user_id).await {
        Ok(Some(user)) => success(user, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Profile {} not found", actor.user_id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub token: String,
}

async fn confirm_email(state: &AppState, token: &str) -> Result<(), AppError> {
    let user_id = state
        .repo
        .consume_one_time_token(token, TokenPurpose::EmailVerification)
        .await?
        .ok_or_else(invalid_token)?;
    state.repo.mark_email_verified(&user_id).await?;
    tracing::info!(user_id = %user_id, "E-mail verified");
    Ok(())
}

/// GET /api/auth/verify?token= - Confirm an e-mail address.
pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> ApiResult<()> {
    let result = confirm_email(&state, &query.token).await;
    respond(&state, result).await
}

/// POST /api/auth/password-reset - Issue a reset link.
///
/// Always succeeds so the endpoint cannot be used to probe for accounts.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetRequest>,
) -> ApiResult<()> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let credentials = match state.repo.find_credentials(&request.email).await {
        Ok(credentials) => credentials,
        Err(e) => return error(e, revision_id),
    };

    let Some(credentials) = credentials else {
        tracing::debug!("Password reset requested for unknown e-mail");
        return success((), revision_id);
    };

    match state
        .repo
        .issue_one_time_token(
            &credentials.user.id,
            TokenPurpose::PasswordReset,
            RESET_TTL_HOURS,
        )
        .await
    {
        Ok(token) => {
            tracing::info!(
                email = %credentials.user.email,
                link = %format!("{}/auth/reset?token={}", state.config.public_url, token),
                "Password reset link issued"
            );
            success((), revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

async fn reset_password(state: &AppState, request: PasswordResetConfirm) -> Result<(), AppError> {
    validate_new_password(&request.password)?;
    let user_id = state
        .repo
        .consume_one_time_token(&request.token, TokenPurpose::PasswordReset)
        .await?
        .ok_or_else(invalid_token)?;

    let password_hash = hash_password(&request.password, state.config.password_cost).await?;
    state.repo.set_password_hash(&user_id, &password_hash).await?;
    state.repo.delete_sessions_for_user(&user_id).await?;
    tracing::info!(user_id = %user_id, "Password reset");
    Ok(())
}

/// POST /api/auth/password-reset/confirm - Set a new password with a reset token.
///
/// Every open session of the account is revoked.
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(request): Json<PasswordResetConfirm>,
) -> ApiResult<()> {
    let result = reset_password(&state, request).await;
    respond(&state, result).await
}

/// PUT /api/auth/profile - Rename the signed-in user.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Json(request): Json<UpdateProfileRequest>,
) -> ApiResult<User> {
    let result = match require_user(&actor) {
        Ok(actor) => match validate_profile_name(&request.name) {
            Ok(name) => state.repo.update_profile_name(&actor.user_id, &name).await,
            Err(e) => Err(e.into()),
        },
        Err(e) => Err(e),
    };
    respond(&state, result).await
}
