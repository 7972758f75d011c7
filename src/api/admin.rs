//! Moderation API endpoints. Administrators only.
//!
//! Each moderation route answers with the audit entry it wrote.

use axum::{
    extract::{Path, State},
    Extension,
};

use super::{error, respond, success, ApiResult};
use crate::auth::{require_admin, CurrentActor};
use crate::models::{AdminLog, ModerationCommand, User};
use crate::AppState;

async fn moderate(
    state: &AppState,
    actor: &CurrentActor,
    command: ModerationCommand,
) -> ApiResult<AdminLog> {
    let result = match require_admin(actor) {
        Ok(admin) => state.repo.moderate(admin, &command).await,
        Err(e) => {
            tracing::warn!(action = command.action_label(), "Rejected moderation attempt");
            Err(e)
        }
    };
    respond(state, result).await
}

/// POST /api/admin/tutorials/{id}/approve
pub async fn approve_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::ApproveTutorial { tutorial_id: id }).await
}

/// DELETE /api/admin/tutorials/{id}
pub async fn delete_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::DeleteTutorial { tutorial_id: id }).await
}

/// DELETE /api/admin/tutorials/{id}/comments/{comment_id}
pub async fn delete_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path((tutorial_id, comment_id)): Path<(String, String)>,
) -> ApiResult<AdminLog> {
    moderate(
        &state,
        &actor,
        ModerationCommand::DeleteComment {
            tutorial_id,
            comment_id,
        },
    )
    .await
}

/// POST /api/admin/users/{id}/ban
pub async fn ban_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::BanUser { user_id: id }).await
}

/// POST /api/admin/users/{id}/unban
pub async fn unban_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::UnbanUser { user_id: id }).await
}

/// POST /api/admin/users/{id}/promote
pub async fn promote_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::PromoteToAdmin { user_id: id }).await
}

/// POST /api/admin/users/{id}/demote
pub async fn demote_user(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::DemoteFromAdmin { user_id: id }).await
}

/// POST /api/admin/problems/{id}/resolve
pub async fn resolve_problem(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::ResolveProblem { problem_id: id }).await
}

/// DELETE /api/admin/problems/{id}
pub async fn delete_problem(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::DeleteProblem { problem_id: id }).await
}

/// DELETE /api/admin/requests/{id}
pub async fn delete_request(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<AdminLog> {
    moderate(&state, &actor, ModerationCommand::DeleteRequest { request_id: id }).await
}

/// GET /api/admin/logs - Audit log, newest first.
pub async fn list_admin_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<Vec<AdminLog>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin(&actor) {
        return error(e, revision_id);
    }

    match state.repo.list_admin_logs().await {
        Ok(logs) => success(logs, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /api/admin/logs - Clear the audit log. Returns how many entries went.
pub async fn clear_admin_logs(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<u64> {
    let result = match require_admin(&actor) {
        Ok(admin) => {
            let result = state.repo.clear_admin_logs().await;
            if let Ok(removed) = &result {
                tracing::info!(admin = %admin.user_id, removed, "Audit log cleared");
            }
            result
        }
        Err(e) => Err(e),
    };
    respond(&state, result).await
}

/// GET /api/users - All profiles.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<Vec<User>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    if let Err(e) = require_admin(&actor) {
        return error(e, revision_id);
    }

    match state.repo.list_profiles().await {
        Ok(users) => success(users, revision_id),
        Err(e) => error(e, revision_id),
    }
}
