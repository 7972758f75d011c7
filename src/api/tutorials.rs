//! Tutorial API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{error, respond, success, ApiResult};
use crate::auth::{require_active_user, CurrentActor};
use crate::errors::AppError;
use crate::models::{Comment, CreateCommentRequest, CreateTutorialRequest, Tutorial};
use crate::validation::{validate_comment, validate_tutorial};
use crate::AppState;

/// GET /api/tutorials - Tutorials visible to the caller, newest first.
pub async fn list_tutorials(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<Vec<Tutorial>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_tutorials(actor.0.as_ref()).await {
        Ok(tutorials) => success(tutorials, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/tutorials/{id} - Get a single tutorial.
pub async fn get_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<Tutorial> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.get_tutorial(actor.0.as_ref(), &id).await {
        Ok(Some(tutorial)) => success(tutorial, revision_id),
        Ok(None) => error(
            AppError::NotFound(format!("Tutorial {} not found", id)),
            revision_id,
        ),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/tutorials - Submit a tutorial.
///
/// Administrator submissions are published immediately; all others wait for
/// approval.
pub async fn create_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Json(request): Json<CreateTutorialRequest>,
) -> ApiResult<Tutorial> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let author = match require_active_user(&actor) {
        Ok(author) => author,
        Err(e) => return error(e, revision_id),
    };
    let request = match validate_tutorial(request) {
        Ok(request) => request,
        Err(e) => return error(e.into(), revision_id),
    };

    let result = state.repo.create_tutorial(author, &request).await;
    if let Ok(tutorial) = &result {
        tracing::info!(
            tutorial_id = %tutorial.id,
            approved = tutorial.approved,
            "Tutorial submitted"
        );
    }
    respond(&state, result).await
}

/// POST /api/tutorials/{id}/upvote - Add one vote.
pub async fn upvote_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<Tutorial> {
    let result = match require_active_user(&actor) {
        Ok(voter) => state.repo.upvote_tutorial(voter, &id).await,
        Err(e) => Err(e),
    };
    respond(&state, result).await
}

/// POST /api/tutorials/{id}/comments - Comment on a tutorial.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Comment> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let author = match require_active_user(&actor) {
        Ok(author) => author,
        Err(e) => return error(e, revision_id),
    };
    let request = match validate_comment(request) {
        Ok(request) => request,
        Err(e) => return error(e.into(), revision_id),
    };

    let result = state.repo.add_comment(author, &id, &request).await;
    respond(&state, result).await
}
