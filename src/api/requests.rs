//! Tutorial request API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{error, respond, success, ApiResult};
use crate::auth::{require_active_user, CurrentActor};
use crate::models::{CreateRequestRequest, TutorialRequest};
use crate::validation::validate_request;
use crate::AppState;

/// GET /api/requests - All tutorial requests, newest first.
pub async fn list_requests(State(state): State<AppState>) -> ApiResult<Vec<TutorialRequest>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_requests().await {
        Ok(requests) => success(requests, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/requests - Ask the community for a tutorial.
pub async fn create_request(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Json(request): Json<CreateRequestRequest>,
) -> ApiResult<TutorialRequest> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    let author = match require_active_user(&actor) {
        Ok(author) => author,
        Err(e) => return error(e, revision_id),
    };
    let request = match validate_request(request) {
        Ok(request) => request,
        Err(e) => return error(e.into(), revision_id),
    };

    let result = state.repo.create_request(author, &request).await;
    respond(&state, result).await
}

/// POST /api/requests/{id}/upvote - Toggle the caller's vote.
pub async fn toggle_request_upvote(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(id): Path<String>,
) -> ApiResult<TutorialRequest> {
    let result = match require_active_user(&actor) {
        Ok(voter) => state.repo.toggle_request_upvote(voter, &id).await,
        Err(e) => Err(e),
    };
    respond(&state, result).await
}
