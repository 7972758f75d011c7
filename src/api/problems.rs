//! Problem report API endpoints.

use axum::{extract::State, Extension, Json};

use super::{error, respond, success, ApiResult};
use crate::auth::{require_active_user, CurrentActor};
use crate::models::{ReportProblemRequest, TutorialProblem};
use crate::AppState;

/// GET /api/problems - Problem reports on tutorials visible to the caller.
pub async fn list_problems(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<Vec<TutorialProblem>> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    match state.repo.list_problems(actor.0.as_ref()).await {
        Ok(problems) => success(problems, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// POST /api/problems - Report a problem with a tutorial or one of its steps.
pub async fn report_problem(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Json(request): Json<ReportProblemRequest>,
) -> ApiResult<TutorialProblem> {
    let result = match require_active_user(&actor) {
        Ok(reporter) => state.repo.report_problem(reporter, request).await,
        Err(e) => Err(e),
    };
    respond(&state, result).await
}
