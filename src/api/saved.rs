//! Saved-tutorial link endpoints. Each answers with the caller's full saved set.

use std::collections::BTreeSet;

use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::{respond, ApiResult};
use crate::auth::{require_user, CurrentActor};
use crate::errors::AppError;
use crate::models::SaveTutorialRequest;
use crate::AppState;

async fn saved_after(
    state: &AppState,
    actor: &CurrentActor,
    change: Option<(&str, bool)>,
) -> Result<BTreeSet<String>, AppError> {
    let actor = require_user(actor)?;
    match change {
        Some((tutorial_id, true)) => state.repo.insert_saved(&actor.user_id, tutorial_id).await?,
        Some((tutorial_id, false)) => state.repo.delete_saved(&actor.user_id, tutorial_id).await?,
        None => {}
    }
    state.repo.list_saved(&actor.user_id).await
}

/// GET /api/saved - Ids of the caller's saved tutorials.
pub async fn list_saved(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
) -> ApiResult<BTreeSet<String>> {
    let result = saved_after(&state, &actor, None).await;
    respond(&state, result).await
}

/// POST /api/saved - Save a tutorial. Saving twice is harmless.
pub async fn save_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Json(request): Json<SaveTutorialRequest>,
) -> ApiResult<BTreeSet<String>> {
    let result = saved_after(&state, &actor, Some((&request.tutorial_id, true))).await;
    respond(&state, result).await
}

/// DELETE /api/saved/{tutorial_id} - Unsave a tutorial.
pub async fn unsave_tutorial(
    State(state): State<AppState>,
    Extension(actor): Extension<CurrentActor>,
    Path(tutorial_id): Path<String>,
) -> ApiResult<BTreeSet<String>> {
    let result = saved_after(&state, &actor, Some((&tutorial_id, false))).await;
    respond(&state, result).await
}
