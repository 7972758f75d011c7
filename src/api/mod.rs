//! REST API module.
//!
//! Contains all API routes and handlers. Every handler answers with the
//! `{success, data | error, revisionId}` envelope.

mod admin;
mod auth;
mod datastore;
mod problems;
mod requests;
mod saved;
mod tutorials;

pub use admin::*;
pub use auth::*;
pub use datastore::*;
pub use problems::*;
pub use requests::*;
pub use saved::*;
pub use tutorials::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, crate::errors::AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(crate::errors::AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Wrap a repository outcome, stamping it with the revision after the call.
pub(crate) async fn respond<T: Serialize>(
    state: &AppState,
    result: Result<T, AppError>,
) -> ApiResult<T> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);
    match result {
        Ok(data) => success(data, revision_id),
        Err(e) => error(e, revision_id),
    }
}
