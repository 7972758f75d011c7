//! Remote data gateway.
//!
//! A stateless request/response boundary to the backend: one call per read or
//! write, no retries and no batching. Retry policy belongs to the caller.

mod http;

pub use http::*;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::errors::GatewayError;
use crate::models::{
    AdminLog, AuthSession, Comment, CreateCommentRequest, CreateRequestRequest,
    CreateTutorialRequest, ModerationCommand, ReportProblemRequest, SignInRequest, SignUpRequest,
    SignUpResponse, Tutorial, TutorialProblem, TutorialRequest, UpdateProfileRequest, User,
};

#[async_trait]
pub trait Gateway: Send + Sync {
    // Identity
    async fn sign_in(&self, request: &SignInRequest) -> Result<AuthSession, GatewayError>;
    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError>;
    async fn sign_out(&self) -> Result<(), GatewayError>;
    /// Profile behind the current credentials, saved tutorials included.
    async fn current_profile(&self) -> Result<User, GatewayError>;
    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<User, GatewayError>;

    // Reads
    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, GatewayError>;
    async fn list_requests(&self) -> Result<Vec<TutorialRequest>, GatewayError>;
    async fn list_users(&self) -> Result<Vec<User>, GatewayError>;
    async fn list_problems(&self) -> Result<Vec<TutorialProblem>, GatewayError>;
    async fn list_admin_logs(&self) -> Result<Vec<AdminLog>, GatewayError>;

    // Writes
    async fn insert_tutorial(
        &self,
        request: &CreateTutorialRequest,
    ) -> Result<Tutorial, GatewayError>;
    async fn insert_request(
        &self,
        request: &CreateRequestRequest,
    ) -> Result<TutorialRequest, GatewayError>;
    async fn insert_problem(
        &self,
        request: &ReportProblemRequest,
    ) -> Result<TutorialProblem, GatewayError>;
    async fn insert_comment(
        &self,
        tutorial_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, GatewayError>;
    /// Returns the caller's saved set after the insert.
    async fn insert_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError>;
    /// Returns the caller's saved set after the delete.
    async fn delete_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError>;
    async fn upvote_tutorial(&self, tutorial_id: &str) -> Result<Tutorial, GatewayError>;
    async fn toggle_request_upvote(
        &self,
        request_id: &str,
    ) -> Result<TutorialRequest, GatewayError>;

    // Moderation
    /// Apply a moderation command; the backend answers with the audit entry.
    async fn moderate(&self, command: &ModerationCommand) -> Result<AdminLog, GatewayError>;
    async fn clear_admin_logs(&self) -> Result<u64, GatewayError>;
}
