//! [`Gateway`] over the backend's REST API.

use std::collections::BTreeSet;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tokio::sync::RwLock;

use super::Gateway;
use crate::api::ApiResponse;
use crate::errors::{ErrorResponse, GatewayError};
use crate::models::{
    AdminLog, AuthSession, Comment, CreateCommentRequest, CreateRequestRequest,
    CreateTutorialRequest, ModerationCommand, ReportProblemRequest, SignInRequest, SignUpRequest,
    SignUpResponse, Tutorial, TutorialProblem, TutorialRequest, UpdateProfileRequest, User,
};

/// HTTP gateway. Holds the bearer token issued at sign-in.
pub struct HttpGateway {
    client: Client,
    base_url: String,
    token: RwLock<Option<String>>,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    /// Resume with a token from an earlier session.
    pub fn with_token(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
            ..Self::new(base_url)
        }
    }

    /// The bearer token currently attached to requests.
    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/api{}", self.base_url, path))
    }

    /// Send one request and unwrap the response envelope.
    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, GatewayError> {
        let builder = match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            let envelope: ApiResponse<T> = serde_json::from_str(&body).map_err(|e| {
                GatewayError::status(status.as_u16(), None, format!("Malformed response: {}", e))
            })?;
            return Ok(envelope.data);
        }

        let err = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(envelope) => GatewayError::status(
                status.as_u16(),
                Some(envelope.error.code),
                envelope.error.message,
            ),
            Err(_) => GatewayError::status(
                status.as_u16(),
                None,
                status
                    .canonical_reason()
                    .unwrap_or("Unexpected response")
                    .to_string(),
            ),
        };
        tracing::debug!(status = status.as_u16(), cause = %err.cause, "Gateway call failed");
        Err(err)
    }

    async fn store_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }
}

fn moderation_route(command: &ModerationCommand) -> (Method, String) {
    match command {
        ModerationCommand::ApproveTutorial { tutorial_id } => (
            Method::POST,
            format!("/admin/tutorials/{}/approve", tutorial_id),
        ),
        ModerationCommand::DeleteTutorial { tutorial_id } => {
            (Method::DELETE, format!("/admin/tutorials/{}", tutorial_id))
        }
        ModerationCommand::DeleteComment {
            tutorial_id,
            comment_id,
        } => (
            Method::DELETE,
            format!("/admin/tutorials/{}/comments/{}", tutorial_id, comment_id),
        ),
        ModerationCommand::BanUser { user_id } => {
            (Method::POST, format!("/admin/users/{}/ban", user_id))
        }
        ModerationCommand::UnbanUser { user_id } => {
            (Method::POST, format!("/admin/users/{}/unban", user_id))
        }
        ModerationCommand::PromoteToAdmin { user_id } => {
            (Method::POST, format!("/admin/users/{}/promote", user_id))
        }
        ModerationCommand::DemoteFromAdmin { user_id } => {
            (Method::POST, format!("/admin/users/{}/demote", user_id))
        }
        ModerationCommand::ResolveProblem { problem_id } => (
            Method::POST,
            format!("/admin/problems/{}/resolve", problem_id),
        ),
        ModerationCommand::DeleteProblem { problem_id } => {
            (Method::DELETE, format!("/admin/problems/{}", problem_id))
        }
        ModerationCommand::DeleteRequest { request_id } => {
            (Method::DELETE, format!("/admin/requests/{}", request_id))
        }
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn sign_in(&self, request: &SignInRequest) -> Result<AuthSession, GatewayError> {
        let session: AuthSession = self
            .send(self.request(Method::POST, "/auth/sign-in").json(request))
            .await?;
        self.store_token(Some(session.token.clone())).await;
        Ok(session)
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        let response: SignUpResponse = self
            .send(self.request(Method::POST, "/auth/sign-up").json(request))
            .await?;
        if let Some(session) = &response.session {
            self.store_token(Some(session.token.clone())).await;
        }
        Ok(response)
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        let result = self
            .send::<()>(self.request(Method::POST, "/auth/sign-out"))
            .await;
        // The local token is dropped even when revocation failed.
        self.store_token(None).await;
        result
    }

    async fn current_profile(&self) -> Result<User, GatewayError> {
        self.send(self.request(Method::GET, "/auth/me")).await
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<User, GatewayError> {
        self.send(self.request(Method::PUT, "/auth/profile").json(request))
            .await
    }

    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, GatewayError> {
        self.send(self.request(Method::GET, "/tutorials")).await
    }

    async fn list_requests(&self) -> Result<Vec<TutorialRequest>, GatewayError> {
        self.send(self.request(Method::GET, "/requests")).await
    }

    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        self.send(self.request(Method::GET, "/users")).await
    }

    async fn list_problems(&self) -> Result<Vec<TutorialProblem>, GatewayError> {
        self.send(self.request(Method::GET, "/problems")).await
    }

    async fn list_admin_logs(&self) -> Result<Vec<AdminLog>, GatewayError> {
        self.send(self.request(Method::GET, "/admin/logs")).await
    }

    async fn insert_tutorial(
        &self,
        request: &CreateTutorialRequest,
    ) -> Result<Tutorial, GatewayError> {
        self.send(self.request(Method::POST, "/tutorials").json(request))
            .await
    }

    async fn insert_request(
        &self,
        request: &CreateRequestRequest,
    ) -> Result<TutorialRequest, GatewayError> {
        self.send(self.request(Method::POST, "/requests").json(request))
            .await
    }

    async fn insert_problem(
        &self,
        request: &ReportProblemRequest,
    ) -> Result<TutorialProblem, GatewayError> {
        self.send(self.request(Method::POST, "/problems").json(request))
            .await
    }

    async fn insert_comment(
        &self,
        tutorial_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, GatewayError> {
        let path = format!("/tutorials/{}/comments", tutorial_id);
        self.send(self.request(Method::POST, &path).json(request))
            .await
    }

    async fn insert_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError> {
        self.send(
            self.request(Method::POST, "/saved")
                .json(&json!({ "tutorialId": tutorial_id })),
        )
        .await
    }

    async fn delete_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError> {
        let path = format!("/saved/{}", tutorial_id);
        self.send(self.request(Method::DELETE, &path)).await
    }

    async fn upvote_tutorial(&self, tutorial_id: &str) -> Result<Tutorial, GatewayError> {
        let path = format!("/tutorials/{}/upvote", tutorial_id);
        self.send(self.request(Method::POST, &path)).await
    }

    async fn toggle_request_upvote(
        &self,
        request_id: &str,
    ) -> Result<TutorialRequest, GatewayError> {
        let path = format!("/requests/{}/upvote", request_id);
        self.send(self.request(Method::POST, &path)).await
    }

    async fn moderate(&self, command: &ModerationCommand) -> Result<AdminLog, GatewayError> {
        let (method, path) = moderation_route(command);
        self.send(self.request(method, &path)).await
    }

    async fn clear_admin_logs(&self) -> Result<u64, GatewayError> {
        self.send(self.request(Method::DELETE, "/admin/logs")).await
    }
}
