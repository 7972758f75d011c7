//! Integration tests for the Serapeu backend and the client store driving it.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::{Client, Method, Response};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::auth::hash_password;
use crate::config::Config;
use crate::db::{init_database, Repository, TokenPurpose};
use crate::errors::StoreError;
use crate::gateway::HttpGateway;
use crate::models::{Category, CreateTutorialRequest};
use crate::optimistic::MutationOutcome;
use crate::store::ClientStore;
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@serapeu.dev";
const PASSWORD: &str = "Segredo123";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    state: AppState,
    _temp_dir: TempDir,
}

fn test_config(temp_dir: &TempDir, require_email_verification: bool) -> Config {
    Config {
        db_path: temp_dir.path().join("test.sqlite"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        require_email_verification,
        session_ttl_hours: 1,
        password_cost: 4,
        public_url: "http://localhost:3000".to_string(),
        admin_seed: None,
    }
}

async fn test_state(temp_dir: &TempDir, require_email_verification: bool) -> AppState {
    let config = test_config(temp_dir, require_email_verification);
    let pool = init_database(&config.db_path)
        .await
        .expect("Failed to init DB");
    let repo = Arc::new(Repository::new(pool));

    let hash = hash_password(PASSWORD, config.password_cost).await.unwrap();
    repo.seed_admin(ADMIN_EMAIL, "Ana Moderadora", &hash)
        .await
        .expect("Failed to seed admin");

    AppState {
        repo,
        config: Arc::new(config),
    }
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_verification(false).await
    }

    async fn with_verification(require_email_verification: bool) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir, require_email_verification).await;
        let app = create_router(state.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestFixture {
            client: Client::new(),
            base_url,
            state,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn call(
        &self,
        method: Method,
        path: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut request = self.client.request(method, self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }
        request.send().await.unwrap()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Response {
        self.call(
            Method::POST,
            "/api/auth/sign-in",
            None,
            Some(json!({ "email": email, "password": password })),
        )
        .await
    }

    async fn admin_token(&self) -> String {
        let body: Value = self.sign_in(ADMIN_EMAIL, PASSWORD).await.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    /// Register a member and return their session token.
    async fn member_token(&self, email: &str, name: &str) -> String {
        let resp = self
            .call(
                Method::POST,
                "/api/auth/sign-up",
                None,
                Some(json!({ "email": email, "password": PASSWORD, "name": name })),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["session"]["token"].as_str().unwrap().to_string()
    }

    async fn create_tutorial(&self, token: &str, title: &str) -> Value {
        let resp = self
            .call(
                Method::POST,
                "/api/tutorials",
                Some(token),
                Some(json!({
                    "title": title,
                    "description": "Passo a passo",
                    "steps": ["Prepare", "Execute", "Revise"],
                    "category": "Tecnologia"
                })),
            )
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn tutorial_ids(&self, token: Option<&str>) -> Vec<String> {
        let body: Value = self
            .call(Method::GET, "/api/tutorials", token, None)
            .await
            .json()
            .await
            .unwrap();
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_str().unwrap().to_string())
            .collect()
    }
}

async fn error_code(resp: Response) -> String {
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    body["error"]["code"].as_str().unwrap().to_string()
}

// ==================== HEALTH ====================

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_without_listener() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_router(test_state(&temp_dir, false).await);

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

// ==================== ACCOUNTS ====================

#[tokio::test]
async fn test_sign_up_then_me() {
    let fixture = TestFixture::new().await;
    let token = fixture.member_token("carlos@serapeu.dev", "Carlos Silva").await;

    let resp = fixture.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Carlos Silva");
    assert_eq!(body["data"]["role"], "USER");
    assert_eq!(body["data"]["banned"], false);
    assert_eq!(body["data"]["savedTutorials"], json!([]));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let fixture = TestFixture::new().await;
    fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/auth/sign-up",
            None,
            Some(json!({ "email": "carlos@serapeu.dev", "password": PASSWORD, "name": "Outro" })),
        )
        .await;
    assert_eq!(resp.status(), 409);
}

#[tokio::test]
async fn test_weak_password_rejected() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/auth/sign-up",
            None,
            Some(json!({ "email": "fraco@serapeu.dev", "password": "abc", "name": "Fraco" })),
        )
        .await;
    assert_eq!(resp.status(), 400);
    assert_eq!(error_code(resp).await, "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_sign_in_failures_look_alike() {
    let fixture = TestFixture::new().await;

    let wrong_password = fixture.sign_in(ADMIN_EMAIL, "Errada123").await;
    assert_eq!(wrong_password.status(), 401);
    let wrong_password: Value = wrong_password.json().await.unwrap();

    let unknown = fixture.sign_in("ninguem@serapeu.dev", PASSWORD).await;
    assert_eq!(unknown.status(), 401);
    let unknown: Value = unknown.json().await.unwrap();

    assert_eq!(wrong_password["error"], unknown["error"]);
}

#[tokio::test]
async fn test_verification_gates_sign_in() {
    let fixture = TestFixture::with_verification(true).await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/auth/sign-up",
            None,
            Some(json!({ "email": "bia@serapeu.dev", "password": PASSWORD, "name": "Bia" })),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["requiresVerification"], true);
    assert!(body["data"].get("session").is_none());

    assert_eq!(fixture.sign_in("bia@serapeu.dev", PASSWORD).await.status(), 401);

    let credentials = fixture
        .state
        .repo
        .find_credentials("bia@serapeu.dev")
        .await
        .unwrap()
        .unwrap();
    let token = fixture
        .state
        .repo
        .issue_one_time_token(&credentials.user.id, TokenPurpose::EmailVerification, 1)
        .await
        .unwrap();

    let resp = fixture
        .call(Method::GET, &format!("/api/auth/verify?token={}", token), None, None)
        .await;
    assert_eq!(resp.status(), 200);
    assert_eq!(fixture.sign_in("bia@serapeu.dev", PASSWORD).await.status(), 200);

    // Tokens are single use.
    let resp = fixture
        .call(Method::GET, &format!("/api/auth/verify?token={}", token), None, None)
        .await;
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_password_reset_revokes_sessions() {
    let fixture = TestFixture::new().await;
    let old_token = fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    // Unknown addresses get the same answer.
    let resp = fixture
        .call(
            Method::POST,
            "/api/auth/password-reset",
            None,
            Some(json!({ "email": "ninguem@serapeu.dev" })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let credentials = fixture
        .state
        .repo
        .find_credentials("carlos@serapeu.dev")
        .await
        .unwrap()
        .unwrap();
    let reset = fixture
        .state
        .repo
        .issue_one_time_token(&credentials.user.id, TokenPurpose::PasswordReset, 1)
        .await
        .unwrap();

    let resp = fixture
        .call(
            Method::POST,
            "/api/auth/password-reset/confirm",
            None,
            Some(json!({ "token": reset, "password": "NovaSenha9" })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.call(Method::GET, "/api/auth/me", Some(&old_token), None).await;
    assert_eq!(resp.status(), 401);
    assert_eq!(fixture.sign_in("carlos@serapeu.dev", PASSWORD).await.status(), 401);
    assert_eq!(fixture.sign_in("carlos@serapeu.dev", "NovaSenha9").await.status(), 200);
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let fixture = TestFixture::new().await;
    let token = fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    let resp = fixture.call(Method::POST, "/api/auth/sign-out", Some(&token), None).await;
    assert_eq!(resp.status(), 200);

    let resp = fixture.call(Method::GET, "/api/auth/me", Some(&token), None).await;
    assert_eq!(resp.status(), 401);
}

// ==================== CONTENT ====================

#[tokio::test]
async fn test_anonymous_write_requires_auth() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/requests",
            None,
            Some(json!({ "title": "Bolo", "description": "De cenoura", "category": "Culinária" })),
        )
        .await;
    assert_eq!(resp.status(), 401);
    assert_eq!(error_code(resp).await, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_pending_tutorial_visibility() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let author = fixture.member_token("carlos@serapeu.dev", "Carlos").await;
    let reader = fixture.member_token("bia@serapeu.dev", "Bia").await;

    let tutorial = fixture.create_tutorial(&author, "Wi-Fi mesh").await;
    assert_eq!(tutorial["approved"], false);
    assert_eq!(tutorial["authorName"], "Carlos");
    let id = tutorial["id"].as_str().unwrap().to_string();

    assert!(!fixture.tutorial_ids(None).await.contains(&id));
    assert!(!fixture.tutorial_ids(Some(&reader)).await.contains(&id));
    assert!(fixture.tutorial_ids(Some(&author)).await.contains(&id));
    assert!(fixture.tutorial_ids(Some(&admin)).await.contains(&id));

    let resp = fixture
        .call(Method::GET, &format!("/api/tutorials/{}", id), None, None)
        .await;
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .call(
            Method::POST,
            &format!("/api/admin/tutorials/{}/approve", id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);
    assert!(fixture.tutorial_ids(None).await.contains(&id));
}

#[tokio::test]
async fn test_admin_tutorial_is_published_immediately() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let tutorial = fixture.create_tutorial(&admin, "Docker").await;
    assert_eq!(tutorial["approved"], true);
}

#[tokio::test]
async fn test_comment_and_upvote() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let reader = fixture.member_token("bia@serapeu.dev", "Bia").await;
    let tutorial = fixture.create_tutorial(&admin, "Horta").await;
    let id = tutorial["id"].as_str().unwrap();

    let resp = fixture
        .call(
            Method::POST,
            &format!("/api/tutorials/{}/comments", id),
            Some(&reader),
            Some(json!({ "content": "  Adorei " })),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["content"], "Adorei");
    assert_eq!(body["data"]["userName"], "Bia");

    for expected in 1..=2 {
        let resp = fixture
            .call(
                Method::POST,
                &format!("/api/tutorials/{}/upvote", id),
                Some(&reader),
                None,
            )
            .await;
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["data"]["upvotes"], expected);
    }

    let resp = fixture
        .call(Method::GET, &format!("/api/tutorials/{}", id), None, None)
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["comments"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["upvotes"], 2);
}

#[tokio::test]
async fn test_report_problem_step_range() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let reader = fixture.member_token("bia@serapeu.dev", "Bia").await;
    let tutorial = fixture.create_tutorial(&admin, "Horta").await;
    let id = tutorial["id"].as_str().unwrap();

    let report = |step: Option<i64>| {
        json!({ "tutorialId": id, "stepNumber": step, "description": "Não funciona" })
    };

    let resp = fixture
        .call(Method::POST, "/api/problems", Some(&reader), Some(report(Some(4))))
        .await;
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .call(Method::POST, "/api/problems", Some(&reader), Some(report(Some(3))))
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .call(Method::POST, "/api/problems", Some(&reader), Some(report(None)))
        .await;
    assert_eq!(resp.status(), 200);

    let body: Value = fixture
        .call(Method::GET, "/api/problems", None, None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_problems_on_pending_tutorial_are_hidden() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let author = fixture.member_token("carlos@serapeu.dev", "Carlos").await;
    let other = fixture.member_token("bia@serapeu.dev", "Bia").await;
    let pending = fixture.create_tutorial(&author, "Rascunho").await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/problems",
            Some(&author),
            Some(json!({ "tutorialId": pending["id"], "description": "Falta um passo" })),
        )
        .await;
    assert_eq!(resp.status(), 200);

    assert_eq!(problem_count(&fixture, None).await, 0);
    assert_eq!(problem_count(&fixture, Some(&other)).await, 0);
    assert_eq!(problem_count(&fixture, Some(&author)).await, 1);
    assert_eq!(problem_count(&fixture, Some(&admin)).await, 1);
}

async fn problem_count(fixture: &TestFixture, token: Option<&str>) -> usize {
    let body: Value = fixture
        .call(Method::GET, "/api/problems", token, None)
        .await
        .json()
        .await
        .unwrap();
    body["data"].as_array().unwrap().len()
}

#[tokio::test]
async fn test_request_upvote_toggles() {
    let fixture = TestFixture::new().await;
    let author = fixture.member_token("carlos@serapeu.dev", "Carlos").await;
    let voter = fixture.member_token("bia@serapeu.dev", "Bia").await;

    let resp = fixture
        .call(
            Method::POST,
            "/api/requests",
            Some(&author),
            Some(json!({ "title": "Bolo", "description": "De cenoura", "category": "Culinária" })),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["upvotes"], 0);

    let path = format!("/api/requests/{}/upvote", id);
    let body: Value = fixture
        .call(Method::POST, &path, Some(&voter), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["upvotes"], 1);
    assert_eq!(body["data"]["upvotedBy"].as_array().unwrap().len(), 1);

    let body: Value = fixture
        .call(Method::POST, &path, Some(&voter), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["upvotes"], 0);
    assert_eq!(body["data"]["upvotedBy"], json!([]));
}

#[tokio::test]
async fn test_saved_set_round_trip() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let reader = fixture.member_token("bia@serapeu.dev", "Bia").await;
    let tutorial = fixture.create_tutorial(&admin, "Horta").await;
    let id = tutorial["id"].as_str().unwrap();

    let resp = fixture
        .call(
            Method::POST,
            "/api/saved",
            Some(&reader),
            Some(json!({ "tutorialId": id })),
        )
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([id]));

    let body: Value = fixture
        .call(Method::GET, "/api/auth/me", Some(&reader), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["savedTutorials"], json!([id]));

    let resp = fixture
        .call(Method::DELETE, &format!("/api/saved/{}", id), Some(&reader), None)
        .await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"], json!([]));

    let resp = fixture
        .call(
            Method::POST,
            "/api/saved",
            Some(&reader),
            Some(json!({ "tutorialId": "missing" })),
        )
        .await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_revision_tracks_writes() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let revision = |body: Value| body["data"]["revisionId"].as_i64().unwrap();
    let before = revision(
        fixture
            .call(Method::GET, "/api/datastore/revision", None, None)
            .await
            .json()
            .await
            .unwrap(),
    );

    fixture.create_tutorial(&admin, "Docker").await;

    let after = revision(
        fixture
            .call(Method::GET, "/api/datastore/revision", None, None)
            .await
            .json()
            .await
            .unwrap(),
    );
    assert!(after > before);
}

// ==================== MODERATION ====================

#[tokio::test]
async fn test_admin_routes_forbidden_for_members() {
    let fixture = TestFixture::new().await;
    let reader = fixture.member_token("bia@serapeu.dev", "Bia").await;

    let resp = fixture.call(Method::GET, "/api/users", Some(&reader), None).await;
    assert_eq!(resp.status(), 403);
    assert_eq!(error_code(resp).await, "FORBIDDEN");

    let resp = fixture.call(Method::GET, "/api/admin/logs", None, None).await;
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_moderation_writes_one_log_per_action() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let author = fixture.member_token("carlos@serapeu.dev", "Carlos").await;
    let tutorial = fixture.create_tutorial(&author, "Wi-Fi mesh").await;
    let approve = format!(
        "/api/admin/tutorials/{}/approve",
        tutorial["id"].as_str().unwrap()
    );

    let resp = fixture.call(Method::POST, &approve, Some(&admin), None).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["action"], "Aprovou tutorial");
    assert_eq!(body["data"]["targetType"], "tutorial");
    assert_eq!(body["data"]["targetName"], "Wi-Fi mesh");
    assert_eq!(body["data"]["adminName"], "Ana Moderadora");

    // Approving twice is refused and leaves the log alone.
    let resp = fixture.call(Method::POST, &approve, Some(&admin), None).await;
    assert_eq!(resp.status(), 409);

    let body: Value = fixture
        .call(Method::GET, "/api/admin/logs", Some(&admin), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let body: Value = fixture
        .call(Method::DELETE, "/api/admin/logs", Some(&admin), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"], 1);
}

#[tokio::test]
async fn test_banned_member_is_read_only() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;
    let member = fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    let body: Value = fixture
        .call(Method::GET, "/api/auth/me", Some(&member), None)
        .await
        .json()
        .await
        .unwrap();
    let member_id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .call(
            Method::POST,
            &format!("/api/admin/users/{}/ban", member_id),
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .call(
            Method::POST,
            "/api/requests",
            Some(&member),
            Some(json!({ "title": "Bolo", "description": "De cenoura", "category": "Culinária" })),
        )
        .await;
    assert_eq!(resp.status(), 403);

    // Still readable, role untouched.
    let body: Value = fixture
        .call(Method::GET, "/api/auth/me", Some(&member), None)
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["data"]["banned"], true);
    assert_eq!(body["data"]["role"], "USER");
}

#[tokio::test]
async fn test_admin_cannot_ban_self() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let body: Value = fixture
        .call(Method::GET, "/api/auth/me", Some(&admin), None)
        .await
        .json()
        .await
        .unwrap();
    let admin_id = body["data"]["id"].as_str().unwrap().to_string();

    for action in ["ban", "demote"] {
        let resp = fixture
            .call(
                Method::POST,
                &format!("/api/admin/users/{}/{}", admin_id, action),
                Some(&admin),
                None,
            )
            .await;
        assert_eq!(resp.status(), 409);
    }
}

#[tokio::test]
async fn test_moderating_missing_target_is_not_found() {
    let fixture = TestFixture::new().await;
    let admin = fixture.admin_token().await;

    let resp = fixture
        .call(Method::DELETE, "/api/admin/requests/missing", Some(&admin), None)
        .await;
    assert_eq!(resp.status(), 404);
    assert_eq!(error_code(resp).await, "NOT_FOUND");
}

// ==================== CLIENT STORE ====================

fn tutorial_request(title: &str) -> CreateTutorialRequest {
    CreateTutorialRequest {
        title: title.to_string(),
        description: "Cobertura na casa toda".to_string(),
        steps: vec!["Posicione os nós".to_string()],
        category: Category::Tecnologia,
    }
}

#[tokio::test]
async fn test_client_store_against_backend() {
    let fixture = TestFixture::new().await;
    fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    let member = ClientStore::new(Arc::new(HttpGateway::new(fixture.url(""))));
    member.sign_in("carlos@serapeu.dev", PASSWORD).await.unwrap();
    let pending = member
        .create_tutorial(tutorial_request("Wi-Fi mesh"))
        .await
        .unwrap();
    assert!(!pending.approved);

    // Unpublished tutorials cannot be voted on.
    assert!(matches!(
        member.upvote_tutorial(&pending.id).await,
        Err(StoreError::NotFound(_))
    ));

    let admin = ClientStore::new(Arc::new(HttpGateway::new(fixture.url(""))));
    admin.sign_in(ADMIN_EMAIL, PASSWORD).await.unwrap();
    assert_eq!(admin.users().await.len(), 2);
    admin.approve_tutorial(&pending.id).await.unwrap();
    assert_eq!(admin.admin_logs().await.len(), 1);

    member.refresh_data().await.unwrap();
    assert!(member.tutorial(&pending.id).await.unwrap().approved);

    assert_eq!(
        member.toggle_saved(&pending.id).await.unwrap(),
        MutationOutcome::Applied
    );
    member.upvote_tutorial(&pending.id).await.unwrap();

    // A fresh session sees what the first one persisted.
    let again = ClientStore::new(Arc::new(HttpGateway::new(fixture.url(""))));
    again.sign_in("carlos@serapeu.dev", PASSWORD).await.unwrap();
    let user = again.current_user().unwrap();
    assert!(user.saved_tutorials.contains(&pending.id));
    assert_eq!(again.tutorial(&pending.id).await.unwrap().upvotes, 1);
}

#[tokio::test]
async fn test_client_store_non_admin_refused_locally() {
    let fixture = TestFixture::new().await;
    fixture.member_token("carlos@serapeu.dev", "Carlos").await;

    let member = ClientStore::new(Arc::new(HttpGateway::new(fixture.url(""))));
    member.sign_in("carlos@serapeu.dev", PASSWORD).await.unwrap();
    assert!(member.users().await.is_empty());
    assert_eq!(
        member.delete_request("any").await.unwrap_err(),
        StoreError::Forbidden
    );
}
