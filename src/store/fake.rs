//! In-memory [`Gateway`] for store tests.
//!
//! Mirrors the backend's visibility and authorization rules closely enough to
//! drive the store: one signed-in user at a time, failures injectable per
//! method, and writes that can be held mid-flight.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;
use uuid::Uuid;

use super::StoreState;
use crate::errors::{codes, GatewayError, StoreError};
use crate::gateway::Gateway;
use crate::models::{
    truncate_target_name, AdminLog, AuthSession, Category, Comment, CreateCommentRequest,
    CreateRequestRequest, CreateTutorialRequest, ModerationCommand, ReportProblemRequest, Role,
    SignInRequest, SignUpRequest, SignUpResponse, Tutorial, TutorialProblem, TutorialRequest,
    UpdateProfileRequest, User,
};
use crate::moderation::{apply_command, check_precondition, target_text};

/// Password accepted for every seeded account.
pub const PASSWORD: &str = "segredo123";

#[derive(Default)]
struct Backend {
    data: StoreState,
    saved: HashMap<String, BTreeSet<String>>,
    current: Option<String>,
}

impl Backend {
    fn profile(&self, user_id: &str) -> Option<User> {
        let mut user = self.data.users.iter().find(|u| u.id == user_id)?.clone();
        user.saved_tutorials = self.saved.get(user_id).cloned().unwrap_or_default();
        Some(user)
    }

    fn viewer(&self) -> Result<User, GatewayError> {
        self.current
            .as_deref()
            .and_then(|id| self.profile(id))
            .ok_or_else(|| fail(401, codes::UNAUTHORIZED, "Authentication required"))
    }

    fn active_viewer(&self) -> Result<User, GatewayError> {
        let user = self.viewer()?;
        if user.banned {
            return Err(fail(403, codes::FORBIDDEN, "Account is banned"));
        }
        Ok(user)
    }

    fn admin(&self) -> Result<User, GatewayError> {
        let user = self.viewer()?;
        if !user.is_admin() {
            return Err(fail(403, codes::FORBIDDEN, "Administrator role required"));
        }
        Ok(user)
    }

    fn session(&self, user: User) -> AuthSession {
        AuthSession {
            token: Uuid::new_v4().to_string(),
            expires_at: Utc::now().to_rfc3339(),
            user,
        }
    }
}

fn fail(status: u16, code: &str, cause: &str) -> GatewayError {
    GatewayError::status(status, Some(code.to_string()), cause)
}

fn visible_to(viewer: Option<&User>, tutorial: &Tutorial) -> bool {
    tutorial.approved || viewer.is_some_and(|v| v.is_admin() || v.id == tutorial.author_id)
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) struct FakeGateway {
    backend: Mutex<Backend>,
    calls: Mutex<HashMap<&'static str, usize>>,
    failing: Mutex<HashSet<String>>,
    hold: watch::Sender<bool>,
}

impl FakeGateway {
    pub const ADMIN_EMAIL: &'static str = "admin@serapeu.dev";
    pub const USER_EMAIL: &'static str = "carlos@serapeu.dev";
    /// Seeded tutorial awaiting approval, written by the regular user.
    pub const PENDING_TUTORIAL: &'static str = "T123";

    /// Two accounts, one published and one pending tutorial, one open problem
    /// and one request.
    pub fn seeded() -> Self {
        let created_at = "2025-11-20T10:00:00Z".to_string();
        let admin = User {
            id: "u-admin".to_string(),
            email: Self::ADMIN_EMAIL.to_string(),
            name: "Ana Moderadora".to_string(),
            role: Role::Admin,
            created_at: created_at.clone(),
            banned: false,
            saved_tutorials: BTreeSet::new(),
        };
        let user = User {
            id: "u-carlos".to_string(),
            email: Self::USER_EMAIL.to_string(),
            name: "Carlos Silva".to_string(),
            role: Role::User,
            created_at: created_at.clone(),
            banned: false,
            saved_tutorials: BTreeSet::new(),
        };

        let bread = Tutorial {
            id: "T1".to_string(),
            title: "Pão caseiro".to_string(),
            description: "Massa simples de fermentação curta".to_string(),
            steps: vec![
                "Misture farinha e fermento".to_string(),
                "Sove por dez minutos".to_string(),
                "Asse a 200 graus".to_string(),
            ],
            author_id: admin.id.clone(),
            author_name: admin.name.clone(),
            category: Category::Culinaria,
            created_at: created_at.clone(),
            approved: true,
            upvotes: 12,
            comments: vec![Comment {
                id: "c1".to_string(),
                tutorial_id: "T1".to_string(),
                user_id: user.id.clone(),
                user_name: user.name.clone(),
                content: "Ficou ótimo!".to_string(),
                created_at: created_at.clone(),
            }],
        };
        let pending = Tutorial {
            id: Self::PENDING_TUTORIAL.to_string(),
            title: "Configurar Wi-Fi mesh".to_string(),
            description: "Cobertura na casa toda".to_string(),
            steps: vec!["Posicione os nós".to_string()],
            author_id: user.id.clone(),
            author_name: user.name.clone(),
            category: Category::Tecnologia,
            created_at: created_at.clone(),
            approved: false,
            upvotes: 0,
            comments: Vec::new(),
        };
        let problem = TutorialProblem {
            id: "p1".to_string(),
            tutorial_id: bread.id.clone(),
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            step_number: Some(2),
            description: "Tempo de sova não bate".to_string(),
            created_at: created_at.clone(),
            resolved: false,
        };
        let request = TutorialRequest {
            id: "r1".to_string(),
            user_id: admin.id.clone(),
            user_name: admin.name.clone(),
            title: "Docker no Windows".to_string(),
            description: "Passo a passo com WSL2".to_string(),
            category: Category::Tecnologia,
            created_at,
            upvotes: 1,
            upvoted_by: vec![admin.id.clone()],
            answered: false,
            answered_tutorial_id: None,
        };

        let backend = Backend {
            data: StoreState {
                tutorials: vec![bread, pending],
                problems: vec![problem],
                requests: vec![request],
                users: vec![admin, user],
                ..StoreState::default()
            },
            ..Backend::default()
        };
        let (hold, _) = watch::channel(false);
        Self {
            backend: Mutex::new(backend),
            calls: Mutex::new(HashMap::new()),
            failing: Mutex::new(HashSet::new()),
            hold,
        }
    }

    /// Tutorials an anonymous visitor can see.
    pub fn public_tutorial_count(&self) -> usize {
        self.lock().data.tutorials.iter().filter(|t| t.approved).count()
    }

    /// Make every later call to `method` fail with a 500.
    pub fn fail(&self, method: &str) {
        self.failing.lock().unwrap().insert(method.to_string());
    }

    pub fn calls(&self, method: &str) -> usize {
        self.calls.lock().unwrap().get(method).copied().unwrap_or(0)
    }

    /// Park every write after it is counted, until [`FakeGateway::release`].
    pub fn hold_writes(&self) {
        self.hold.send_replace(true);
    }

    pub fn release(&self) {
        self.hold.send_replace(false);
    }

    pub async fn wait_for_call(&self, method: &str) {
        while self.calls(method) == 0 {
            tokio::task::yield_now().await;
        }
    }

    /// Whether the signed-in user's saved set holds `tutorial_id` remotely.
    pub fn saved_contains(&self, tutorial_id: &str) -> bool {
        let backend = self.lock();
        backend
            .current
            .as_ref()
            .and_then(|id| backend.saved.get(id))
            .is_some_and(|saved| saved.contains(tutorial_id))
    }

    pub fn tutorial_upvotes(&self, tutorial_id: &str) -> i64 {
        self.lock()
            .data
            .tutorials
            .iter()
            .find(|t| t.id == tutorial_id)
            .map_or(0, |t| t.upvotes)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Backend> {
        self.backend.lock().unwrap()
    }

    fn read(&self, method: &'static str) -> Result<(), GatewayError> {
        *self.calls.lock().unwrap().entry(method).or_default() += 1;
        if self.failing.lock().unwrap().contains(method) {
            return Err(fail(500, codes::INTERNAL_ERROR, "injected failure"));
        }
        Ok(())
    }

    async fn write(&self, method: &'static str) -> Result<(), GatewayError> {
        self.read(method)?;
        let mut held = self.hold.subscribe();
        let _ = held.wait_for(|held| !*held).await;
        Ok(())
    }
}

fn refusal(err: StoreError) -> GatewayError {
    match err {
        StoreError::NotFound(what) => fail(404, codes::NOT_FOUND, &what),
        other => fail(409, codes::CONFLICT, &other.to_string()),
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn sign_in(&self, request: &SignInRequest) -> Result<AuthSession, GatewayError> {
        self.read("sign_in")?;
        let mut backend = self.lock();
        let user = backend
            .data
            .users
            .iter()
            .find(|u| u.email == request.email)
            .filter(|_| request.password == PASSWORD)
            .map(|u| u.id.clone())
            .and_then(|id| backend.profile(&id))
            .ok_or_else(|| fail(401, codes::UNAUTHORIZED, "Invalid credentials"))?;
        backend.current = Some(user.id.clone());
        Ok(backend.session(user))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<SignUpResponse, GatewayError> {
        self.read("sign_up")?;
        let mut backend = self.lock();
        if backend.data.users.iter().any(|u| u.email == request.email) {
            return Err(fail(409, codes::CONFLICT, "E-mail already registered"));
        }
        let user = User {
            id: Uuid::new_v4().to_string(),
            email: request.email.clone(),
            name: request.name.clone(),
            role: Role::User,
            created_at: now(),
            banned: false,
            saved_tutorials: BTreeSet::new(),
        };
        backend.data.users.push(user.clone());
        backend.current = Some(user.id.clone());
        Ok(SignUpResponse {
            requires_verification: false,
            session: Some(backend.session(user)),
        })
    }

    async fn sign_out(&self) -> Result<(), GatewayError> {
        self.read("sign_out")?;
        self.lock().current = None;
        Ok(())
    }

    async fn current_profile(&self) -> Result<User, GatewayError> {
        self.read("current_profile")?;
        self.lock().viewer()
    }

    async fn update_profile(&self, request: &UpdateProfileRequest) -> Result<User, GatewayError> {
        self.write("update_profile").await?;
        let mut backend = self.lock();
        let viewer = backend.viewer()?;
        for user in backend.data.users.iter_mut().filter(|u| u.id == viewer.id) {
            user.name = request.name.clone();
        }
        backend.viewer()
    }

    async fn list_tutorials(&self) -> Result<Vec<Tutorial>, GatewayError> {
        self.read("list_tutorials")?;
        let backend = self.lock();
        let viewer = backend.viewer().ok();
        Ok(backend
            .data
            .tutorials
            .iter()
            .filter(|t| visible_to(viewer.as_ref(), t))
            .cloned()
            .collect())
    }

    async fn list_requests(&self) -> Result<Vec<TutorialRequest>, GatewayError> {
        self.read("list_requests")?;
        Ok(self.lock().data.requests.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, GatewayError> {
        self.read("list_users")?;
        let backend = self.lock();
        backend.admin()?;
        Ok(backend.data.users.clone())
    }

    async fn list_problems(&self) -> Result<Vec<TutorialProblem>, GatewayError> {
        self.read("list_problems")?;
        let backend = self.lock();
        let viewer = backend.viewer().ok();
        Ok(backend
            .data
            .problems
            .iter()
            .filter(|p| {
                backend
                    .data
                    .tutorials
                    .iter()
                    .any(|t| t.id == p.tutorial_id && visible_to(viewer.as_ref(), t))
            })
            .cloned()
            .collect())
    }

    async fn list_admin_logs(&self) -> Result<Vec<AdminLog>, GatewayError> {
        self.read("list_admin_logs")?;
        let backend = self.lock();
        backend.admin()?;
        Ok(backend.data.admin_logs.clone())
    }

    async fn insert_tutorial(
        &self,
        request: &CreateTutorialRequest,
    ) -> Result<Tutorial, GatewayError> {
        self.write("insert_tutorial").await?;
        let mut backend = self.lock();
        let author = backend.active_viewer()?;
        let tutorial = Tutorial {
            id: Uuid::new_v4().to_string(),
            title: request.title.clone(),
            description: request.description.clone(),
            steps: request.steps.clone(),
            approved: author.is_admin(),
            author_id: author.id,
            author_name: author.name,
            category: request.category,
            created_at: now(),
            upvotes: 0,
            comments: Vec::new(),
        };
        backend.data.tutorials.insert(0, tutorial.clone());
        Ok(tutorial)
    }

    async fn insert_request(
        &self,
        request: &CreateRequestRequest,
    ) -> Result<TutorialRequest, GatewayError> {
        self.write("insert_request").await?;
        let mut backend = self.lock();
        let author = backend.active_viewer()?;
        let created = TutorialRequest {
            id: Uuid::new_v4().to_string(),
            user_id: author.id,
            user_name: author.name,
            title: request.title.clone(),
            description: request.description.clone(),
            category: request.category,
            created_at: now(),
            upvotes: 0,
            upvoted_by: Vec::new(),
            answered: false,
            answered_tutorial_id: None,
        };
        backend.data.requests.insert(0, created.clone());
        Ok(created)
    }

    async fn insert_problem(
        &self,
        request: &ReportProblemRequest,
    ) -> Result<TutorialProblem, GatewayError> {
        self.write("insert_problem").await?;
        let mut backend = self.lock();
        let reporter = backend.active_viewer()?;
        let problem = TutorialProblem {
            id: Uuid::new_v4().to_string(),
            tutorial_id: request.tutorial_id.clone(),
            user_id: reporter.id,
            user_name: reporter.name,
            step_number: request.step_number,
            description: request.description.clone(),
            created_at: now(),
            resolved: false,
        };
        backend.data.problems.push(problem.clone());
        Ok(problem)
    }

    async fn insert_comment(
        &self,
        tutorial_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, GatewayError> {
        self.write("insert_comment").await?;
        let mut backend = self.lock();
        let author = backend.active_viewer()?;
        let comment = Comment {
            id: Uuid::new_v4().to_string(),
            tutorial_id: tutorial_id.to_string(),
            user_id: author.id,
            user_name: author.name,
            content: request.content.clone(),
            created_at: now(),
        };
        let tutorial = backend
            .data
            .tutorials
            .iter_mut()
            .find(|t| t.id == tutorial_id)
            .ok_or_else(|| fail(404, codes::NOT_FOUND, "Tutorial not found"))?;
        tutorial.comments.push(comment.clone());
        Ok(comment)
    }

    async fn insert_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError> {
        self.write("insert_saved_link").await?;
        let mut backend = self.lock();
        let viewer = backend.viewer()?;
        if !backend.data.tutorials.iter().any(|t| t.id == tutorial_id) {
            return Err(fail(404, codes::NOT_FOUND, "Tutorial not found"));
        }
        let saved = backend.saved.entry(viewer.id).or_default();
        saved.insert(tutorial_id.to_string());
        Ok(saved.clone())
    }

    async fn delete_saved_link(&self, tutorial_id: &str) -> Result<BTreeSet<String>, GatewayError> {
        self.write("delete_saved_link").await?;
        let mut backend = self.lock();
        let viewer = backend.viewer()?;
        let saved = backend.saved.entry(viewer.id).or_default();
        saved.remove(tutorial_id);
        Ok(saved.clone())
    }

    async fn upvote_tutorial(&self, tutorial_id: &str) -> Result<Tutorial, GatewayError> {
        self.write("upvote_tutorial").await?;
        let mut backend = self.lock();
        backend.active_viewer()?;
        let tutorial = backend
            .data
            .tutorials
            .iter_mut()
            .find(|t| t.id == tutorial_id && t.approved)
            .ok_or_else(|| fail(404, codes::NOT_FOUND, "Tutorial not found"))?;
        tutorial.upvotes += 1;
        Ok(tutorial.clone())
    }

    async fn toggle_request_upvote(
        &self,
        request_id: &str,
    ) -> Result<TutorialRequest, GatewayError> {
        self.write("toggle_request_upvote").await?;
        let mut backend = self.lock();
        let voter = backend.active_viewer()?;
        let request = backend
            .data
            .requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or_else(|| fail(404, codes::NOT_FOUND, "Request not found"))?;
        request.toggle_upvote(&voter.id);
        Ok(request.clone())
    }

    async fn moderate(&self, command: &ModerationCommand) -> Result<AdminLog, GatewayError> {
        self.write("moderate").await?;
        let mut backend = self.lock();
        let admin = backend.admin()?;
        check_precondition(&backend.data, &admin.id, command).map_err(refusal)?;

        let log = AdminLog {
            id: Uuid::new_v4().to_string(),
            admin_id: admin.id,
            admin_name: admin.name,
            action: command.action_label().to_string(),
            target_type: command.target_type(),
            target_id: command.target_id().to_string(),
            target_name: truncate_target_name(
                &target_text(&backend.data, command).unwrap_or_default(),
            ),
            created_at: now(),
        };
        apply_command(&mut backend.data, command);
        if let ModerationCommand::DeleteTutorial { tutorial_id } = command {
            for saved in backend.saved.values_mut() {
                saved.remove(tutorial_id);
            }
        }
        backend.data.admin_logs.insert(0, log.clone());
        Ok(log)
    }

    async fn clear_admin_logs(&self) -> Result<u64, GatewayError> {
        self.write("clear_admin_logs").await?;
        let mut backend = self.lock();
        backend.admin()?;
        let removed = backend.data.admin_logs.len() as u64;
        backend.data.admin_logs.clear();
        Ok(removed)
    }
}
