//! Client state store.
//!
//! One process-wide view of the backend: tutorials, problems, requests, users
//! and the audit log, plus the theme flag. Views read projections; every
//! change goes through a typed command on [`ClientStore`] (this module, plus
//! [`crate::moderation`] and [`crate::optimistic`]).
//!
//! Mutations hold a read guard on the sync gate across their remote call and
//! [`ClientStore::refresh_data`] takes the write guard, so a refresh never
//! interleaves with an in-flight mutation.

#[cfg(test)]
pub(crate) mod fake;

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};

use crate::errors::{AuthError, GatewayError, StoreError};
use crate::gateway::Gateway;
use crate::models::{
    AdminLog, Comment, CreateCommentRequest, CreateRequestRequest, CreateTutorialRequest,
    ReportProblemRequest, Tutorial, TutorialProblem, TutorialRequest, User,
};
use crate::optimistic::Inflight;
use crate::session::Session;
use crate::validation::{validate_comment, validate_problem, validate_request, validate_tutorial};

const NOTICE_CAPACITY: usize = 64;

/// User-facing notification produced by a store command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
    /// The command needs a signed-in user.
    AuthRequired,
}

/// Everything the store holds, as one cloneable value.
#[derive(Debug, Clone)]
pub struct StoreState {
    pub tutorials: Vec<Tutorial>,
    pub problems: Vec<TutorialProblem>,
    pub requests: Vec<TutorialRequest>,
    /// Populated for administrators only.
    pub users: Vec<User>,
    /// Newest first. Populated for administrators only.
    pub admin_logs: Vec<AdminLog>,
    pub dark_mode: bool,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tutorials: Vec::new(),
            problems: Vec::new(),
            requests: Vec::new(),
            users: Vec::new(),
            admin_logs: Vec::new(),
            dark_mode: true,
        }
    }
}

pub struct ClientStore {
    pub(crate) gateway: Arc<dyn Gateway>,
    pub(crate) session: Session,
    pub(crate) state: RwLock<StoreState>,
    pub(crate) notices: broadcast::Sender<Notice>,
    pub(crate) sync_gate: RwLock<()>,
    pub(crate) inflight: Mutex<Inflight>,
}

impl ClientStore {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            session: Session::new(gateway.clone()),
            gateway,
            state: RwLock::new(StoreState::default()),
            notices,
            sync_gate: RwLock::new(()),
            inflight: Mutex::new(Inflight::default()),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_user(&self) -> Option<User> {
        self.session.current_user()
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.notices.subscribe()
    }

    // ==================== PROJECTIONS ====================

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub async fn tutorials(&self) -> Vec<Tutorial> {
        self.state.read().await.tutorials.clone()
    }

    pub async fn tutorial(&self, id: &str) -> Option<Tutorial> {
        self.state
            .read()
            .await
            .tutorials
            .iter()
            .find(|t| t.id == id)
            .cloned()
    }

    pub async fn problems(&self) -> Vec<TutorialProblem> {
        self.state.read().await.problems.clone()
    }

    pub async fn requests(&self) -> Vec<TutorialRequest> {
        self.state.read().await.requests.clone()
    }

    pub async fn users(&self) -> Vec<User> {
        self.state.read().await.users.clone()
    }

    pub async fn admin_logs(&self) -> Vec<AdminLog> {
        self.state.read().await.admin_logs.clone()
    }

    pub async fn dark_mode(&self) -> bool {
        self.state.read().await.dark_mode
    }

    pub async fn set_dark_mode(&self, enabled: bool) {
        self.state.write().await.dark_mode = enabled;
    }

    // ==================== SESSION ====================

    /// Sign in and load the signed-in view of the backend.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        self.session.sign_in(email, password).await?;
        if let Err(e) = self.refresh_data().await {
            tracing::warn!("Refresh after sign-in failed: {}", e);
        }
        Ok(())
    }

    /// Sign out and drop everything only an administrator may see.
    pub async fn logout(&self) {
        self.session.logout().await;
        self.inflight.lock().await.invalidate_all();

        let mut state = self.state.write().await;
        state.users.clear();
        state.admin_logs.clear();
    }

    /// Re-fetch every collection and replace them wholesale.
    ///
    /// The fetches run concurrently; the replacement is all-or-nothing, so a
    /// failed fetch leaves the previous state in place.
    pub async fn refresh_data(&self) -> Result<(), StoreError> {
        let _gate = self.sync_gate.write().await;

        let signed_in = self.session.current_user().is_some();
        let is_admin = self.session.is_admin();
        let gateway = &self.gateway;

        let (tutorials, requests, problems, users, admin_logs, profile) = tokio::join!(
            gateway.list_tutorials(),
            gateway.list_requests(),
            gateway.list_problems(),
            async {
                if is_admin {
                    gateway.list_users().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if is_admin {
                    gateway.list_admin_logs().await
                } else {
                    Ok(Vec::new())
                }
            },
            async {
                if signed_in {
                    gateway.current_profile().await.map(Some)
                } else {
                    Ok(None)
                }
            },
        );

        let (tutorials, requests, problems, users, admin_logs, profile) =
            match (tutorials, requests, problems, users, admin_logs, profile) {
                (Ok(t), Ok(r), Ok(p), Ok(u), Ok(l), Ok(me)) => (t, r, p, u, l, me),
                (t, r, p, u, l, me) => {
                    let err = t
                        .err()
                        .or(r.err())
                        .or(p.err())
                        .or(u.err())
                        .or(l.err())
                        .or(me.err())
                        .unwrap_or_else(|| GatewayError::transport("refresh failed"));
                    return self.reject(StoreError::Gateway(err));
                }
            };

        {
            let mut state = self.state.write().await;
            state.tutorials = tutorials;
            state.requests = requests;
            state.problems = problems;
            state.users = users;
            state.admin_logs = admin_logs;
        }
        if let Some(profile) = profile {
            self.session.set_user(Some(profile));
        }
        self.inflight.lock().await.invalidate_all();

        tracing::debug!("Store refreshed");
        Ok(())
    }

    // ==================== CONTENT COMMANDS ====================

    /// Submit a tutorial. It is listed at once; non-admin submissions stay
    /// pending until approved.
    pub async fn create_tutorial(
        &self,
        request: CreateTutorialRequest,
    ) -> Result<Tutorial, StoreError> {
        self.require_signed_in()?;
        let request = validate_tutorial(request).or_else(|e| self.reject(e.into()))?;

        let _gate = self.sync_gate.read().await;
        let tutorial = match self.gateway.insert_tutorial(&request).await {
            Ok(tutorial) => tutorial,
            Err(e) => return self.reject(e.into()),
        };

        self.state.write().await.tutorials.insert(0, tutorial.clone());
        self.notify(Notice::Success(if tutorial.approved {
            "Tutorial publicado!".to_string()
        } else {
            "Tutorial enviado para aprovação!".to_string()
        }));
        Ok(tutorial)
    }

    pub async fn create_request(
        &self,
        request: CreateRequestRequest,
    ) -> Result<TutorialRequest, StoreError> {
        self.require_signed_in()?;
        let request = validate_request(request).or_else(|e| self.reject(e.into()))?;

        let _gate = self.sync_gate.read().await;
        let created = match self.gateway.insert_request(&request).await {
            Ok(created) => created,
            Err(e) => return self.reject(e.into()),
        };

        self.state.write().await.requests.insert(0, created.clone());
        self.notify(Notice::Success("Requisição criada!".to_string()));
        Ok(created)
    }

    /// Report a problem. The step number is checked against the tutorial held
    /// in the store.
    pub async fn report_problem(
        &self,
        request: ReportProblemRequest,
    ) -> Result<TutorialProblem, StoreError> {
        self.require_signed_in()?;
        let steps = match self.tutorial(&request.tutorial_id).await {
            Some(tutorial) => tutorial.steps.len(),
            None => {
                return self.reject(StoreError::NotFound(format!(
                    "tutorial {}",
                    request.tutorial_id
                )))
            }
        };
        let request = validate_problem(request, steps).or_else(|e| self.reject(e.into()))?;

        let _gate = self.sync_gate.read().await;
        let problem = match self.gateway.insert_problem(&request).await {
            Ok(problem) => problem,
            Err(e) => return self.reject(e.into()),
        };

        self.state.write().await.problems.push(problem.clone());
        self.notify(Notice::Success("Problema reportado!".to_string()));
        Ok(problem)
    }

    pub async fn add_comment(
        &self,
        tutorial_id: &str,
        request: CreateCommentRequest,
    ) -> Result<Comment, StoreError> {
        self.require_signed_in()?;
        let request = validate_comment(request).or_else(|e| self.reject(e.into()))?;

        let _gate = self.sync_gate.read().await;
        let comment = match self.gateway.insert_comment(tutorial_id, &request).await {
            Ok(comment) => comment,
            Err(e) => return self.reject(e.into()),
        };

        let mut state = self.state.write().await;
        if let Some(tutorial) = state.tutorials.iter_mut().find(|t| t.id == tutorial_id) {
            tutorial.comments.push(comment.clone());
        }
        Ok(comment)
    }

    // ==================== HELPERS ====================

    pub(crate) fn notify(&self, notice: Notice) {
        // No subscribers is fine.
        let _ = self.notices.send(notice);
    }

    /// Surface a failure as a notice and return it.
    pub(crate) fn reject<T>(&self, err: StoreError) -> Result<T, StoreError> {
        match &err {
            StoreError::AuthRequired => self.notify(Notice::AuthRequired),
            other => self.notify(Notice::Error(other.to_string())),
        }
        Err(err)
    }

    pub(crate) fn require_signed_in(&self) -> Result<User, StoreError> {
        match self.session.current_user() {
            Some(user) => Ok(user),
            None => self.reject(StoreError::AuthRequired),
        }
    }
}
