//! Moderation workflow on the client store.
//!
//! Each command checks the signed-in role and the target's local state, asks
//! the backend to apply it (the backend re-checks both and writes the audit
//! entry in the same transaction), then mirrors the change locally and
//! prepends the returned entry. A failed remote call leaves the store as it
//! was.

use crate::errors::StoreError;
use crate::models::{AdminLog, ModerationCommand, Role, Tutorial, TutorialProblem, User};
use crate::store::{ClientStore, Notice, StoreState};

fn precondition(message: &str) -> Result<(), StoreError> {
    Err(StoreError::Precondition(message.to_string()))
}

fn missing(what: &str, id: &str) -> StoreError {
    StoreError::NotFound(format!("{} {}", what, id))
}

fn tutorial<'a>(state: &'a StoreState, id: &str) -> Result<&'a Tutorial, StoreError> {
    state
        .tutorials
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| missing("tutorial", id))
}

fn user<'a>(state: &'a StoreState, id: &str) -> Result<&'a User, StoreError> {
    state
        .users
        .iter()
        .find(|u| u.id == id)
        .ok_or_else(|| missing("user", id))
}

fn problem<'a>(state: &'a StoreState, id: &str) -> Result<&'a TutorialProblem, StoreError> {
    state
        .problems
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| missing("problem", id))
}

/// Check that `command` is a legal transition for the state the store holds.
pub fn check_precondition(
    state: &StoreState,
    admin_id: &str,
    command: &ModerationCommand,
) -> Result<(), StoreError> {
    match command {
        ModerationCommand::ApproveTutorial { tutorial_id } => {
            if tutorial(state, tutorial_id)?.approved {
                return precondition("tutorial is already approved");
            }
        }
        ModerationCommand::DeleteTutorial { tutorial_id } => {
            tutorial(state, tutorial_id)?;
        }
        ModerationCommand::DeleteComment {
            tutorial_id,
            comment_id,
        } => {
            if !tutorial(state, tutorial_id)?
                .comments
                .iter()
                .any(|c| &c.id == comment_id)
            {
                return Err(missing("comment", comment_id));
            }
        }
        ModerationCommand::BanUser { user_id } => {
            if user_id == admin_id {
                return precondition("administrators cannot ban themselves");
            }
            if user(state, user_id)?.banned {
                return precondition("user is already banned");
            }
        }
        ModerationCommand::UnbanUser { user_id } => {
            if !user(state, user_id)?.banned {
                return precondition("user is not banned");
            }
        }
        ModerationCommand::PromoteToAdmin { user_id } => {
            if user(state, user_id)?.role != Role::User {
                return precondition("user is already an administrator");
            }
        }
        ModerationCommand::DemoteFromAdmin { user_id } => {
            if user_id == admin_id {
                return precondition("administrators cannot demote themselves");
            }
            if user(state, user_id)?.role != Role::Admin {
                return precondition("user is not an administrator");
            }
        }
        ModerationCommand::ResolveProblem { problem_id } => {
            if problem(state, problem_id)?.resolved {
                return precondition("problem is already resolved");
            }
        }
        ModerationCommand::DeleteProblem { problem_id } => {
            problem(state, problem_id)?;
        }
        ModerationCommand::DeleteRequest { request_id } => {
            if !state.requests.iter().any(|r| &r.id == request_id) {
                return Err(missing("request", request_id));
            }
        }
    }
    Ok(())
}

/// Descriptive text of the command's target, as snapshotted in the audit log.
pub fn target_text(state: &StoreState, command: &ModerationCommand) -> Option<String> {
    match command {
        ModerationCommand::ApproveTutorial { tutorial_id }
        | ModerationCommand::DeleteTutorial { tutorial_id } => state
            .tutorials
            .iter()
            .find(|t| &t.id == tutorial_id)
            .map(|t| t.title.clone()),
        ModerationCommand::DeleteComment {
            tutorial_id,
            comment_id,
        } => state
            .tutorials
            .iter()
            .find(|t| &t.id == tutorial_id)
            .and_then(|t| t.comments.iter().find(|c| &c.id == comment_id))
            .map(|c| c.content.clone()),
        ModerationCommand::BanUser { user_id }
        | ModerationCommand::UnbanUser { user_id }
        | ModerationCommand::PromoteToAdmin { user_id }
        | ModerationCommand::DemoteFromAdmin { user_id } => state
            .users
            .iter()
            .find(|u| &u.id == user_id)
            .map(|u| u.name.clone()),
        ModerationCommand::ResolveProblem { problem_id }
        | ModerationCommand::DeleteProblem { problem_id } => state
            .problems
            .iter()
            .find(|p| &p.id == problem_id)
            .map(|p| p.description.clone()),
        ModerationCommand::DeleteRequest { request_id } => state
            .requests
            .iter()
            .find(|r| &r.id == request_id)
            .map(|r| r.title.clone()),
    }
}

/// Mirror a moderation command onto the collections.
pub fn apply_command(state: &mut StoreState, command: &ModerationCommand) {
    match command {
        ModerationCommand::ApproveTutorial { tutorial_id } => {
            for tutorial in state.tutorials.iter_mut().filter(|t| &t.id == tutorial_id) {
                tutorial.approved = true;
            }
        }
        ModerationCommand::DeleteTutorial { tutorial_id } => {
            state.tutorials.retain(|t| &t.id != tutorial_id);
            state.problems.retain(|p| &p.tutorial_id != tutorial_id);
        }
        ModerationCommand::DeleteComment {
            tutorial_id,
            comment_id,
        } => {
            for tutorial in state.tutorials.iter_mut().filter(|t| &t.id == tutorial_id) {
                tutorial.comments.retain(|c| &c.id != comment_id);
            }
        }
        ModerationCommand::BanUser { user_id } => set_user(state, user_id, |u| u.banned = true),
        ModerationCommand::UnbanUser { user_id } => set_user(state, user_id, |u| u.banned = false),
        ModerationCommand::PromoteToAdmin { user_id } => {
            set_user(state, user_id, |u| u.role = Role::Admin)
        }
        ModerationCommand::DemoteFromAdmin { user_id } => {
            set_user(state, user_id, |u| u.role = Role::User)
        }
        ModerationCommand::ResolveProblem { problem_id } => {
            for problem in state.problems.iter_mut().filter(|p| &p.id == problem_id) {
                problem.resolved = true;
            }
        }
        ModerationCommand::DeleteProblem { problem_id } => {
            state.problems.retain(|p| &p.id != problem_id);
        }
        ModerationCommand::DeleteRequest { request_id } => {
            state.requests.retain(|r| &r.id != request_id);
        }
    }
}

fn set_user(state: &mut StoreState, user_id: &str, edit: impl Fn(&mut User)) {
    for user in state.users.iter_mut().filter(|u| u.id == user_id) {
        edit(user);
    }
}

impl ClientStore {
    /// Run one moderation command end to end.
    pub async fn moderate(&self, command: ModerationCommand) -> Result<AdminLog, StoreError> {
        let admin = self.require_signed_in()?;
        if !admin.is_admin() {
            return self.reject(StoreError::Forbidden);
        }

        let _gate = self.sync_gate.read().await;
        {
            let state = self.state.read().await;
            if let Err(e) = check_precondition(&state, &admin.id, &command) {
                drop(state);
                return self.reject(e);
            }
        }

        let log = match self.gateway.moderate(&command).await {
            Ok(log) => log,
            Err(e) => {
                tracing::warn!(action = command.action_label(), "Moderation failed: {}", e);
                return self.reject(e.into());
            }
        };

        {
            let mut state = self.state.write().await;
            apply_command(&mut state, &command);
            state.admin_logs.insert(0, log.clone());
        }
        if let ModerationCommand::DeleteTutorial { tutorial_id } = &command {
            self.session.modify_user(|u| {
                u.saved_tutorials.remove(tutorial_id);
            });
        }

        self.notify(Notice::Success(format!("{}: {}", log.action, log.target_name)));
        Ok(log)
    }

    pub async fn approve_tutorial(&self, tutorial_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::ApproveTutorial {
            tutorial_id: tutorial_id.to_string(),
        })
        .await
    }

    pub async fn delete_tutorial(&self, tutorial_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::DeleteTutorial {
            tutorial_id: tutorial_id.to_string(),
        })
        .await
    }

    pub async fn delete_comment(
        &self,
        tutorial_id: &str,
        comment_id: &str,
    ) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::DeleteComment {
            tutorial_id: tutorial_id.to_string(),
            comment_id: comment_id.to_string(),
        })
        .await
    }

    pub async fn ban_user(&self, user_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::BanUser {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn unban_user(&self, user_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::UnbanUser {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn promote_to_admin(&self, user_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::PromoteToAdmin {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn demote_from_admin(&self, user_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::DemoteFromAdmin {
            user_id: user_id.to_string(),
        })
        .await
    }

    pub async fn resolve_problem(&self, problem_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::ResolveProblem {
            problem_id: problem_id.to_string(),
        })
        .await
    }

    pub async fn delete_problem(&self, problem_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::DeleteProblem {
            problem_id: problem_id.to_string(),
        })
        .await
    }

    pub async fn delete_request(&self, request_id: &str) -> Result<AdminLog, StoreError> {
        self.moderate(ModerationCommand::DeleteRequest {
            request_id: request_id.to_string(),
        })
        .await
    }

    /// Bulk-clear the audit log.
    pub async fn clear_admin_logs(&self) -> Result<u64, StoreError> {
        let admin = self.require_signed_in()?;
        if !admin.is_admin() {
            return self.reject(StoreError::Forbidden);
        }

        let _gate = self.sync_gate.read().await;
        let removed = match self.gateway.clear_admin_logs().await {
            Ok(removed) => removed,
            Err(e) => return self.reject(e.into()),
        };

        self.state.write().await.admin_logs.clear();
        self.notify(Notice::Success("Logs limpos.".to_string()));
        Ok(removed)
    }
}
