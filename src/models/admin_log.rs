//! Moderation commands and the append-only audit log.

use serde::{Deserialize, Serialize};

/// Maximum number of characters kept from a target's descriptive text.
pub const TARGET_NAME_LIMIT: usize = 50;

/// Kind of entity a moderation action touched.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Tutorial,
    Comment,
    User,
    Problem,
    Request,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::Tutorial => "tutorial",
            TargetType::Comment => "comment",
            TargetType::User => "user",
            TargetType::Problem => "problem",
            TargetType::Request => "request",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tutorial" => Some(TargetType::Tutorial),
            "comment" => Some(TargetType::Comment),
            "user" => Some(TargetType::User),
            "problem" => Some(TargetType::Problem),
            "request" => Some(TargetType::Request),
            _ => None,
        }
    }
}

/// One audit entry, written once per successful moderation action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdminLog {
    pub id: String,
    pub admin_id: String,
    pub admin_name: String,
    pub action: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub target_name: String,
    pub created_at: String,
}

/// Every state transition an administrator can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModerationCommand {
    ApproveTutorial { tutorial_id: String },
    DeleteTutorial { tutorial_id: String },
    DeleteComment { tutorial_id: String, comment_id: String },
    BanUser { user_id: String },
    UnbanUser { user_id: String },
    PromoteToAdmin { user_id: String },
    DemoteFromAdmin { user_id: String },
    ResolveProblem { problem_id: String },
    DeleteProblem { problem_id: String },
    DeleteRequest { request_id: String },
}

impl ModerationCommand {
    /// Verb phrase recorded in the audit log.
    pub fn action_label(&self) -> &'static str {
        match self {
            ModerationCommand::ApproveTutorial { .. } => "Aprovou tutorial",
            ModerationCommand::DeleteTutorial { .. } => "Excluiu tutorial",
            ModerationCommand::DeleteComment { .. } => "Excluiu comentário",
            ModerationCommand::BanUser { .. } => "Baniu usuário",
            ModerationCommand::UnbanUser { .. } => "Desbaniu usuário",
            ModerationCommand::PromoteToAdmin { .. } => "Promoveu a admin",
            ModerationCommand::DemoteFromAdmin { .. } => "Rebaixou de admin",
            ModerationCommand::ResolveProblem { .. } => "Marcou problema como resolvido",
            ModerationCommand::DeleteProblem { .. } => "Excluiu problema",
            ModerationCommand::DeleteRequest { .. } => "Excluiu requisição",
        }
    }

    pub fn target_type(&self) -> TargetType {
        match self {
            ModerationCommand::ApproveTutorial { .. } | ModerationCommand::DeleteTutorial { .. } => {
                TargetType::Tutorial
            }
            ModerationCommand::DeleteComment { .. } => TargetType::Comment,
            ModerationCommand::BanUser { .. }
            | ModerationCommand::UnbanUser { .. }
            | ModerationCommand::PromoteToAdmin { .. }
            | ModerationCommand::DemoteFromAdmin { .. } => TargetType::User,
            ModerationCommand::ResolveProblem { .. } | ModerationCommand::DeleteProblem { .. } => {
                TargetType::Problem
            }
            ModerationCommand::DeleteRequest { .. } => TargetType::Request,
        }
    }

    pub fn target_id(&self) -> &str {
        match self {
            ModerationCommand::ApproveTutorial { tutorial_id }
            | ModerationCommand::DeleteTutorial { tutorial_id } => tutorial_id,
            ModerationCommand::DeleteComment { comment_id, .. } => comment_id,
            ModerationCommand::BanUser { user_id }
            | ModerationCommand::UnbanUser { user_id }
            | ModerationCommand::PromoteToAdmin { user_id }
            | ModerationCommand::DemoteFromAdmin { user_id } => user_id,
            ModerationCommand::ResolveProblem { problem_id }
            | ModerationCommand::DeleteProblem { problem_id } => problem_id,
            ModerationCommand::DeleteRequest { request_id } => request_id,
        }
    }
}

/// Snapshot a target's descriptive text for the audit log.
///
/// Keeps at most [`TARGET_NAME_LIMIT`] characters and appends `...` only when
/// something was cut.
pub fn truncate_target_name(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(TARGET_NAME_LIMIT).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
