//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity. The
//! operations are split by concern across `identity`, `content` and
//! `moderation`; this file holds the shared plumbing and row conversion.

use std::collections::BTreeSet;

use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    AdminLog, Category, Comment, RevisionInfo, Role, TargetType, Tutorial, TutorialProblem,
    TutorialRequest, User,
};

/// Display name used when a row's author profile is gone.
pub const UNKNOWN_AUTHOR: &str = "Usuário";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pub(super) pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the current revision ID.
    pub async fn get_revision_id(&self) -> Result<i64, AppError> {
        let row = sqlx::query("SELECT revision_id FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("revision_id"))
    }

    /// Get revision info.
    pub async fn get_revision_info(&self) -> Result<RevisionInfo, AppError> {
        let row = sqlx::query("SELECT revision_id, generated_at FROM meta WHERE id = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(RevisionInfo {
            revision_id: row.get("revision_id"),
            generated_at: row.get("generated_at"),
        })
    }

    /// Increment the revision ID and return the new value.
    pub async fn increment_revision(&self) -> Result<i64, AppError> {
        bump_revision(&self.pool).await?;
        self.get_revision_id().await
    }
}

/// Bump the revision inside whatever executor the caller is using.
pub(super) async fn bump_revision<'e, E>(executor: E) -> Result<(), AppError>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query("UPDATE meta SET revision_id = revision_id + 1, generated_at = ? WHERE id = 1")
        .bind(now())
        .execute(executor)
        .await?;
    Ok(())
}

/// Fixed-width UTC timestamp, so lexical order matches time order.
pub(super) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(super) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// Helper functions for row conversion

pub(super) fn user_from_row(row: &SqliteRow) -> Result<User, AppError> {
    let banned: i32 = row.get("banned");
    let role: String = row.get("role");
    Ok(User {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        role: Role::parse(&role)
            .ok_or_else(|| AppError::Internal(format!("Unknown role {}", role)))?,
        created_at: row.get("created_at"),
        banned: banned != 0,
        saved_tutorials: BTreeSet::new(),
    })
}

pub(super) fn tutorial_from_row(row: &SqliteRow) -> Result<Tutorial, AppError> {
    let approved: i32 = row.get("approved");
    let steps: String = row.get("steps");
    Ok(Tutorial {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        steps: parse_json_array(&steps),
        author_id: row.get("author_id"),
        author_name: row.get("author_name"),
        category: parse_category(row)?,
        created_at: row.get("created_at"),
        approved: approved != 0,
        upvotes: row.get("upvotes"),
        comments: Vec::new(),
    })
}

pub(super) fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        tutorial_id: row.get("tutorial_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        content: row.get("content"),
        created_at: row.get("created_at"),
    }
}

pub(super) fn problem_from_row(row: &SqliteRow) -> TutorialProblem {
    let resolved: i32 = row.get("resolved");
    TutorialProblem {
        id: row.get("id"),
        tutorial_id: row.get("tutorial_id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        step_number: row.get("step_number"),
        description: row.get("description"),
        created_at: row.get("created_at"),
        resolved: resolved != 0,
    }
}

pub(super) fn request_from_row(row: &SqliteRow) -> Result<TutorialRequest, AppError> {
    let answered: i32 = row.get("answered");
    let upvoted_by: String = row.get("upvoted_by");
    Ok(TutorialRequest {
        id: row.get("id"),
        user_id: row.get("user_id"),
        user_name: row.get("user_name"),
        title: row.get("title"),
        description: row.get("description"),
        category: parse_category(row)?,
        created_at: row.get("created_at"),
        upvotes: row.get("upvotes"),
        upvoted_by: parse_json_array(&upvoted_by),
        answered: answered != 0,
        answered_tutorial_id: row.get("answered_tutorial_id"),
    })
}

pub(super) fn admin_log_from_row(row: &SqliteRow) -> Result<AdminLog, AppError> {
    let target_type: String = row.get("target_type");
    Ok(AdminLog {
        id: row.get("id"),
        admin_id: row.get("admin_id"),
        admin_name: row.get("admin_name"),
        action: row.get("action"),
        target_type: TargetType::parse(&target_type)
            .ok_or_else(|| AppError::Internal(format!("Unknown target type {}", target_type)))?,
        target_id: row.get("target_id"),
        target_name: row.get("target_name"),
        created_at: row.get("created_at"),
    })
}

fn parse_category(row: &SqliteRow) -> Result<Category, AppError> {
    let category: String = row.get("category");
    Category::parse(&category)
        .ok_or_else(|| AppError::Internal(format!("Unknown category {}", category)))
}

pub(super) fn parse_json_array(s: &str) -> Vec<String> {
    serde_json::from_str(s).unwrap_or_default()
}
