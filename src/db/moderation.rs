//! Administrator actions and the audit log.
//!
//! Every moderation command runs in one transaction that checks the target's
//! current state, applies the change and appends exactly one `admin_logs` row.
//! Either both land or neither does.

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::repository::{admin_log_from_row, bump_revision, new_id, now, Repository};
use crate::errors::AppError;
use crate::models::{truncate_target_name, Actor, AdminLog, ModerationCommand, Role};

async fn fetch_target(
    conn: &mut SqliteConnection,
    sql: &str,
    id: &str,
    kind: &str,
) -> Result<SqliteRow, AppError> {
    sqlx::query(sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, id)))
}

async fn execute(conn: &mut SqliteConnection, sql: &str, id: &str) -> Result<(), AppError> {
    sqlx::query(sql).bind(id).execute(&mut *conn).await?;
    Ok(())
}

/// Check a user target and return its display name.
async fn user_target(
    conn: &mut SqliteConnection,
    admin: &Actor,
    command: &ModerationCommand,
    user_id: &str,
) -> Result<String, AppError> {
    let row = fetch_target(
        conn,
        "SELECT name, role, banned FROM profiles WHERE id = ?",
        user_id,
        "User",
    )
    .await?;
    let name: String = row.get("name");
    let role: String = row.get("role");
    let banned = row.get::<i32, _>("banned") != 0;
    let is_admin = Role::parse(&role) == Some(Role::Admin);
    let is_self = user_id == admin.user_id;

    let (sql, violation) = match command {
        ModerationCommand::BanUser { .. } if is_self => {
            ("", Some("Administrators cannot ban themselves"))
        }
        ModerationCommand::BanUser { .. } => (
            "UPDATE profiles SET banned = 1 WHERE id = ?",
            banned.then_some("User is already banned"),
        ),
        ModerationCommand::UnbanUser { .. } => (
            "UPDATE profiles SET banned = 0 WHERE id = ?",
            (!banned).then_some("User is not banned"),
        ),
        ModerationCommand::PromoteToAdmin { .. } => (
            "UPDATE profiles SET role = 'ADMIN' WHERE id = ?",
            is_admin.then_some("User is already an administrator"),
        ),
        ModerationCommand::DemoteFromAdmin { .. } if is_self => {
            ("", Some("Administrators cannot demote themselves"))
        }
        ModerationCommand::DemoteFromAdmin { .. } => (
            "UPDATE profiles SET role = 'USER' WHERE id = ?",
            (!is_admin).then_some("User is not an administrator"),
        ),
        _ => return Err(AppError::Internal("Not a user command".to_string())),
    };

    if let Some(message) = violation {
        return Err(AppError::Conflict(message.to_string()));
    }
    execute(conn, sql, user_id).await?;
    Ok(name)
}

impl Repository {
    /// Apply one moderation command and record it in the audit log.
    pub async fn moderate(
        &self,
        admin: &Actor,
        command: &ModerationCommand,
    ) -> Result<AdminLog, AppError> {
        let mut tx = self.pool.begin().await?;

        let target_text = match command {
            ModerationCommand::ApproveTutorial { tutorial_id } => {
                let row = fetch_target(
                    &mut tx,
                    "SELECT title, approved FROM tutorials WHERE id = ?",
                    tutorial_id,
                    "Tutorial",
                )
                .await?;
                if row.get::<i32, _>("approved") != 0 {
                    return Err(AppError::Conflict(
                        "Tutorial is already approved".to_string(),
                    ));
                }
                execute(
                    &mut tx,
                    "UPDATE tutorials SET approved = 1 WHERE id = ?",
                    tutorial_id,
                )
                .await?;
                row.get::<String, _>("title")
            }
            ModerationCommand::DeleteTutorial { tutorial_id } => {
                let row = fetch_target(
                    &mut tx,
                    "SELECT title FROM tutorials WHERE id = ?",
                    tutorial_id,
                    "Tutorial",
                )
                .await?;
                execute(&mut tx, "DELETE FROM tutorials WHERE id = ?", tutorial_id).await?;
                row.get::<String, _>("title")
            }
            ModerationCommand::DeleteComment {
                tutorial_id,
                comment_id,
            } => {
                let row = sqlx::query(
                    "SELECT content FROM tutorial_comments WHERE id = ? AND tutorial_id = ?",
                )
                .bind(comment_id)
                .bind(tutorial_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "Comment {} not found on tutorial {}",
                        comment_id, tutorial_id
                    ))
                })?;
                execute(
                    &mut tx,
                    "DELETE FROM tutorial_comments WHERE id = ?",
                    comment_id,
                )
                .await?;
                row.get::<String, _>("content")
            }
            ModerationCommand::BanUser { user_id }
            | ModerationCommand::UnbanUser { user_id }
            | ModerationCommand::PromoteToAdmin { user_id }
            | ModerationCommand::DemoteFromAdmin { user_id } => {
                user_target(&mut tx, admin, command, user_id).await?
            }
            ModerationCommand::ResolveProblem { problem_id } => {
                let row = fetch_target(
                    &mut tx,
                    "SELECT description, resolved FROM tutorial_problems WHERE id = ?",
                    problem_id,
                    "Problem",
                )
                .await?;
                if row.get::<i32, _>("resolved") != 0 {
                    return Err(AppError::Conflict(
                        "Problem is already resolved".to_string(),
                    ));
                }
                execute(
                    &mut tx,
                    "UPDATE tutorial_problems SET resolved = 1 WHERE id = ?",
                    problem_id,
                )
                .await?;
                row.get::<String, _>("description")
            }
            ModerationCommand::DeleteProblem { problem_id } => {
                let row = fetch_target(
                    &mut tx,
                    "SELECT description FROM tutorial_problems WHERE id = ?",
                    problem_id,
                    "Problem",
                )
                .await?;
                execute(
                    &mut tx,
                    "DELETE FROM tutorial_problems WHERE id = ?",
                    problem_id,
                )
                .await?;
                row.get::<String, _>("description")
            }
            ModerationCommand::DeleteRequest { request_id } => {
                let row = fetch_target(
                    &mut tx,
                    "SELECT title FROM tutorial_requests WHERE id = ?",
                    request_id,
                    "Request",
                )
                .await?;
                execute(
                    &mut tx,
                    "DELETE FROM tutorial_requests WHERE id = ?",
                    request_id,
                )
                .await?;
                row.get::<String, _>("title")
            }
        };

        let log = AdminLog {
            id: new_id(),
            admin_id: admin.user_id.clone(),
            admin_name: admin.name.clone(),
            action: command.action_label().to_string(),
            target_type: command.target_type(),
            target_id: command.target_id().to_string(),
            target_name: truncate_target_name(&target_text),
            created_at: now(),
        };

        let seq: i64 = sqlx::query("SELECT COALESCE(MAX(seq), 0) + 1 AS next FROM admin_logs")
            .fetch_one(&mut *tx)
            .await?
            .get("next");

        sqlx::query(
            "INSERT INTO admin_logs (id, admin_id, admin_name, action, target_type, target_id, target_name, created_at, seq) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&log.id)
        .bind(&log.admin_id)
        .bind(&log.admin_name)
        .bind(&log.action)
        .bind(log.target_type.as_str())
        .bind(&log.target_id)
        .bind(&log.target_name)
        .bind(&log.created_at)
        .bind(seq)
        .execute(&mut *tx)
        .await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!(
            admin = %admin.user_id,
            action = %log.action,
            target = %log.target_id,
            "Moderation action applied"
        );
        Ok(log)
    }

    /// Audit log, newest entry first.
    pub async fn list_admin_logs(&self) -> Result<Vec<AdminLog>, AppError> {
        let rows = sqlx::query(
            "SELECT id, admin_id, admin_name, action, target_type, target_id, target_name, created_at FROM admin_logs ORDER BY seq DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(admin_log_from_row).collect()
    }

    /// Bulk-clear the audit log. Returns the number of entries removed.
    pub async fn clear_admin_logs(&self) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query("DELETE FROM admin_logs")
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut *tx).await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }
}
