//! Tutorials, comments, problem reports, requests and saved links.

use std::collections::{BTreeSet, HashMap};

use sqlx::Row;

use super::repository::{
    bump_revision, comment_from_row, new_id, now, problem_from_row, request_from_row,
    tutorial_from_row, Repository, UNKNOWN_AUTHOR,
};
use crate::errors::AppError;
use crate::models::{
    Actor, Comment, CreateCommentRequest, CreateRequestRequest, CreateTutorialRequest,
    ReportProblemRequest, Tutorial, TutorialProblem, TutorialRequest,
};
use crate::validation::validate_problem;

fn tutorial_select() -> String {
    format!(
        r#"SELECT t.id, t.title, t.description, t.steps, t.author_id,
                  COALESCE(p.name, '{}') AS author_name, t.category, t.created_at,
                  t.approved, t.upvotes
           FROM tutorials t LEFT JOIN profiles p ON p.id = t.author_id"#,
        UNKNOWN_AUTHOR
    )
}

fn request_select() -> String {
    format!(
        r#"SELECT r.id, r.user_id, COALESCE(p.name, '{}') AS user_name, r.title,
                  r.description, r.category, r.created_at, r.upvotes, r.upvoted_by,
                  r.answered, r.answered_tutorial_id
           FROM tutorial_requests r LEFT JOIN profiles p ON p.id = r.user_id"#,
        UNKNOWN_AUTHOR
    )
}

fn comment_select() -> String {
    format!(
        r#"SELECT c.id, c.tutorial_id, c.user_id, COALESCE(p.name, '{}') AS user_name,
                  c.content, c.created_at
           FROM tutorial_comments c LEFT JOIN profiles p ON p.id = c.user_id"#,
        UNKNOWN_AUTHOR
    )
}

/// Approved tutorials are public; pending ones are visible to their author
/// and to administrators.
fn visibility(viewer: Option<&Actor>) -> (i32, String) {
    match viewer {
        Some(actor) => (actor.is_admin() as i32, actor.user_id.clone()),
        None => (0, String::new()),
    }
}

impl Repository {
    // ==================== TUTORIAL OPERATIONS ====================

    /// List the tutorials `viewer` may see, newest first, comments attached.
    pub async fn list_tutorials(&self, viewer: Option<&Actor>) -> Result<Vec<Tutorial>, AppError> {
        let (is_admin, viewer_id) = visibility(viewer);
        let rows = sqlx::query(&format!(
            "{} WHERE t.approved = 1 OR ? = 1 OR t.author_id = ? ORDER BY t.created_at DESC, t.rowid DESC",
            tutorial_select()
        ))
        .bind(is_admin)
        .bind(&viewer_id)
        .fetch_all(&self.pool)
        .await?;

        let mut tutorials = rows
            .iter()
            .map(tutorial_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        let comment_rows = sqlx::query(&format!(
            "{} ORDER BY c.created_at, c.rowid",
            comment_select()
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut by_tutorial: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in &comment_rows {
            let comment = comment_from_row(row);
            by_tutorial
                .entry(comment.tutorial_id.clone())
                .or_default()
                .push(comment);
        }
        for tutorial in &mut tutorials {
            tutorial.comments = by_tutorial.remove(&tutorial.id).unwrap_or_default();
        }

        Ok(tutorials)
    }

    /// Get a tutorial by ID if `viewer` may see it.
    pub async fn get_tutorial(
        &self,
        viewer: Option<&Actor>,
        id: &str,
    ) -> Result<Option<Tutorial>, AppError> {
        let (is_admin, viewer_id) = visibility(viewer);
        let row = sqlx::query(&format!(
            "{} WHERE t.id = ? AND (t.approved = 1 OR ? = 1 OR t.author_id = ?)",
            tutorial_select()
        ))
        .bind(id)
        .bind(is_admin)
        .bind(&viewer_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut tutorial = tutorial_from_row(&row)?;

        let comment_rows = sqlx::query(&format!(
            "{} WHERE c.tutorial_id = ? ORDER BY c.created_at, c.rowid",
            comment_select()
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        tutorial.comments = comment_rows.iter().map(comment_from_row).collect();

        Ok(Some(tutorial))
    }

    /// Create a tutorial. Administrators publish directly; everyone else
    /// lands in the approval queue.
    pub async fn create_tutorial(
        &self,
        author: &Actor,
        request: &CreateTutorialRequest,
    ) -> Result<Tutorial, AppError> {
        let id = new_id();
        let created_at = now();
        let approved = author.is_admin();
        let steps_json = serde_json::to_string(&request.steps)?;

        sqlx::query(
            "INSERT INTO tutorials (id, title, description, steps, author_id, category, approved, upvotes, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?)"
        )
        .bind(&id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(&steps_json)
        .bind(&author.user_id)
        .bind(request.category.as_str())
        .bind(approved as i32)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Tutorial {
            id,
            title: request.title.clone(),
            description: request.description.clone(),
            steps: request.steps.clone(),
            author_id: author.user_id.clone(),
            author_name: author.name.clone(),
            category: request.category,
            created_at,
            approved,
            upvotes: 0,
            comments: Vec::new(),
        })
    }

    /// Add one vote to an approved tutorial.
    pub async fn upvote_tutorial(&self, voter: &Actor, id: &str) -> Result<Tutorial, AppError> {
        let result =
            sqlx::query("UPDATE tutorials SET upvotes = upvotes + 1 WHERE id = ? AND approved = 1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Tutorial {} not found", id)));
        }

        self.increment_revision().await?;
        self.get_tutorial(Some(voter), id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Tutorial {} not found", id)))
    }

    /// Comment on a tutorial the author can see.
    pub async fn add_comment(
        &self,
        author: &Actor,
        tutorial_id: &str,
        request: &CreateCommentRequest,
    ) -> Result<Comment, AppError> {
        if self.get_tutorial(Some(author), tutorial_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Tutorial {} not found",
                tutorial_id
            )));
        }

        let id = new_id();
        let created_at = now();

        sqlx::query(
            "INSERT INTO tutorial_comments (id, tutorial_id, user_id, content, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(tutorial_id)
        .bind(&author.user_id)
        .bind(&request.content)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(Comment {
            id,
            tutorial_id: tutorial_id.to_string(),
            user_id: author.user_id.clone(),
            user_name: author.name.clone(),
            content: request.content.clone(),
            created_at,
        })
    }

    // ==================== PROBLEM OPERATIONS ====================

    /// List problem reports on tutorials `viewer` may see, oldest first.
    pub async fn list_problems(
        &self,
        viewer: Option<&Actor>,
    ) -> Result<Vec<TutorialProblem>, AppError> {
        let (is_admin, viewer_id) = visibility(viewer);
        let rows = sqlx::query(&format!(
            r#"SELECT pr.id, pr.tutorial_id, pr.user_id, COALESCE(p.name, '{}') AS user_name,
                      pr.step_number, pr.description, pr.created_at, pr.resolved
               FROM tutorial_problems pr
               JOIN tutorials t ON t.id = pr.tutorial_id
               LEFT JOIN profiles p ON p.id = pr.user_id
               WHERE t.approved = 1 OR ? = 1 OR t.author_id = ?
               ORDER BY pr.created_at, pr.rowid"#,
            UNKNOWN_AUTHOR
        ))
        .bind(is_admin)
        .bind(&viewer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(problem_from_row).collect())
    }

    /// File a problem against a tutorial or one of its steps.
    pub async fn report_problem(
        &self,
        reporter: &Actor,
        request: ReportProblemRequest,
    ) -> Result<TutorialProblem, AppError> {
        let tutorial = self
            .get_tutorial(Some(reporter), &request.tutorial_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Tutorial {} not found", request.tutorial_id))
            })?;
        let request = validate_problem(request, tutorial.steps.len())?;

        let id = new_id();
        let created_at = now();

        sqlx::query(
            "INSERT INTO tutorial_problems (id, tutorial_id, user_id, step_number, description, resolved, created_at) VALUES (?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&id)
        .bind(&request.tutorial_id)
        .bind(&reporter.user_id)
        .bind(request.step_number)
        .bind(&request.description)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(TutorialProblem {
            id,
            tutorial_id: request.tutorial_id,
            user_id: reporter.user_id.clone(),
            user_name: reporter.name.clone(),
            step_number: request.step_number,
            description: request.description,
            created_at,
            resolved: false,
        })
    }

    // ==================== REQUEST OPERATIONS ====================

    /// List all tutorial requests, newest first.
    pub async fn list_requests(&self) -> Result<Vec<TutorialRequest>, AppError> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY r.created_at DESC, r.rowid DESC",
            request_select()
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    /// Create a tutorial request.
    pub async fn create_request(
        &self,
        author: &Actor,
        request: &CreateRequestRequest,
    ) -> Result<TutorialRequest, AppError> {
        let id = new_id();
        let created_at = now();

        sqlx::query(
            "INSERT INTO tutorial_requests (id, user_id, title, description, category, upvotes, upvoted_by, answered, created_at) VALUES (?, ?, ?, ?, ?, 0, '[]', 0, ?)"
        )
        .bind(&id)
        .bind(&author.user_id)
        .bind(&request.title)
        .bind(&request.description)
        .bind(request.category.as_str())
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(TutorialRequest {
            id,
            user_id: author.user_id.clone(),
            user_name: author.name.clone(),
            title: request.title.clone(),
            description: request.description.clone(),
            category: request.category,
            created_at,
            upvotes: 0,
            upvoted_by: Vec::new(),
            answered: false,
            answered_tutorial_id: None,
        })
    }

    /// Flip the voter's upvote, keeping the count equal to the voter set.
    pub async fn toggle_request_upvote(
        &self,
        voter: &Actor,
        id: &str,
    ) -> Result<TutorialRequest, AppError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!("{} WHERE r.id = ?", request_select()))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let mut request = row
            .as_ref()
            .map(request_from_row)
            .transpose()?
            .ok_or_else(|| AppError::NotFound(format!("Request {} not found", id)))?;

        request.toggle_upvote(&voter.user_id);
        let upvoted_by = serde_json::to_string(&request.upvoted_by)?;

        sqlx::query("UPDATE tutorial_requests SET upvotes = ?, upvoted_by = ? WHERE id = ?")
            .bind(request.upvotes)
            .bind(&upvoted_by)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        bump_revision(&mut *tx).await?;
        tx.commit().await?;

        Ok(request)
    }

    // ==================== SAVED TUTORIALS ====================

    /// Ids of the tutorials a user has saved.
    pub async fn list_saved(&self, user_id: &str) -> Result<BTreeSet<String>, AppError> {
        let rows = sqlx::query("SELECT tutorial_id FROM saved_tutorials WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|row| row.get("tutorial_id")).collect())
    }

    /// Link a tutorial to the user's saved list. Saving twice is a no-op.
    pub async fn insert_saved(&self, user_id: &str, tutorial_id: &str) -> Result<(), AppError> {
        let exists = sqlx::query("SELECT 1 FROM tutorials WHERE id = ?")
            .bind(tutorial_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Tutorial {} not found",
                tutorial_id
            )));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO saved_tutorials (user_id, tutorial_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user_id)
        .bind(tutorial_id)
        .bind(now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Remove a saved link. Removing a missing link is a no-op.
    pub async fn delete_saved(&self, user_id: &str, tutorial_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM saved_tutorials WHERE user_id = ? AND tutorial_id = ?")
            .bind(user_id)
            .bind(tutorial_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
