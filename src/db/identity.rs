//! Profiles, sessions and one-time tokens.

use std::collections::BTreeSet;

use chrono::{Duration, SecondsFormat, Utc};
use sqlx::Row;

use super::repository::{bump_revision, new_id, now, user_from_row, Repository};
use crate::auth::{constant_time_compare, generate_token, split_token};
use crate::errors::AppError;
use crate::models::{Actor, Role, User};

/// Stored credentials for a profile.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: User,
    pub password_hash: String,
    pub email_verified: bool,
}

/// Fields needed to insert a profile.
#[derive(Debug, Clone)]
pub struct NewProfile<'a> {
    pub email: &'a str,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub email_verified: bool,
}

/// What a one-time token may be redeemed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenPurpose {
    EmailVerification,
    PasswordReset,
}

impl TokenPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenPurpose::EmailVerification => "email_verification",
            TokenPurpose::PasswordReset => "password_reset",
        }
    }
}

const PROFILE_COLUMNS: &str = "id, email, name, role, banned, created_at";

fn expiry(hours: i64) -> String {
    (Utc::now() + Duration::hours(hours)).to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Repository {
    // ==================== PROFILE OPERATIONS ====================

    /// Insert a new profile. E-mail addresses are unique, case-insensitively.
    pub async fn create_profile(&self, profile: NewProfile<'_>) -> Result<User, AppError> {
        let existing = sqlx::query("SELECT 1 FROM profiles WHERE email = ?")
            .bind(profile.email)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let id = new_id();
        let created_at = now();

        sqlx::query(
            "INSERT INTO profiles (id, email, name, role, banned, password_hash, email_verified, created_at) VALUES (?, ?, ?, ?, 0, ?, ?, ?)"
        )
        .bind(&id)
        .bind(profile.email)
        .bind(profile.name)
        .bind(profile.role.as_str())
        .bind(profile.password_hash)
        .bind(profile.email_verified as i32)
        .bind(&created_at)
        .execute(&self.pool)
        .await?;

        self.increment_revision().await?;

        Ok(User {
            id,
            email: profile.email.to_string(),
            name: profile.name.to_string(),
            role: profile.role,
            created_at,
            banned: false,
            saved_tutorials: BTreeSet::new(),
        })
    }

    /// Create the bootstrap administrator, or elevate the existing account.
    pub async fn seed_admin(
        &self,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE profiles SET role = 'ADMIN', email_verified = 1 WHERE email = ?",
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            self.create_profile(NewProfile {
                email,
                name,
                password_hash,
                role: Role::Admin,
                email_verified: true,
            })
            .await?;
        }
        Ok(())
    }

    /// Look up the credentials for a sign-in attempt.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<Credentials>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {}, password_hash, email_verified FROM profiles WHERE email = ?",
            PROFILE_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let email_verified: i32 = row.get("email_verified");
        Ok(Some(Credentials {
            user: user_from_row(&row)?,
            password_hash: row.get("password_hash"),
            email_verified: email_verified != 0,
        }))
    }

    /// Get a profile by ID, including its saved-tutorial links.
    pub async fn get_profile(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM profiles WHERE id = ?",
            PROFILE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut user = user_from_row(&row)?;
        user.saved_tutorials = self.list_saved(id).await?;
        Ok(Some(user))
    }

    /// List all profiles, newest first.
    pub async fn list_profiles(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM profiles ORDER BY created_at DESC, rowid DESC",
            PROFILE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(user_from_row).collect()
    }

    /// Rename a profile.
    pub async fn update_profile_name(&self, id: &str, name: &str) -> Result<User, AppError> {
        let result = sqlx::query("UPDATE profiles SET name = ? WHERE id = ?")
            .bind(name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Profile {} not found", id)));
        }

        self.increment_revision().await?;
        self.get_profile(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", id)))
    }

    pub async fn set_password_hash(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE profiles SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn mark_email_verified(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("UPDATE profiles SET email_verified = 1 WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        bump_revision(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    // ==================== SESSION OPERATIONS ====================

    /// Issue a session token for a user. Returns the token and its expiry.
    pub async fn create_session(
        &self,
        user_id: &str,
        ttl_hours: i64,
    ) -> Result<(String, String), AppError> {
        let token = generate_token();
        let expires_at = expiry(ttl_hours);

        sqlx::query(
            "INSERT INTO auth_sessions (token, user_id, created_at, expires_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(now())
        .bind(&expires_at)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    /// Resolve a live session token to the acting profile.
    pub async fn actor_for_token(&self, token: &str) -> Result<Option<Actor>, AppError> {
        let row = sqlx::query(
            r#"SELECT p.id, p.email, p.name, p.role, p.banned
               FROM auth_sessions s JOIN profiles p ON p.id = s.user_id
               WHERE s.token = ? AND s.expires_at > ?"#,
        )
        .bind(token)
        .bind(now())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let role: String = row.get("role");
        let banned: i32 = row.get("banned");
        Ok(Some(Actor {
            user_id: row.get("id"),
            name: row.get("name"),
            email: row.get("email"),
            role: Role::parse(&role)
                .ok_or_else(|| AppError::Internal(format!("Unknown role {}", role)))?,
            banned: banned != 0,
        }))
    }

    pub async fn delete_session(&self, token: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_sessions WHERE token = ?")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_sessions_for_user(&self, user_id: &str) -> Result<(), AppError> {
        sqlx::query("DELETE FROM auth_sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // ==================== ONE-TIME TOKENS ====================

    /// Issue a `<id>.<secret>` token redeemable once for `purpose`.
    pub async fn issue_one_time_token(
        &self,
        user_id: &str,
        purpose: TokenPurpose,
        ttl_hours: i64,
    ) -> Result<String, AppError> {
        let id = new_id();
        let secret = generate_token();

        sqlx::query(
            "INSERT INTO auth_tokens (id, secret, user_id, purpose, expires_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&secret)
        .bind(user_id)
        .bind(purpose.as_str())
        .bind(expiry(ttl_hours))
        .execute(&self.pool)
        .await?;

        Ok(format!("{}.{}", id, secret))
    }

    /// Redeem a one-time token, returning the user it was issued to.
    pub async fn consume_one_time_token(
        &self,
        token: &str,
        purpose: TokenPurpose,
    ) -> Result<Option<String>, AppError> {
        let Some((id, secret)) = split_token(token) else {
            return Ok(None);
        };

        let row = sqlx::query(
            "SELECT secret, user_id, expires_at FROM auth_tokens WHERE id = ? AND purpose = ?",
        )
        .bind(id)
        .bind(purpose.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let stored: String = row.get("secret");
        let expires_at: String = row.get("expires_at");
        if !constant_time_compare(&stored, secret) || expires_at <= now() {
            return Ok(None);
        }

        sqlx::query("DELETE FROM auth_tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(Some(row.get("user_id")))
    }
}
