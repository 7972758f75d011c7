//! Session/identity adapter.
//!
//! Normalizes the backend's identity calls into one observable "current user".
//! Every transition (login, logout, profile refresh, saved-set change) is
//! published on a `watch` channel.

use std::sync::Arc;

use tokio::sync::watch;

use crate::errors::{AuthError, GatewayError, StoreError};
use crate::gateway::Gateway;
use crate::models::{SignInRequest, SignUpRequest, UpdateProfileRequest, User};
use crate::validation::validate_profile_name;

/// What the caller should do after a sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// No session was opened; route to "awaiting e-mail verification".
    pub requires_verification: bool,
}

pub struct Session {
    gateway: Arc<dyn Gateway>,
    user: watch::Sender<Option<User>>,
}

impl Session {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        let (user, _) = watch::channel(None);
        Self { gateway, user }
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let request = SignInRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let session = self
            .gateway
            .sign_in(&request)
            .await
            .map_err(AuthError::from_gateway)?;

        tracing::info!(user_id = %session.user.id, "Signed in");
        self.set_user(Some(session.user));
        Ok(())
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let request = SignUpRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            name: name.trim().to_string(),
        };
        let response = self
            .gateway
            .sign_up(&request)
            .await
            .map_err(AuthError::from_gateway)?;

        match response.session {
            Some(session) => {
                self.set_user(Some(session.user));
                Ok(SignUpOutcome {
                    requires_verification: false,
                })
            }
            None => Ok(SignUpOutcome {
                requires_verification: true,
            }),
        }
    }

    /// Drop the local session. A failed remote revocation is only logged.
    pub async fn logout(&self) {
        if let Err(e) = self.gateway.sign_out().await {
            tracing::warn!("Failed to revoke session: {}", e);
        }
        self.set_user(None);
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn is_admin(&self) -> bool {
        self.user.borrow().as_ref().is_some_and(User::is_admin)
    }

    /// Watch the current user.
    pub fn subscribe(&self) -> watch::Receiver<Option<User>> {
        self.user.subscribe()
    }

    pub async fn update_profile(&self, name: &str) -> Result<User, StoreError> {
        if self.user.borrow().is_none() {
            return Err(StoreError::AuthRequired);
        }
        let name = validate_profile_name(name)?;
        let user = self
            .gateway
            .update_profile(&UpdateProfileRequest { name })
            .await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    /// Re-hydrate from credentials the gateway already holds.
    ///
    /// Returns `None` when they are missing or no longer valid.
    pub async fn restore(&self) -> Result<Option<User>, GatewayError> {
        match self.gateway.current_profile().await {
            Ok(user) => {
                self.set_user(Some(user.clone()));
                Ok(Some(user))
            }
            Err(e) if e.status == Some(401) => {
                self.set_user(None);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Edit the signed-in user in place. Returns false when nobody is signed in.
    pub(crate) fn modify_user(&self, edit: impl FnOnce(&mut User)) -> bool {
        self.user.send_if_modified(|user| match user {
            Some(user) => {
                edit(user);
                true
            }
            None => false,
        })
    }

    pub(crate) fn set_user(&self, user: Option<User>) {
        self.user.send_replace(user);
    }
}
