//! Optimistic mutations: save/unsave, tutorial upvote, request upvote.
//!
//! The local change is applied before the remote write and rolled back if the
//! write fails. Two guards keep overlapping writes from clobbering each other:
//!
//! * a per-entity pending set: a second mutation on an entity whose first is
//!   still in flight is refused with [`MutationOutcome::AlreadyPending`];
//! * a per-entity version stamp: a rollback applies only if the stamp still
//!   equals the one taken when the optimistic change was made. Refreshes and
//!   logouts advance every stamp. Stamps are taken under the sync gate, so a
//!   refresh either finishes before a mutation starts or waits for it to end.

use std::collections::{HashMap, HashSet};

use crate::errors::StoreError;
use crate::store::{ClientStore, Notice};

/// Entity an optimistic mutation targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Saved(String),
    TutorialVote(String),
    RequestVote(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// Another mutation on the same entity is in flight; nothing changed.
    AlreadyPending,
}

#[derive(Debug, Default)]
pub(crate) struct Inflight {
    versions: HashMap<EntityKey, u64>,
    pending: HashSet<EntityKey>,
    epoch: u64,
}

impl Inflight {
    /// Claim `key`, returning its fresh version stamp.
    fn begin(&mut self, key: &EntityKey) -> Option<u64> {
        if !self.pending.insert(key.clone()) {
            return None;
        }
        self.epoch += 1;
        self.versions.insert(key.clone(), self.epoch);
        Some(self.epoch)
    }

    fn is_current(&self, key: &EntityKey, stamp: u64) -> bool {
        self.versions.get(key) == Some(&stamp)
    }

    fn finish(&mut self, key: &EntityKey) {
        self.pending.remove(key);
    }

    /// Make every outstanding stamp stale.
    pub(crate) fn invalidate_all(&mut self) {
        self.versions.clear();
    }
}

impl ClientStore {
    async fn begin(&self, key: &EntityKey) -> Option<u64> {
        self.inflight.lock().await.begin(key)
    }

    async fn finish(&self, key: &EntityKey) {
        self.inflight.lock().await.finish(key);
    }

    async fn is_current(&self, key: &EntityKey, stamp: u64) -> bool {
        self.inflight.lock().await.is_current(key, stamp)
    }

    /// Save or unsave a tutorial for the signed-in user.
    pub async fn toggle_saved(&self, tutorial_id: &str) -> Result<MutationOutcome, StoreError> {
        self.require_signed_in()?;
        let key = EntityKey::Saved(tutorial_id.to_string());
        let _gate = self.sync_gate.read().await;
        let Some(stamp) = self.begin(&key).await else {
            return Ok(MutationOutcome::AlreadyPending);
        };

        // A refresh may have replaced the profile while we waited on the gate.
        let Some(user) = self.session.current_user() else {
            self.finish(&key).await;
            return self.reject(StoreError::AuthRequired);
        };
        let was_saved = user.saved_tutorials.contains(tutorial_id);
        self.session.modify_user(|u| {
            if was_saved {
                u.saved_tutorials.remove(tutorial_id);
            } else {
                u.saved_tutorials.insert(tutorial_id.to_string());
            }
        });

        let result = if was_saved {
            self.gateway.delete_saved_link(tutorial_id).await
        } else {
            self.gateway.insert_saved_link(tutorial_id).await
        };

        let outcome = match result {
            Ok(_) => {
                self.notify(Notice::Success(if was_saved {
                    "Tutorial removido dos salvos.".to_string()
                } else {
                    "Tutorial salvo com sucesso!".to_string()
                }));
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                if self.is_current(&key, stamp).await {
                    self.session.modify_user(|u| {
                        if was_saved {
                            u.saved_tutorials.insert(tutorial_id.to_string());
                        } else {
                            u.saved_tutorials.remove(tutorial_id);
                        }
                    });
                } else {
                    tracing::debug!(tutorial_id, "Skipping stale saved-set rollback");
                }
                self.reject(e.into())
            }
        };

        self.finish(&key).await;
        outcome
    }

    /// Add one vote to an approved tutorial.
    pub async fn upvote_tutorial(&self, tutorial_id: &str) -> Result<MutationOutcome, StoreError> {
        self.require_signed_in()?;
        let key = EntityKey::TutorialVote(tutorial_id.to_string());
        let _gate = self.sync_gate.read().await;
        let Some(stamp) = self.begin(&key).await else {
            return Ok(MutationOutcome::AlreadyPending);
        };

        let previous = {
            let mut state = self.state.write().await;
            match state
                .tutorials
                .iter_mut()
                .find(|t| t.id == tutorial_id && t.approved)
            {
                Some(tutorial) => {
                    let previous = tutorial.upvotes;
                    tutorial.upvotes += 1;
                    Some(previous)
                }
                None => None,
            }
        };
        let Some(previous) = previous else {
            self.finish(&key).await;
            return self.reject(StoreError::NotFound(format!("tutorial {}", tutorial_id)));
        };

        let outcome = match self.gateway.upvote_tutorial(tutorial_id).await {
            Ok(updated) => {
                if self.is_current(&key, stamp).await {
                    let mut state = self.state.write().await;
                    if let Some(tutorial) = state.tutorials.iter_mut().find(|t| t.id == tutorial_id)
                    {
                        tutorial.upvotes = updated.upvotes;
                    }
                }
                Ok(MutationOutcome::Applied)
            }
            Err(e) => {
                if self.is_current(&key, stamp).await {
                    let mut state = self.state.write().await;
                    if let Some(tutorial) = state.tutorials.iter_mut().find(|t| t.id == tutorial_id)
                    {
                        tutorial.upvotes = previous;
                    }
                }
                self.reject(e.into())
            }
        };

        self.finish(&key).await;
        outcome
    }

    /// Flip the signed-in user's vote on a request.
    ///
    /// `upvotes` is recomputed from the voter set on every change.
    pub async fn toggle_request_upvote(
        &self,
        request_id: &str,
    ) -> Result<MutationOutcome, StoreError> {
        self.require_signed_in()?;
        let key = EntityKey::RequestVote(request_id.to_string());
        let _gate = self.sync_gate.read().await;
        let Some(stamp) = self.begin(&key).await else {
            return Ok(MutationOutcome::AlreadyPending);
        };
        let Some(user) = self.session.current_user() else {
            self.finish(&key).await;
            return self.reject(StoreError::AuthRequired);
        };

        let previous = {
            let mut state = self.state.write().await;
            match state.requests.iter_mut().find(|r| r.id == request_id) {
                Some(request) => {
                    let previous = request.clone();
                    request.toggle_upvote(&user.id);
                    Some(previous)
                }
                None => None,
            }
        };
        let Some(previous) = previous else {
            self.finish(&key).await;
            return self.reject(StoreError::NotFound(format!("request {}", request_id)));
        };

        let result = self.gateway.toggle_request_upvote(request_id).await;
        let current = self.is_current(&key, stamp).await;
        let outcome = {
            let mut state = self.state.write().await;
            let slot = state.requests.iter_mut().find(|r| r.id == request_id);
            match result {
                Ok(updated) => {
                    if let (true, Some(slot)) = (current, slot) {
                        *slot = updated;
                    }
                    Ok(MutationOutcome::Applied)
                }
                Err(e) => {
                    if let (true, Some(slot)) = (current, slot) {
                        slot.upvoted_by = previous.upvoted_by;
                        slot.upvotes = previous.upvotes;
                    }
                    Err(StoreError::from(e))
                }
            }
        };

        self.finish(&key).await;
        match outcome {
            Ok(outcome) => Ok(outcome),
            Err(e) => self.reject(e),
        }
    }
}
