//! Community tutorial requests.

use serde::{Deserialize, Serialize};

use super::Category;

/// A topic the community wants a tutorial for, ranked by votes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TutorialRequest {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub title: String,
    pub description: String,
    pub category: Category,
    pub created_at: String,
    pub upvotes: i64,
    #[serde(default)]
    pub upvoted_by: Vec<String>,
    pub answered: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answered_tutorial_id: Option<String>,
}

impl TutorialRequest {
    pub fn has_upvoted(&self, user_id: &str) -> bool {
        self.upvoted_by.iter().any(|id| id == user_id)
    }

    /// Flip `user_id`'s vote and return whether the vote is now present.
    ///
    /// `upvotes` is recomputed from `upvoted_by`, never adjusted on its own.
    pub fn toggle_upvote(&mut self, user_id: &str) -> bool {
        let voted = if self.has_upvoted(user_id) {
            self.upvoted_by.retain(|id| id != user_id);
            false
        } else {
            self.upvoted_by.push(user_id.to_string());
            true
        };
        self.upvotes = self.upvoted_by.len() as i64;
        voted
    }
}

/// Request body for creating a new tutorial request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRequestRequest {
    pub title: String,
    pub description: String,
    pub category: Category,
}
