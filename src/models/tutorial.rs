//! Tutorial, comment and category models.

use serde::{Deserialize, Serialize};

/// Closed set of categories shared by tutorials and requests.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    #[serde(rename = "Tecnologia")]
    Tecnologia,
    #[serde(rename = "Culinária")]
    Culinaria,
    #[serde(rename = "Casa e Jardim")]
    CasaEJardim,
    #[serde(rename = "Estilo de Vida")]
    EstiloDeVida,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Tecnologia,
        Category::Culinaria,
        Category::CasaEJardim,
        Category::EstiloDeVida,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tecnologia => "Tecnologia",
            Category::Culinaria => "Culinária",
            Category::CasaEJardim => "Casa e Jardim",
            Category::EstiloDeVida => "Estilo de Vida",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// A reader comment attached to a tutorial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub tutorial_id: String,
    pub user_id: String,
    pub user_name: String,
    pub content: String,
    pub created_at: String,
}

/// A moderated, step-ordered how-to guide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tutorial {
    pub id: String,
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub author_id: String,
    /// Denormalized from the author's profile at read time.
    pub author_name: String,
    pub category: Category,
    pub created_at: String,
    pub approved: bool,
    pub upvotes: i64,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

/// Request body for creating a new tutorial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateTutorialRequest {
    pub title: String,
    pub description: String,
    pub steps: Vec<String>,
    pub category: Category,
}

/// Request body for commenting on a tutorial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateCommentRequest {
    pub content: String,
}

/// Request body for `POST /api/saved`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SaveTutorialRequest {
    pub tutorial_id: String,
}
