//! Problem reports filed against tutorials.

use serde::{Deserialize, Serialize};

/// A user-reported defect against a tutorial or one of its steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TutorialProblem {
    pub id: String,
    pub tutorial_id: String,
    pub user_id: String,
    pub user_name: String,
    /// 1-based step; `None` for a problem with the tutorial as a whole.
    pub step_number: Option<i64>,
    pub description: String,
    pub created_at: String,
    pub resolved: bool,
}

/// Request body for reporting a problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReportProblemRequest {
    pub tutorial_id: String,
    #[serde(default)]
    pub step_number: Option<i64>,
    pub description: String,
}
