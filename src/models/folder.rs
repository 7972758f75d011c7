//! Device-local saved folder model.

use serde::{Deserialize, Serialize};

/// A user-defined grouping of saved tutorials. Never leaves the device.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SavedFolder {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tutorial_ids: Vec<String>,
}
