//! Device-local folders for organizing saved tutorials.
//!
//! Folders never reach the backend. Each user's folders live in one JSON file
//! under the store root, so the layer can move to remote sync later without
//! touching the synced saved set.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::errors::StoreError;
use crate::models::SavedFolder;
use crate::validation::validate_folder_name;

pub struct FolderStore {
    root: PathBuf,
}

impl FolderStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, user_id: &str) -> PathBuf {
        self.root.join(format!("saved-folders-{}.json", user_id))
    }

    /// Folders for `user_id`. A missing or unreadable file reads as no folders.
    pub async fn list(&self, user_id: &str) -> Vec<SavedFolder> {
        let path = self.path_for(user_id);
        let raw = match tokio::fs::read(&path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to read folders: {}", e);
                return Vec::new();
            }
        };
        serde_json::from_slice(&raw).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), "Discarding malformed folders: {}", e);
            Vec::new()
        })
    }

    async fn save(&self, user_id: &str, folders: &[SavedFolder]) -> Result<(), StoreError> {
        let storage = |e: std::io::Error| StoreError::Storage(e.to_string());
        tokio::fs::create_dir_all(&self.root).await.map_err(storage)?;
        let body = serde_json::to_vec_pretty(folders)
            .map_err(|e| StoreError::Storage(e.to_string()))?;
        tokio::fs::write(self.path_for(user_id), body)
            .await
            .map_err(storage)
    }

    /// Load, edit one folder, persist. Returns the edited folder.
    async fn update(
        &self,
        user_id: &str,
        folder_id: &str,
        edit: impl FnOnce(&mut SavedFolder),
    ) -> Result<SavedFolder, StoreError> {
        let mut folders = self.list(user_id).await;
        let folder = folders
            .iter_mut()
            .find(|f| f.id == folder_id)
            .ok_or_else(|| StoreError::NotFound(format!("folder {}", folder_id)))?;
        edit(folder);
        let edited = folder.clone();
        self.save(user_id, &folders).await?;
        Ok(edited)
    }

    pub async fn create(&self, user_id: &str, name: &str) -> Result<SavedFolder, StoreError> {
        let folder = SavedFolder {
            id: Uuid::new_v4().to_string(),
            name: validate_folder_name(name)?,
            tutorial_ids: Vec::new(),
        };
        let mut folders = self.list(user_id).await;
        folders.push(folder.clone());
        self.save(user_id, &folders).await?;
        tracing::debug!(user_id, folder_id = %folder.id, "Created folder");
        Ok(folder)
    }

    pub async fn rename(
        &self,
        user_id: &str,
        folder_id: &str,
        name: &str,
    ) -> Result<SavedFolder, StoreError> {
        let name = validate_folder_name(name)?;
        self.update(user_id, folder_id, |f| f.name = name).await
    }

    pub async fn delete(&self, user_id: &str, folder_id: &str) -> Result<(), StoreError> {
        let mut folders = self.list(user_id).await;
        let before = folders.len();
        folders.retain(|f| f.id != folder_id);
        if folders.len() == before {
            return Err(StoreError::NotFound(format!("folder {}", folder_id)));
        }
        self.save(user_id, &folders).await
    }

    /// File a tutorial under a folder. Filing it twice is a no-op.
    pub async fn add_tutorial(
        &self,
        user_id: &str,
        folder_id: &str,
        tutorial_id: &str,
    ) -> Result<SavedFolder, StoreError> {
        self.update(user_id, folder_id, |f| {
            if !f.tutorial_ids.iter().any(|id| id == tutorial_id) {
                f.tutorial_ids.push(tutorial_id.to_string());
            }
        })
        .await
    }

    pub async fn remove_tutorial(
        &self,
        user_id: &str,
        folder_id: &str,
        tutorial_id: &str,
    ) -> Result<SavedFolder, StoreError> {
        self.update(user_id, folder_id, |f| {
            f.tutorial_ids.retain(|id| id != tutorial_id)
        })
        .await
    }
}
