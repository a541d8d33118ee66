//! Project lifecycle: on-disk upgrade and initialization of project handles.

use crate::project::{Credentials, Project, ProjectLayout, ProjectSettings};
use crate::CoreError;
use async_trait::async_trait;
use chrono::Utc;
use std::path::Path;

/// Builds project handles from project directories
#[async_trait]
pub trait ProjectLifecycle: Send + Sync {
    /// Whether the directory still uses a pre-manifest layout
    fn needs_upgrade(&self, path: &Path) -> bool;

    /// Migrate the directory to the current layout in place
    fn upgrade(&self, path: &Path) -> Result<(), CoreError>;

    /// Read the manifest and validate stored credentials
    async fn initialize(&self, path: &Path) -> Result<Project, CoreError>;
}

/// Filesystem-backed lifecycle reading `.mavensmate/` metadata
#[derive(Debug, Clone, Default)]
pub struct FsProjectLifecycle;

impl FsProjectLifecycle {
    pub fn new() -> Self {
        Self
    }

    async fn read_settings(layout: &ProjectLayout) -> Result<ProjectSettings, CoreError> {
        let manifest = layout.manifest();
        let source = if tokio::fs::try_exists(&manifest).await? {
            manifest
        } else {
            layout.legacy_settings()
        };

        let content = tokio::fs::read_to_string(&source)
            .await
            .map_err(|e| CoreError::InvalidManifest {
                path: source.clone(),
                reason: e.to_string(),
            })?;
        serde_json::from_str(&content).map_err(|e| CoreError::InvalidManifest {
            path: source,
            reason: e.to_string(),
        })
    }

    async fn read_credentials(layout: &ProjectLayout) -> Option<Credentials> {
        let path = layout.credentials();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::debug!(path = ?path, error = %e, "No stored credentials");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(credentials) => Some(credentials),
            Err(e) => {
                tracing::warn!(path = ?path, error = %e, "Failed to parse stored credentials");
                None
            }
        }
    }
}

#[async_trait]
impl ProjectLifecycle for FsProjectLifecycle {
    fn needs_upgrade(&self, path: &Path) -> bool {
        let layout = ProjectLayout::new(path);
        layout.legacy_settings().is_file() && !layout.manifest().exists()
    }

    fn upgrade(&self, path: &Path) -> Result<(), CoreError> {
        let layout = ProjectLayout::new(path);
        let settings = ProjectSettings::read(&layout.legacy_settings())?;

        std::fs::create_dir_all(layout.metadata_dir())?;
        settings.write(&layout.manifest())?;

        let session = layout.legacy_session();
        if session.is_file() {
            let content = std::fs::read_to_string(&session)?;
            let credentials: Credentials = serde_json::from_str(&content)?;
            std::fs::write(
                layout.credentials(),
                serde_json::to_string_pretty(&credentials)?,
            )?;
            std::fs::remove_file(&session)?;
        }

        tracing::info!(path = ?path, "Upgraded project to current layout");
        Ok(())
    }

    async fn initialize(&self, path: &Path) -> Result<Project, CoreError> {
        let layout = ProjectLayout::new(path);
        let settings = Self::read_settings(&layout).await?;

        let id = settings
            .id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| CoreError::InvalidManifest {
                path: layout.manifest(),
                reason: "missing project id".to_string(),
            })?;
        let name = settings
            .project_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| layout.dir_name());

        let has_invalid_salesforce_connection = !Self::read_credentials(&layout)
            .await
            .is_some_and(|credentials| credentials.is_usable(Utc::now()));

        if has_invalid_salesforce_connection {
            tracing::warn!(id = %id, "Project credentials require re-authentication");
        }

        Ok(Project {
            id,
            name,
            path: path.to_path_buf(),
            has_invalid_salesforce_connection,
        })
    }
}
