//! Workspace resolution: map a project id to its directory on disk.

use crate::project::{ProjectLayout, ProjectSettings};
use std::path::{Path, PathBuf};

/// Finds the on-disk location of a project by id
pub trait ProjectLocator: Send + Sync {
    /// Return the first project directory whose stored id matches `id`
    fn find_project_path(&self, id: &str) -> Option<PathBuf>;
}

/// Scans configured workspace roots for project directories
#[derive(Debug, Clone)]
pub struct WorkspaceResolver {
    roots: Vec<PathBuf>,
}

impl WorkspaceResolver {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Read the id stored in a candidate directory.
    ///
    /// The legacy `config/.settings` takes precedence over
    /// `.mavensmate/project.json` when both exist.
    pub fn stored_id(project_dir: &Path) -> Option<String> {
        let layout = ProjectLayout::new(project_dir);
        let settings_path = layout.legacy_settings();
        let manifest_path = layout.manifest();

        let source = if settings_path.is_file() {
            settings_path
        } else if manifest_path.is_file() {
            manifest_path
        } else {
            return None;
        };

        match ProjectSettings::read(&source) {
            Ok(settings) => settings.id,
            Err(e) => {
                tracing::debug!(path = ?source, error = %e, "Skipping unreadable project settings");
                None
            }
        }
    }
}

impl ProjectLocator for WorkspaceResolver {
    fn find_project_path(&self, id: &str) -> Option<PathBuf> {
        tracing::debug!(id, workspaces = ?self.roots, "Searching workspaces for project");

        for root in &self.roots {
            for candidate in list_directories(root) {
                if Self::stored_id(&candidate).as_deref() == Some(id) {
                    return Some(candidate);
                }
            }
        }

        None
    }
}

/// Immediate child directories of `root`, sorted by path
pub fn list_directories(root: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(workspace = ?root, error = %e, "Cannot read workspace");
            return Vec::new();
        }
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort();
    dirs
}
