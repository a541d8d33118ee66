//! Project handle and the on-disk records it is built from.

use crate::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Legacy settings file, relative to the project root
pub const LEGACY_SETTINGS_PATH: &str = "config/.settings";

/// Legacy session file, relative to the project root
pub const LEGACY_SESSION_PATH: &str = "config/.session";

/// Directory holding the current project metadata
pub const METADATA_DIR: &str = ".mavensmate";

/// Project manifest file name inside [`METADATA_DIR`]
pub const MANIFEST_FILE: &str = "project.json";

/// Stored credentials file name inside [`METADATA_DIR`]
pub const CREDENTIALS_FILE: &str = "credentials.json";

/// A loaded MavensMate project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    /// Stable project id
    pub id: String,

    /// Display name
    pub name: String,

    /// Absolute path to the project root
    pub path: PathBuf,

    /// Stored Salesforce credentials are missing, expired or unusable
    pub has_invalid_salesforce_connection: bool,
}

/// Project settings as persisted in `project.json` or the legacy `.settings`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSettings {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default, alias = "project_name")]
    pub project_name: Option<String>,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub environment: Option<String>,

    #[serde(default)]
    pub namespace: Option<String>,

    #[serde(default)]
    pub workspace: Option<String>,

    #[serde(default)]
    pub subscription: Option<Vec<String>>,

    /// Keys this server does not interpret, preserved on rewrite
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ProjectSettings {
    /// Read and parse a settings/manifest file
    pub fn read(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| CoreError::InvalidManifest {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Write the settings as pretty JSON
    pub fn write(&self, path: &Path) -> Result<(), CoreError> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Salesforce credentials stored alongside the project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    #[serde(default, alias = "sid")]
    pub access_token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default, alias = "server_url")]
    pub instance_url: Option<String>,

    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Whether these credentials can be used without an interactive re-auth
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        let has_access_token = self
            .access_token
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty());
        if !has_access_token {
            return false;
        }

        match self.expires_at {
            Some(expires_at) if expires_at <= now => self
                .refresh_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty()),
            _ => true,
        }
    }
}

/// Paths of the project files relative to a project root
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn legacy_settings(&self) -> PathBuf {
        self.root.join(LEGACY_SETTINGS_PATH)
    }

    pub fn legacy_session(&self) -> PathBuf {
        self.root.join(LEGACY_SESSION_PATH)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn manifest(&self) -> PathBuf {
        self.metadata_dir().join(MANIFEST_FILE)
    }

    pub fn credentials(&self) -> PathBuf {
        self.metadata_dir().join(CREDENTIALS_FILE)
    }

    /// Directory name, used when the manifest carries no project name
    pub fn dir_name(&self) -> String {
        self.root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }
}
