//! MavensMate Core Components
//!
//! This crate provides the project model for the MavensMate server:
//! configuration, workspace resolution, the project lifecycle and the
//! process-wide project cache.

mod config;
mod error;
mod lifecycle;
pub mod project;
mod project_cache;
mod workspace;

pub use config::ServerConfig;
pub use error::CoreError;
pub use lifecycle::{FsProjectLifecycle, ProjectLifecycle};
pub use project::{Credentials, Project, ProjectLayout, ProjectSettings};
pub use project_cache::ProjectCache;
pub use workspace::{list_directories, ProjectLocator, WorkspaceResolver};
