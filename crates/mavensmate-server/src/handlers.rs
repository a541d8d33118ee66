//! HTTP handlers for the routes behind the project gate.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use mavensmate_core::Project;
use serde::Serialize;
use std::collections::HashMap;

use crate::middleware::AttachedProject;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub path: String,
    pub needs_reauthentication: bool,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            path: project.path.display().to_string(),
            needs_reauthentication: project.has_invalid_salesforce_connection,
        }
    }
}

fn summary(project: &Option<Extension<AttachedProject>>) -> Option<ProjectSummary> {
    project
        .as_ref()
        .map(|Extension(AttachedProject(project))| ProjectSummary::from(project.as_ref()))
}

/// Server liveness and cache size
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let cache = state.gate.cache();
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.start_time.elapsed().as_secs(),
        "projects_loaded": cache.len(),
        "projects": cache.ids(),
    }))
}

/// Project pages: `/app/project/{id}` and everything below it
pub async fn project_page(
    Path(params): Path<HashMap<String, String>>,
    project: Option<Extension<AttachedProject>>,
) -> Response {
    let Some(project) = summary(&project) else {
        return (StatusCode::NOT_FOUND, "Project not attached").into_response();
    };

    let page = params.get("page").cloned().unwrap_or_default();
    Json(serde_json::json!({
        "page": page,
        "project": project,
    }))
    .into_response()
}

/// Accept a command for the attached project
pub async fn execute(
    Query(pairs): Query<Vec<(String, String)>>,
    project: Option<Extension<AttachedProject>>,
) -> Response {
    let command = pairs
        .into_iter()
        .find_map(|(key, value)| (key == "command").then_some(value));
    let Some(command) = command else {
        return (StatusCode::BAD_REQUEST, "Missing command").into_response();
    };

    tracing::info!(command = %command, "Command accepted");
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "command": command,
            "project": summary(&project),
        })),
    )
        .into_response()
}

/// Status of the attached project
pub async fn status(
    State(state): State<AppState>,
    project: Option<Extension<AttachedProject>>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "projects_loaded": state.gate.cache().len(),
        "project": summary(&project),
    }))
}
