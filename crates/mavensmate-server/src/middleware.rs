//! Request middleware attaching projects to requests.

use axum::{
    extract::{Query, Request, State},
    http::{header, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use mavensmate_core::Project;
use std::sync::Arc;

use crate::gate::{GateAction, GateRequest};
use crate::route::{project_id_from_path, RouteCategory};
use crate::server::AppState;

/// Header API clients may use to name the project
pub const PROJECT_ID_HEADER: &str = "x-mavensmate-project-id";

/// Project id the request refers to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedProjectId(pub String);

/// Project attached to the request by [`attach_project`]
#[derive(Debug, Clone)]
pub struct AttachedProject(pub Arc<Project>);

#[derive(Debug, Default)]
struct GateQuery {
    pid: Option<String>,
    command: Option<String>,
}

/// Read `pid` and `command` independently, first value wins.
///
/// Unrelated or repeated keys must not hide either value.
fn gate_query(uri: &Uri) -> GateQuery {
    let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
        .map(|Query(pairs)| pairs)
        .unwrap_or_default();
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    };

    GateQuery {
        pid: first("pid"),
        command: first("command"),
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Record the project id from the `pid` query parameter, the
/// `/app/project/{id}` path, or the project id header, in that order.
pub async fn attach_project_id(mut request: Request, next: Next) -> Response {
    let query = gate_query(request.uri());
    let project_id = non_empty(query.pid.as_deref())
        .or_else(|| non_empty(project_id_from_path(request.uri().path())))
        .or_else(|| {
            non_empty(
                request
                    .headers()
                    .get(PROJECT_ID_HEADER)
                    .and_then(|v| v.to_str().ok()),
            )
        });

    if let Some(project_id) = project_id {
        request
            .extensions_mut()
            .insert(RequestedProjectId(project_id));
    }

    next.run(request).await
}

/// Attach the requested project, redirecting or rejecting when the project
/// cannot serve the request.
pub async fn attach_project(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let route = RouteCategory::classify(request.uri().path());
    let command = gate_query(request.uri()).command;
    let project_id = request
        .extensions()
        .get::<RequestedProjectId>()
        .map(|id| id.0.clone());

    let decision = state
        .gate
        .handle(&GateRequest {
            route,
            project_id: project_id.as_deref(),
            command: command.as_deref(),
        })
        .await;

    if let Some(project) = decision.project {
        request.extensions_mut().insert(AttachedProject(project));
    }

    match decision.action {
        GateAction::Continue => next.run(request).await,
        GateAction::Redirect(location) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        GateAction::Reject { status, message } => (status, message).into_response(),
    }
}
